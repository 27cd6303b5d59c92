// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Mapping of [`AuthError`] kinds to HTTP responses.

use crate::error::{AuthError, ErrorKind};
use log::{debug, error};
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::{json, Json};
use rocket::{Request, Response};

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> Status {
    match kind {
        ErrorKind::Unauthenticated => Status::Unauthorized,
        ErrorKind::Invalid => Status::BadRequest,
        ErrorKind::NotFound => Status::NotFound,
        ErrorKind::AlreadyExists => Status::Conflict,
        ErrorKind::UnverifiedEmail => Status::Forbidden,
        ErrorKind::Unavailable => Status::ServiceUnavailable,
        ErrorKind::Internal => Status::InternalServerError,
    }
}

/// Responder wrapping an [`AuthError`].
///
/// The body is `{"error": <kind code>, "message": <text>}`. Internal errors are
/// logged in full and answered with a generic message.
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> Status {
        status_for(self.0.kind())
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let kind = self.0.kind();
        let message = if kind == ErrorKind::Internal {
            error!("{} {}: {}", request.method(), request.uri(), self.0);
            "internal error".to_string()
        } else {
            debug!("{} {}: {}", request.method(), request.uri(), self.0);
            self.0.message().to_string()
        };

        let body = Json(json!({ "error": kind.code(), "message": message }));
        Response::build_from(body.respond_to(request)?)
            .status(status_for(kind))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_distinct_status() {
        let kinds = [
            ErrorKind::Unauthenticated,
            ErrorKind::Invalid,
            ErrorKind::NotFound,
            ErrorKind::AlreadyExists,
            ErrorKind::UnverifiedEmail,
            ErrorKind::Unavailable,
            ErrorKind::Internal,
        ];
        let mut codes: Vec<u16> = kinds.iter().map(|k| status_for(*k).code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
        assert_eq!(status_for(ErrorKind::AlreadyExists), Status::Conflict);
    }

    #[test]
    fn api_error_status_follows_the_wrapped_kind() {
        let err = ApiError::from(AuthError::unverified_email("email not verified").within("finish"));
        assert_eq!(err.status(), Status::Forbidden);
    }
}
