// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Request guard for session-authenticated routes
//!
//! [`SessionUser`] reads the session cookie and validates it. When the token is
//! close to expiry a new one is issued and written over the cookie, so an
//! active client never sees its session expire.
//!
//! Routes simply take the guard as a parameter:
//!
//! ```ignore
//! #[get("/profile")]
//! async fn profile(user: SessionUser) -> Json<Profile> {
//!     Json(Profile::from(&user.user))
//! }
//! ```

use super::cookies::SESSION_COOKIE;
use super::error::ApiError;
use super::AppState;
use crate::domain::User;
use crate::error::{AuthError, ErrorKind};
use log::{debug, error, warn};
use rocket::http::Status;
use rocket::request::{self, FromRequest, Outcome, Request};

/// Authenticated user of the current request.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user: User,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionUser {
    type Error = ApiError;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let Some(app) = request.rocket().state::<AppState>() else {
            error!("Application state is not managed");
            return Outcome::Error((
                Status::InternalServerError,
                ApiError(AuthError::internal("application state missing")),
            ));
        };

        let cookies = request.cookies();
        let token = match cookies.get(SESSION_COOKIE) {
            Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
            _ => {
                return Outcome::Error((
                    Status::Unauthorized,
                    ApiError(AuthError::unauthenticated("missing session cookie")),
                ))
            }
        };

        let sessions = app.accounts.sessions();
        let validation = match sessions.validate_session(&token).await {
            Ok(validation) => validation,
            // Well signed token whose account is gone.
            Err(e) if e.is(ErrorKind::NotFound) => {
                debug!("Session for a deleted account: {}", e);
                return Outcome::Error((
                    Status::Unauthorized,
                    ApiError(AuthError::unauthenticated("session account no longer exists")),
                ));
            }
            Err(e) => {
                let err = ApiError(e);
                return Outcome::Error((err.status(), err));
            }
        };

        if validation.refresh_recommended {
            match sessions.create_session(validation.user.id) {
                Ok(new_token) => {
                    cookies.add(app.cookies.session_cookie(new_token));
                    debug!("Silently refreshed session of {}", validation.user.id);
                }
                // The presented token is still valid, serve the request anyway.
                Err(e) => warn!("Silent session refresh failed: {}", e),
            }
        }

        Outcome::Success(SessionUser {
            user: validation.user,
        })
    }
}

/// Raw session token from the cookie, if any, without validation.
#[derive(Debug, Clone)]
pub struct SessionToken(pub Option<String>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionToken {
    type Error = std::convert::Infallible;

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let token = request
            .cookies()
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty());
        Outcome::Success(SessionToken(token))
    }
}
