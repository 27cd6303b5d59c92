// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Error taxonomy
//!
//! Every fallible operation of the authentication core returns an [`AuthError`].
//! The error carries an [`ErrorKind`] which is the only thing the transport layer
//! inspects to choose a status code. Each layer prefixes the message with its
//! operation name through [`AuthError::within`] (or [`ResultExt::within`]),
//! the kind is never changed on the way up.

use std::fmt;
use thiserror::Error;

/// Classification of authentication failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad, blacklisted, expired or missing session token.
    Unauthenticated,
    /// Malformed input: empty code or state, unknown provider, expired or forged OAuth state.
    Invalid,
    /// No user for the given id or email.
    NotFound,
    /// Email already linked to a different provider, or a uniqueness conflict.
    AlreadyExists,
    /// The identity provider reports the email as unverified.
    UnverifiedEmail,
    /// Upstream identity provider network or HTTP failure.
    Unavailable,
    /// Cache, repository or signing failure.
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Invalid => "invalid",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::UnverifiedEmail => "unverified_email",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned by every service of the crate.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct AuthError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl AuthError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Build an error keeping the underlying cause as its source.
    pub fn with_source<E>(kind: ErrorKind, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invalid, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyExists, message)
    }

    pub fn unverified_email(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnverifiedEmail, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Prefix the message with the name of the operation the error crossed.
    ///
    /// The kind and the source are kept as they are.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_account_auth::error::{AuthError, ErrorKind};
    ///
    /// let err = AuthError::not_found("user not found").within("get profile");
    /// assert_eq!(err.kind(), ErrorKind::NotFound);
    /// assert_eq!(err.to_string(), "get profile: user not found");
    /// ```
    pub fn within(self, operation: &str) -> Self {
        Self {
            kind: self.kind,
            message: format!("{}: {}", operation, self.message),
            source: self.source,
        }
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

/// Convenience wrapper for `Result<T, AuthError>`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Adds operation wrapping to results carrying an [`AuthError`].
pub trait ResultExt<T> {
    fn within(self, operation: &str) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn within(self, operation: &str) -> Result<T> {
        self.map_err(|e| e.within(operation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn wrapping_keeps_kind_and_stacks_operations() {
        let err = AuthError::unavailable("token endpoint returned 502")
            .within("exchange code")
            .within("finish auth");
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert_eq!(
            err.to_string(),
            "finish auth: exchange code: token endpoint returned 502"
        );
    }

    #[test]
    fn source_survives_wrapping() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timed out");
        let err = AuthError::with_source(ErrorKind::Internal, "cache get", io).within("validate");
        assert!(err.is(ErrorKind::Internal));
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("socket timed out"));
    }

    #[test]
    fn result_ext_wraps_only_errors() {
        let ok: Result<u8> = Ok(3);
        assert_eq!(ok.within("noop").ok(), Some(3));

        let err: Result<u8> = Err(AuthError::invalid("empty state"));
        let err = err.within("complete").unwrap_err();
        assert_eq!(err.message(), "complete: empty state");
    }

    #[test]
    fn kind_codes_are_stable() {
        assert_eq!(ErrorKind::UnverifiedEmail.code(), "unverified_email");
        assert_eq!(ErrorKind::AlreadyExists.to_string(), "already_exists");
    }
}
