// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session token issuance and verification
//!
//! Tokens are EdDSA-signed JWTs living for seven days. Instead of a separate
//! refresh token, [`TokenCodec::verify`] flags tokens entering the last 42 hours
//! of their life so the request layer can silently replace them.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rust_account_auth::token::{SessionKeyPair, TokenCodec, TokenSettings};
//! use uuid::Uuid;
//!
//! let keys = Arc::new(SessionKeyPair::from_seed(&[42u8; 32]).unwrap());
//! let codec = TokenCodec::new(keys, TokenSettings::default());
//!
//! let user_id = Uuid::new_v4();
//! let token = codec.issue(user_id).unwrap();
//! let verified = codec.verify(&token).unwrap();
//! assert_eq!(verified.user_id, user_id);
//! assert!(!verified.refresh_recommended);
//! ```

use super::claims::SessionClaims;
use super::keys::SessionKeyPair;
use crate::error::{AuthError, ErrorKind, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 7 * 24;
pub const DEFAULT_REFRESH_WINDOW_HOURS: i64 = 42;
pub const DEFAULT_LEEWAY_SECONDS: i64 = 300;
pub const DEFAULT_ISSUER: &str = "rust-account-auth";
pub const DEFAULT_AUDIENCE: &str = "rust-account-auth-api";

/// Timing and identity parameters of issued tokens.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    /// Value of the `iss` claim, checked on verification.
    pub issuer: String,
    /// Value of the `aud` claim, checked on verification.
    pub audience: String,
    /// Time between issuance and expiry.
    pub lifetime: Duration,
    /// Remaining lifetime under which a refresh is recommended.
    pub refresh_window: Duration,
    /// Clock skew tolerated when checking expiry.
    pub leeway: Duration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            lifetime: Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS),
            refresh_window: Duration::hours(DEFAULT_REFRESH_WINDOW_HOURS),
            leeway: Duration::seconds(DEFAULT_LEEWAY_SECONDS),
        }
    }
}

/// Result of a successful [`TokenCodec::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    /// The token is valid but close to expiry and should be replaced.
    pub refresh_recommended: bool,
}

/// Result of [`TokenCodec::introspect_expiry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenExpiry {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Signs and checks session tokens with a shared [`SessionKeyPair`].
pub struct TokenCodec {
    keys: Arc<SessionKeyPair>,
    settings: TokenSettings,
    validation: Validation,
    introspection: Validation,
}

impl TokenCodec {
    pub fn new(keys: Arc<SessionKeyPair>, settings: TokenSettings) -> Self {
        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.leeway = settings.leeway.num_seconds().max(0) as u64;
        validation.validate_exp = true;
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        // Same checks minus expiry: logout must still parse an expired token.
        let mut introspection = validation.clone();
        introspection.validate_exp = false;

        Self {
            keys,
            settings,
            validation,
            introspection,
        }
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Issue a token for `user_id` expiring after the configured lifetime.
    ///
    /// # Errors
    ///
    /// `Internal` if signing fails.
    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.settings.lifetime).timestamp(),
            jti: Uuid::new_v4().to_string(),
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &SessionClaims) -> Result<String> {
        encode(
            &Header::new(Algorithm::EdDSA),
            claims,
            self.keys.encoding_key(),
        )
        .map_err(|e| AuthError::with_source(ErrorKind::Internal, "failed to sign session token", e))
    }

    /// Verify signature, issuer, audience and expiry.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` when any check fails or the subject is not a user id.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken> {
        let claims = self.decode_with(token, &self.validation)?;
        let (user_id, expires_at) = Self::identity(&claims)?;

        let remaining = expires_at - Utc::now();
        let refresh_recommended = remaining < self.settings.refresh_window;
        if refresh_recommended {
            debug!(
                "Session token for {} expires in {}s, refresh recommended",
                user_id,
                remaining.num_seconds()
            );
        }

        Ok(VerifiedToken {
            user_id,
            expires_at,
            refresh_recommended,
        })
    }

    /// Read subject and expiry without enforcing expiry.
    ///
    /// The signature, issuer and audience are still checked so a forged token
    /// cannot be used to write arbitrary revocation entries.
    pub fn introspect_expiry(&self, token: &str) -> Result<TokenExpiry> {
        let claims = self.decode_with(token, &self.introspection)?;
        let (user_id, expires_at) = Self::identity(&claims)?;
        Ok(TokenExpiry {
            user_id,
            expires_at,
        })
    }

    fn decode_with(&self, token: &str, validation: &Validation) -> Result<SessionClaims> {
        decode::<SessionClaims>(token, self.keys.decoding_key(), validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Session token rejected: {}", e);
                AuthError::with_source(ErrorKind::Unauthenticated, "invalid session token", e)
            })
    }

    fn identity(claims: &SessionClaims) -> Result<(Uuid, DateTime<Utc>)> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::unauthenticated("session token subject is not a user id"))?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AuthError::unauthenticated("session token expiry out of range"))?;
        Ok((user_id, expires_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec_with(settings: TokenSettings) -> TokenCodec {
        let keys = Arc::new(SessionKeyPair::from_seed(&[3u8; 32]).unwrap());
        TokenCodec::new(keys, settings)
    }

    fn codec() -> TokenCodec {
        codec_with(TokenSettings::default())
    }

    fn claims_for(codec: &TokenCodec, user_id: Uuid, exp: DateTime<Utc>) -> SessionClaims {
        SessionClaims {
            sub: user_id.to_string(),
            iat: (exp - codec.settings.lifetime).timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            iss: codec.settings.issuer.clone(),
            aud: codec.settings.audience.clone(),
        }
    }

    #[test]
    fn fresh_token_verifies_without_refresh() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let verified = codec.verify(&codec.issue(user_id).unwrap()).unwrap();
        assert_eq!(verified.user_id, user_id);
        assert!(!verified.refresh_recommended);

        let expected = Utc::now() + Duration::days(7);
        assert!((verified.expires_at - expected).num_seconds().abs() <= 2);
    }

    #[test]
    fn token_inside_refresh_window_is_flagged() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let token = codec
            .sign(&claims_for(&codec, user_id, Utc::now() + Duration::hours(41)))
            .unwrap();
        let verified = codec.verify(&token).unwrap();
        assert_eq!(verified.user_id, user_id);
        assert!(verified.refresh_recommended);

        let token = codec
            .sign(&claims_for(&codec, user_id, Utc::now() + Duration::hours(43)))
            .unwrap();
        assert!(!codec.verify(&token).unwrap().refresh_recommended);
    }

    #[test]
    fn expiry_honours_leeway() {
        let codec = codec();
        let user_id = Uuid::new_v4();

        let within = codec
            .sign(&claims_for(&codec, user_id, Utc::now() - Duration::minutes(2)))
            .unwrap();
        assert!(codec.verify(&within).unwrap().refresh_recommended);

        let beyond = codec
            .sign(&claims_for(&codec, user_id, Utc::now() - Duration::minutes(10)))
            .unwrap();
        let err = codec.verify(&beyond).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }

    #[test]
    fn introspection_reads_expired_tokens() {
        let codec = codec();
        let user_id = Uuid::new_v4();
        let exp = Utc::now() - Duration::days(1);
        let token = codec.sign(&claims_for(&codec, user_id, exp)).unwrap();

        let expiry = codec.introspect_expiry(&token).unwrap();
        assert_eq!(expiry.user_id, user_id);
        assert_eq!(expiry.expires_at.timestamp(), exp.timestamp());
    }

    #[test]
    fn issuer_and_audience_are_enforced() {
        let issuing = codec_with(TokenSettings {
            issuer: "someone-else".into(),
            ..TokenSettings::default()
        });
        let token = issuing.issue(Uuid::new_v4()).unwrap();
        assert_eq!(
            codec().verify(&token).unwrap_err().kind(),
            ErrorKind::Unauthenticated
        );

        let issuing = codec_with(TokenSettings {
            audience: "other-api".into(),
            ..TokenSettings::default()
        });
        let token = issuing.issue(Uuid::new_v4()).unwrap();
        assert!(codec().verify(&token).is_err());
        assert!(codec().introspect_expiry(&token).is_err());
    }

    #[test]
    fn token_from_another_key_is_rejected() {
        let other = TokenCodec::new(
            Arc::new(SessionKeyPair::from_seed(&[4u8; 32]).unwrap()),
            TokenSettings::default(),
        );
        let token = other.issue(Uuid::new_v4()).unwrap();
        assert_eq!(
            codec().verify(&token).unwrap_err().kind(),
            ErrorKind::Unauthenticated
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let codec = codec();
        let token = codec.issue(Uuid::new_v4()).unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        let forged = codec.issue(Uuid::new_v4()).unwrap();
        parts[1] = forged.split('.').nth(1).unwrap().to_string();
        let tampered = parts.join(".");
        assert!(codec.verify(&tampered).is_err());
    }

    #[test]
    fn garbage_is_unauthenticated() {
        let codec = codec();
        for token in ["", "abc", "a.b.c"] {
            assert_eq!(
                codec.introspect_expiry(token).unwrap_err().kind(),
                ErrorKind::Unauthenticated
            );
        }
    }

    #[test]
    fn non_uuid_subject_is_rejected() {
        let codec = codec();
        let mut claims = claims_for(&codec, Uuid::new_v4(), Utc::now() + Duration::days(1));
        claims.sub = "admin".into();
        let token = codec.sign(&claims).unwrap();
        assert_eq!(
            codec.verify(&token).unwrap_err().kind(),
            ErrorKind::Unauthenticated
        );
    }
}
