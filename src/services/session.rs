// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session lifecycle: issue, validate, revoke
//!
//! Sessions are not stored. A token is valid while its signature checks out,
//! it has not expired and its hash is absent from the revocation list.
//!
//! ```text
//! Issued -> Valid -> RefreshRecommended -> Reissued
//!                 \-> Expired | Blacklisted
//! ```

use crate::cache::{blacklist_key, Cache};
use crate::domain::User;
use crate::error::{AuthError, ResultExt, Result};
use crate::repository::UserRepository;
use crate::token::TokenCodec;
use chrono::Utc;
use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Outcome of [`SessionService::validate_session`].
#[derive(Debug, Clone)]
pub struct SessionValidation {
    pub user: User,
    /// The caller should issue a new token and replace the client's copy.
    pub refresh_recommended: bool,
}

/// Hex SHA-256 of a token, the only form in which tokens reach the cache.
pub fn token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub struct SessionService {
    codec: Arc<TokenCodec>,
    cache: Arc<dyn Cache>,
    users: Arc<dyn UserRepository>,
}

impl SessionService {
    pub fn new(
        codec: Arc<TokenCodec>,
        cache: Arc<dyn Cache>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            codec,
            cache,
            users,
        }
    }

    /// Issue a new session token for `user_id`.
    pub fn create_session(&self, user_id: uuid::Uuid) -> Result<String> {
        self.codec.issue(user_id).within("create session")
    }

    /// Check a presented token and resolve its user.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` if the token was logged out, fails verification, or
    ///   belongs to a deactivated user
    /// - the repository error (usually `NotFound`) if the user is gone
    /// - `Internal` if the revocation list cannot be read
    pub async fn validate_session(&self, token: &str) -> Result<SessionValidation> {
        let hash = token_hash(token);
        let revoked = self
            .cache
            .exists(&blacklist_key(&hash))
            .await
            .within("validate session")?;
        if revoked {
            debug!("Rejected revoked session token {}", hash);
            return Err(AuthError::unauthenticated("session token has been revoked")
                .within("validate session"));
        }

        let verified = self.codec.verify(token).within("validate session")?;
        let user = self
            .users
            .find_user_by_id(verified.user_id)
            .await
            .within("validate session")?;
        if !user.is_active {
            warn!("Session presented for inactive user {}", user.id);
            return Err(AuthError::unauthenticated("account is inactive").within("validate session"));
        }

        Ok(SessionValidation {
            user,
            refresh_recommended: verified.refresh_recommended,
        })
    }

    /// Revoke a token until its natural expiry.
    ///
    /// Expired tokens need no revocation entry, logging them out is a no-op.
    pub async fn logout(&self, token: &str) -> Result<()> {
        let expiry = self.codec.introspect_expiry(token).within("logout")?;
        let remaining = expiry.expires_at - Utc::now();
        let ttl = match remaining.to_std() {
            Ok(ttl) if !ttl.is_zero() => ttl,
            _ => {
                debug!("Logout of already expired token for {}", expiry.user_id);
                return Ok(());
            }
        };

        let hash = token_hash(token);
        self.cache
            .set(&blacklist_key(&hash), "1", ttl)
            .await
            .within("logout")?;
        info!(
            "User {} logged out, token revoked for {}s",
            expiry.user_id,
            ttl.as_secs()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hash_is_hex_sha256() {
        let hash = token_hash("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(token_hash("abd"), hash);
    }
}
