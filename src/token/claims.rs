// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Claims carried by a session token.

use serde::{Deserialize, Serialize};

/// Session token claims
///
/// Standard RFC 7519 claims only. The token is an identity assertion, it carries
/// no scope or profile data: the user is always re-read from the repository.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    /// Subject, the user id as a hyphenated UUID
    pub sub: String,

    /// Issued at, Unix seconds
    pub iat: i64,

    /// Expiration, Unix seconds
    pub exp: i64,

    /// Unique token id (UUID v4)
    ///
    /// Two tokens issued for the same user within the same second still differ,
    /// which keeps their revocation hashes distinct.
    pub jti: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,
}
