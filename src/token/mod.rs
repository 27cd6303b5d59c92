// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session token signing and verification.

pub mod claims;
pub mod codec;
pub mod keys;

pub use claims::SessionClaims;
pub use codec::{TokenCodec, TokenExpiry, TokenSettings, VerifiedToken};
pub use keys::{generate_seed, SessionKeyPair, SEED_LENGTH};
