// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Ed25519 key pair used to sign session tokens.
//!
//! The pair is derived from a 32-byte seed, so a process restarted with the same
//! seed keeps accepting the tokens it issued before. Rotating the seed
//! invalidates every outstanding session.

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::SigningKey;
use jsonwebtoken::{DecodingKey, EncodingKey};
use std::fmt;

/// Length in bytes of the secret seed.
pub const SEED_LENGTH: usize = 32;

/// Signing and verification keys for session tokens.
///
/// Build it once at startup and share it behind an `Arc`; it is immutable.
pub struct SessionKeyPair {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    public_key_pem: String,
}

impl fmt::Debug for SessionKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeyPair")
            .field("encoding_key", &"[HIDDEN]")
            .field("decoding_key", &"[HIDDEN]")
            .field("public_key_pem", &self.public_key_pem)
            .finish()
    }
}

impl SessionKeyPair {
    /// Derive the key pair from raw seed bytes.
    ///
    /// # Errors
    ///
    /// Fails if the seed is not exactly [`SEED_LENGTH`] bytes long or if the
    /// derived keys cannot be encoded for the JWT library.
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        let seed: [u8; SEED_LENGTH] = seed.try_into().map_err(|_| {
            anyhow!(
                "Session seed must be {} bytes, got {}",
                SEED_LENGTH,
                seed.len()
            )
        })?;

        let signing_key = SigningKey::from_bytes(&seed);
        let private_pem = signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| anyhow!("Failed to encode session private key: {}", e))?;
        let public_key_pem = signing_key
            .verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| anyhow!("Failed to encode session public key: {}", e))?;

        let encoding_key = EncodingKey::from_ed_pem(private_pem.as_bytes())
            .context("Failed to load session private key")?;
        let decoding_key = DecodingKey::from_ed_pem(public_key_pem.as_bytes())
            .context("Failed to load session public key")?;

        Ok(Self {
            encoding_key,
            decoding_key,
            public_key_pem,
        })
    }

    /// Derive the key pair from a base64 (standard alphabet) encoded seed.
    pub fn from_base64_seed(seed: &str) -> Result<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(seed.trim())
            .context("Session seed is not valid base64")?;
        Self::from_seed(&bytes)
    }

    /// Public key in SPKI PEM form, for publishing to other verifiers.
    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

/// Generate a fresh random seed, base64 encoded.
pub fn generate_seed() -> String {
    let seed: [u8; SEED_LENGTH] = rand::random();
    base64::engine::general_purpose::STANDARD.encode(seed)
}
