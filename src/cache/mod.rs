// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Revocation cache
//!
//! A TTL key-value store shared by the session service (token blacklist) and the
//! federated login service (OAuth state). Every write carries an explicit TTL so
//! nothing written by an interrupted request outlives its purpose.
//!
//! Two implementations are provided:
//! - [`RedisCache`] for deployments with several server instances
//! - [`MemoryCache`] for single-process deployments and tests

pub mod memory;
pub mod redis;

pub use self::memory::MemoryCache;
pub use self::redis::RedisCache;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Key-value store with per-entry expiry.
///
/// Implementations must be safe for concurrent use and report transport
/// failures as `Internal` errors.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Read a value, `NotFound` when absent or expired.
    async fn get(&self, key: &str) -> Result<String>;

    /// Write a value expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Remove a value, absent keys are not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Atomically read and remove a value, `NotFound` when absent or expired.
    ///
    /// Two concurrent calls on the same key never both succeed.
    async fn take(&self, key: &str) -> Result<String>;
}

/// Key holding the provider name of a pending OAuth flow.
pub fn state_provider_key(state: &str) -> String {
    format!("provider:{}", state)
}

/// Key holding the JSON encoded extra parameters of a pending OAuth flow.
pub fn state_options_key(state: &str) -> String {
    format!("options:{}", state)
}

/// Key marking a session token as logged out.
pub fn blacklist_key(token_hash: &str) -> String {
    format!("blacklist:{}", token_hash)
}
