// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! User and provider linkage persistence contract.
//!
//! Implementations own the uniqueness guarantees the account logic relies on:
//! one user per (case-insensitive) email and one linkage per user, both
//! reported as `AlreadyExists` on conflict.

pub mod memory;

pub use memory::InMemoryUserRepository;

use crate::domain::{ProviderLinkage, User};
use crate::error::Result;
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create an active user. `AlreadyExists` if the email is taken.
    async fn create_user(&self, first_name: &str, last_name: &str, email: &str) -> Result<User>;

    /// `NotFound` if no user has this id.
    async fn find_user_by_id(&self, id: Uuid) -> Result<User>;

    /// Case-insensitive lookup, `NotFound` if no user has this email.
    async fn find_user_by_email(&self, email: &str) -> Result<User>;

    /// `NotFound` if the user has no linkage yet.
    async fn find_provider_linkage(&self, user_id: Uuid) -> Result<ProviderLinkage>;

    /// `AlreadyExists` if the user already has a linkage, `NotFound` if the
    /// user does not exist.
    async fn create_provider_linkage(
        &self,
        user_id: Uuid,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<ProviderLinkage>;
}
