// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Identity providers
//!
//! Every third-party identity provider implements [`OauthProvider`] and is
//! registered by name in a [`ProviderRegistry`] when the server starts. The
//! federated login service only talks to providers through the trait.

pub mod google;
pub mod registry;

pub use google::{GoogleProvider, GOOGLE_PROVIDER};
pub use registry::ProviderRegistry;

use crate::domain::{OauthOptions, ProviderProfile};
use crate::error::Result;
use async_trait::async_trait;

/// Authorization-code flow capabilities of one identity provider.
///
/// Implementations translate their own failures: transport errors, non-success
/// HTTP statuses and undecodable bodies are reported as `Unavailable`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OauthProvider: Send + Sync {
    /// Registry key, also stored in provider linkages.
    fn name(&self) -> String;

    /// URL the end user is redirected to, carrying `state`.
    fn authorization_url(&self, state: &str, options: &OauthOptions) -> Result<String>;

    /// Exchange an authorization code for an access token.
    async fn exchange_code(&self, code: &str, options: &OauthOptions) -> Result<String>;

    /// Read the identity behind an access token.
    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile>;
}
