// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Account and login data types shared by the services.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Stored lower-cased and trimmed.
    pub email: String,
    pub credits: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Binds a user to the single identity provider account it signed up with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderLinkage {
    pub user_id: Uuid,
    pub provider: String,
    pub provider_user_id: String,
}

/// Public projection of a [`User`] returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub credits: i64,
}

impl From<&User> for Profile {
    fn from(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            credits: user.credits,
        }
    }
}

/// Identity returned by an identity provider's profile endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub provider_user_id: String,
    pub email_verified: bool,
}

/// Outcome of a completed federated login, before any account decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResult {
    pub first_name: String,
    pub last_name: String,
    /// Lower-cased and trimmed.
    pub email: String,
    pub provider: String,
    pub provider_user_id: String,
}

/// Session token and profile handed back after a successful login.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub token: String,
    pub profile: Profile,
}

/// Extra parameters forwarded to the identity provider.
///
/// They are stored next to the OAuth state so the callback sees the same
/// parameters as the redirect that started the flow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OauthOptions {
    pub params: BTreeMap<String, String>,
}

impl OauthOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns `base` overlaid with `self`, entries of `self` win.
    pub fn merged_over(&self, base: &OauthOptions) -> OauthOptions {
        let mut params = base.params.clone();
        params.extend(self.params.clone());
        OauthOptions { params }
    }
}

/// Lower-case and trim an email address for storage and comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  ADA@Ex.com \n"), "ada@ex.com");
    }

    #[test]
    fn caller_options_override_stored_ones() {
        let stored = OauthOptions::new()
            .with_param("prompt", "consent")
            .with_param("login_hint", "ada@ex.com");
        let caller = OauthOptions::new().with_param("prompt", "select_account");

        let merged = caller.merged_over(&stored);
        assert_eq!(merged.get("prompt"), Some("select_account"));
        assert_eq!(merged.get("login_hint"), Some("ada@ex.com"));
    }

    #[test]
    fn profile_uses_camel_case() {
        let profile = Profile {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@ex.com".into(),
            credits: 10,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["lastName"], "Lovelace");
        assert_eq!(json["credits"], 10);
    }
}
