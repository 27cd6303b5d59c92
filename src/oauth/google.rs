// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Google sign-in through the OAuth 2.0 authorization-code flow.

use super::OauthProvider;
use crate::config::GoogleConfig;
use crate::domain::{OauthOptions, ProviderProfile};
use crate::error::{AuthError, ErrorKind, Result};
use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use log::{debug, warn};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;

/// Registry name of the Google provider.
pub const GOOGLE_PROVIDER: &str = "google";

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const SCOPES: [&str; 3] = [
    "openid",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

/// Query parameters owned by the provider, callers cannot override them.
///
/// `code_verifier` is a back-channel secret and never enters the redirect; the
/// challenge pair is derived from it.
const RESERVED_PARAMS: [&str; 8] = [
    "client_id",
    "redirect_uri",
    "response_type",
    "scope",
    "state",
    "code_verifier",
    "code_challenge",
    "code_challenge_method",
];

/// S256 PKCE challenge of `verifier`.
fn pkce_challenge(verifier: &str) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Subset of the v2 userinfo document.
#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: String,
    #[serde(default)]
    verified_email: bool,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
}

pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
    redirect_uri: Url,
    auth_url: Url,
    token_url: Url,
    userinfo_url: Url,
    http: reqwest::Client,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[HIDDEN]")
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("token_url", &self.token_url.as_str())
            .finish()
    }
}

impl GoogleProvider {
    /// Create a provider talking to the public Google endpoints.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: &str,
        http: reqwest::Client,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: Url::parse(redirect_uri).context("Invalid Google redirect URL")?,
            auth_url: Url::parse(GOOGLE_AUTH_URL)?,
            token_url: Url::parse(GOOGLE_TOKEN_URL)?,
            userinfo_url: Url::parse(GOOGLE_USERINFO_URL)?,
            http,
        })
    }

    /// Point the provider at other endpoints, used against mock servers.
    pub fn with_endpoints(
        mut self,
        auth_url: &str,
        token_url: &str,
        userinfo_url: &str,
    ) -> anyhow::Result<Self> {
        self.auth_url = Url::parse(auth_url).context("Invalid Google auth URL")?;
        self.token_url = Url::parse(token_url).context("Invalid Google token URL")?;
        self.userinfo_url = Url::parse(userinfo_url).context("Invalid Google userinfo URL")?;
        Ok(self)
    }

    pub fn from_config(config: &GoogleConfig, http: reqwest::Client) -> anyhow::Result<Self> {
        Self::new(
            config.client_id.as_str(),
            config.client_secret.as_str(),
            &config.redirect_url,
            http,
        )?
        .with_endpoints(&config.auth_url, &config.token_url, &config.userinfo_url)
    }

    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!("Google {} returned {}: {}", operation, status, body);
        Err(AuthError::unavailable(format!(
            "google {} returned {}",
            operation, status
        )))
    }

    fn transport_error(operation: &str, err: reqwest::Error) -> AuthError {
        warn!("Google {} failed: {}", operation, err);
        AuthError::with_source(
            ErrorKind::Unavailable,
            format!("google {} failed", operation),
            err,
        )
    }
}

#[async_trait]
impl OauthProvider for GoogleProvider {
    fn name(&self) -> String {
        GOOGLE_PROVIDER.to_string()
    }

    fn authorization_url(&self, state: &str, options: &OauthOptions) -> Result<String> {
        let mut url = self.auth_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", self.redirect_uri.as_str())
                .append_pair("response_type", "code")
                .append_pair("scope", &SCOPES.join(" "))
                .append_pair("state", state);
            if options.get("access_type").is_none() {
                query.append_pair("access_type", "online");
            }
            if let Some(verifier) = options.get("code_verifier") {
                query
                    .append_pair("code_challenge", &pkce_challenge(verifier))
                    .append_pair("code_challenge_method", "S256");
            }
            for (key, value) in &options.params {
                if !RESERVED_PARAMS.contains(&key.as_str()) {
                    query.append_pair(key, value);
                }
            }
        }
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str, options: &OauthOptions) -> Result<String> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];
        if let Some(verifier) = options.get("code_verifier") {
            params.push(("code_verifier", verifier));
        }

        let response = self
            .http
            .post(self.token_url.clone())
            .form(&params)
            .send()
            .await
            .map_err(|e| Self::transport_error("token exchange", e))?;
        let response = Self::ensure_success(response, "token exchange").await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Self::transport_error("token exchange", e))?;
        debug!("Google code exchange succeeded");
        Ok(token.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile> {
        let response = self
            .http
            .get(self.userinfo_url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Self::transport_error("userinfo request", e))?;
        let response = Self::ensure_success(response, "userinfo request").await?;
        let info: GoogleUserInfo = response
            .json()
            .await
            .map_err(|e| Self::transport_error("userinfo request", e))?;

        Ok(ProviderProfile {
            first_name: info.given_name,
            last_name: info.family_name,
            email: info.email,
            provider_user_id: info.id,
            email_verified: info.verified_email,
        })
    }
}
