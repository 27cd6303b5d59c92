// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Two-phase OAuth authorization-code flow
//!
//! [`FederatedLoginService::begin`] issues a random `state`, remembers which
//! provider it was issued for and returns the provider's authorization URL.
//! [`FederatedLoginService::complete`] consumes that state exactly once, then
//! exchanges the code and reads the profile from the same provider.
//!
//! The provider used on completion always comes from the stored state, never
//! from the callback request.

use crate::cache::{state_options_key, state_provider_key, Cache};
use crate::domain::{normalize_email, LoginResult, OauthOptions};
use crate::error::{AuthError, ErrorKind, ResultExt, Result};
use crate::oauth::ProviderRegistry;
use base64::Engine;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Lifetime of a pending OAuth state.
pub const DEFAULT_STATE_TTL: Duration = Duration::from_secs(10 * 60);

/// Random bytes behind each state value.
pub const STATE_BYTES: usize = 32;

/// Provider name meaning "none selected".
const UNSPECIFIED_PROVIDER: &str = "unspecified";

/// Generate an unguessable, URL-safe state value.
pub fn generate_state() -> String {
    let bytes: [u8; STATE_BYTES] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

pub struct FederatedLoginService {
    registry: Arc<ProviderRegistry>,
    cache: Arc<dyn Cache>,
    state_ttl: Duration,
}

impl FederatedLoginService {
    pub fn new(registry: Arc<ProviderRegistry>, cache: Arc<dyn Cache>) -> Self {
        Self {
            registry,
            cache,
            state_ttl: DEFAULT_STATE_TTL,
        }
    }

    pub fn with_state_ttl(mut self, ttl: Duration) -> Self {
        self.state_ttl = ttl;
        self
    }

    /// Start a login with `provider` and return the URL to redirect the user to.
    ///
    /// # Errors
    ///
    /// - `Invalid` if the provider is empty, unspecified or not registered
    /// - `Internal` if the state cannot be stored
    pub async fn begin(&self, provider: &str, options: &OauthOptions) -> Result<String> {
        let provider = provider.trim();
        if provider.is_empty() || provider == UNSPECIFIED_PROVIDER {
            return Err(AuthError::invalid("login provider must be specified").within("begin login"));
        }
        let capability = self.registry.resolve(provider).within("begin login")?;

        let state = generate_state();
        self.cache
            .set(&state_provider_key(&state), &capability.name(), self.state_ttl)
            .await
            .within("begin login")?;

        if !options.is_empty() {
            let encoded = serde_json::to_string(options).map_err(|e| {
                AuthError::with_source(ErrorKind::Internal, "failed to encode login options", e)
            })?;
            self.cache
                .set(&state_options_key(&state), &encoded, self.state_ttl)
                .await
                .within("begin login")?;
        }

        debug!("Issued OAuth state for provider {}", provider);
        capability
            .authorization_url(&state, options)
            .within("begin login")
    }

    /// Finish a login from the provider callback.
    ///
    /// Options stored at [`begin`](Self::begin) are merged under `options`.
    ///
    /// # Errors
    ///
    /// - `Invalid` for an empty code or state, or a state that is unknown,
    ///   expired or already used
    /// - `Unavailable` if the provider cannot be reached or refuses the code
    /// - `UnverifiedEmail` if the provider has not verified the email
    pub async fn complete(
        &self,
        code: &str,
        state: &str,
        options: &OauthOptions,
    ) -> Result<LoginResult> {
        if code.is_empty() || state.is_empty() {
            return Err(AuthError::invalid("code and state are required").within("complete login"));
        }

        let provider_name = match self.cache.take(&state_provider_key(state)).await {
            Ok(name) => name,
            Err(e) if e.is(ErrorKind::NotFound) => {
                warn!("OAuth callback with unknown or expired state");
                return Err(
                    AuthError::invalid("login state is unknown or expired").within("complete login")
                );
            }
            Err(e) => return Err(e.within("complete login")),
        };
        let provider = self.registry.resolve(&provider_name).within("complete login")?;
        let options = options.merged_over(&self.take_stored_options(state).await);

        let access_token = provider
            .exchange_code(code, &options)
            .await
            .within("complete login")?;
        let profile = provider
            .fetch_profile(&access_token)
            .await
            .within("complete login")?;

        if !profile.email_verified {
            return Err(AuthError::unverified_email(format!(
                "{} has not verified the email address",
                provider_name
            ))
            .within("complete login"));
        }
        let email = normalize_email(&profile.email);
        if email.is_empty() {
            return Err(AuthError::invalid(format!("{} returned no email", provider_name))
                .within("complete login"));
        }

        info!("Completed {} login", provider_name);
        Ok(LoginResult {
            first_name: profile.first_name,
            last_name: profile.last_name,
            email,
            provider: provider_name,
            provider_user_id: profile.provider_user_id,
        })
    }

    /// Stored options are best effort: a missing or unreadable entry yields none.
    async fn take_stored_options(&self, state: &str) -> OauthOptions {
        match self.cache.take(&state_options_key(state)).await {
            Ok(encoded) => serde_json::from_str(&encoded).unwrap_or_else(|e| {
                warn!("Discarding unreadable login options: {}", e);
                OauthOptions::default()
            }),
            Err(e) => {
                if !e.is(ErrorKind::NotFound) {
                    warn!("Could not read login options: {}", e);
                }
                OauthOptions::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::domain::ProviderProfile;
    use crate::oauth::MockOauthProvider;

    fn service_with(provider: MockOauthProvider) -> (FederatedLoginService, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new());
        let registry = Arc::new(ProviderRegistry::new().register(Arc::new(provider)));
        (FederatedLoginService::new(registry, cache.clone()), cache)
    }

    fn named_mock() -> MockOauthProvider {
        let mut provider = MockOauthProvider::new();
        provider.expect_name().return_const("google".to_string());
        provider
    }

    #[test]
    fn states_are_url_safe_and_unique() {
        let a = generate_state();
        let b = generate_state();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test]
    async fn unknown_state_never_reaches_the_provider() {
        let mut provider = named_mock();
        provider.expect_exchange_code().times(0);
        provider.expect_fetch_profile().times(0);
        let (service, _) = service_with(provider);

        let err = service
            .complete("code", "forged-state", &OauthOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[tokio::test]
    async fn stored_options_reach_the_exchange() {
        let mut provider = named_mock();
        provider
            .expect_authorization_url()
            .returning(|state, _| Ok(format!("https://idp.test/auth?state={}", state)));
        provider
            .expect_exchange_code()
            .withf(|code, options| {
                code.to_string() == "c0de" && options.get("code_verifier") == Some("v3r")
            })
            .times(1)
            .returning(|_, _| Ok("access".to_string()));
        provider
            .expect_fetch_profile()
            .withf(|token| token.to_string() == "access")
            .times(1)
            .returning(|_| {
                Ok(ProviderProfile {
                    first_name: "Ada".into(),
                    last_name: "Lovelace".into(),
                    email: "Ada@Ex.com".into(),
                    provider_user_id: "g-1".into(),
                    email_verified: true,
                })
            });
        let (service, cache) = service_with(provider);

        let options = OauthOptions::new().with_param("code_verifier", "v3r");
        let url = service.begin("google", &options).await.unwrap();
        let state = url.split("state=").nth(1).unwrap().to_string();
        assert!(cache.exists(&state_options_key(&state)).await.unwrap());

        let result = service
            .complete("c0de", &state, &OauthOptions::new())
            .await
            .unwrap();
        assert_eq!(result.email, "ada@ex.com");
        assert_eq!(result.provider, "google");
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn unverified_email_is_reported_distinctly() {
        let mut provider = named_mock();
        provider
            .expect_authorization_url()
            .returning(|state, _| Ok(format!("https://idp.test/auth?state={}", state)));
        provider
            .expect_exchange_code()
            .returning(|_, _| Ok("access".to_string()));
        provider.expect_fetch_profile().returning(|_| {
            Ok(ProviderProfile {
                first_name: "Eve".into(),
                last_name: "Mallory".into(),
                email: "eve@ex.com".into(),
                provider_user_id: "g-2".into(),
                email_verified: false,
            })
        });
        let (service, _) = service_with(provider);

        let url = service.begin("google", &OauthOptions::new()).await.unwrap();
        let state = url.split("state=").nth(1).unwrap().to_string();
        let err = service
            .complete("code", &state, &OauthOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnverifiedEmail);
    }

    #[tokio::test]
    async fn provider_failures_keep_their_kind() {
        let mut provider = named_mock();
        provider
            .expect_authorization_url()
            .returning(|state, _| Ok(format!("https://idp.test/auth?state={}", state)));
        provider
            .expect_exchange_code()
            .returning(|_, _| Err(AuthError::unavailable("token endpoint returned 503")));
        provider.expect_fetch_profile().times(0);
        let (service, _) = service_with(provider);

        let url = service.begin("google", &OauthOptions::new()).await.unwrap();
        let state = url.split("state=").nth(1).unwrap().to_string();
        let err = service
            .complete("code", &state, &OauthOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(err.to_string().starts_with("complete login: "));
    }

    #[tokio::test]
    async fn begin_rejects_missing_provider() {
        let (service, cache) = service_with(named_mock());
        for name in ["", "  ", "unspecified", "github"] {
            let err = service.begin(name, &OauthOptions::new()).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Invalid);
        }
        assert!(cache.is_empty());
    }
}
