// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use rust_account_auth::cache::{Cache, MemoryCache};
use rust_account_auth::domain::{OauthOptions, ProviderLinkage, ProviderProfile, User};
use rust_account_auth::error::{AuthError, Result};
use rust_account_auth::oauth::{OauthProvider, ProviderRegistry};
use rust_account_auth::repository::{InMemoryUserRepository, UserRepository};
use rust_account_auth::services::{AccountService, FederatedLoginService, SessionService};
use rust_account_auth::token::{SessionKeyPair, TokenCodec, TokenSettings};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Provider double answering with a fixed profile and counting calls.
pub struct StubProvider {
    name: String,
    profile: Mutex<ProviderProfile>,
    pub exchanges: AtomicUsize,
    pub last_options: Mutex<Option<OauthOptions>>,
}

impl StubProvider {
    pub fn new(name: &str, profile: ProviderProfile) -> Self {
        Self {
            name: name.to_string(),
            profile: Mutex::new(profile),
            exchanges: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        }
    }

    pub fn set_profile(&self, profile: ProviderProfile) {
        *self.profile.lock().unwrap() = profile;
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OauthProvider for StubProvider {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn authorization_url(&self, state: &str, _options: &OauthOptions) -> Result<String> {
        Ok(format!(
            "https://{}.idp.test/authorize?client_id=test&state={}",
            self.name, state
        ))
    }

    async fn exchange_code(&self, code: &str, options: &OauthOptions) -> Result<String> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options.clone());
        if code == "rejected" {
            return Err(AuthError::unavailable("token endpoint returned 400"));
        }
        Ok(format!("access-{}", code))
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<ProviderProfile> {
        Ok(self.profile.lock().unwrap().clone())
    }
}

pub fn profile(first: &str, last: &str, email: &str, id: &str) -> ProviderProfile {
    ProviderProfile {
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: email.to_string(),
        provider_user_id: id.to_string(),
        email_verified: true,
    }
}

pub fn ada() -> ProviderProfile {
    profile("Ada", "Lovelace", "ADA@EX.com", "google-ada")
}

pub fn keys() -> Arc<SessionKeyPair> {
    Arc::new(SessionKeyPair::from_seed(&[11u8; 32]).unwrap())
}

/// Every collaborator of the account service, exposed for assertions.
pub struct Harness {
    pub cache: Arc<MemoryCache>,
    pub users: Arc<InMemoryUserRepository>,
    pub codec: Arc<TokenCodec>,
    pub google: Arc<StubProvider>,
    pub github: Arc<StubProvider>,
    pub login: Arc<FederatedLoginService>,
    pub sessions: Arc<SessionService>,
    pub accounts: Arc<AccountService>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(TokenSettings::default())
    }

    pub fn with_settings(settings: TokenSettings) -> Self {
        let users = Arc::new(InMemoryUserRepository::new().with_initial_credits(100));
        Self::build(settings, users.clone(), users)
    }

    /// Services reading and writing accounts through `repository`, which is
    /// expected to persist into `users`.
    pub fn with_repository(
        repository: Arc<dyn UserRepository>,
        users: Arc<InMemoryUserRepository>,
    ) -> Self {
        Self::build(TokenSettings::default(), repository, users)
    }

    fn build(
        settings: TokenSettings,
        repository: Arc<dyn UserRepository>,
        users: Arc<InMemoryUserRepository>,
    ) -> Self {
        init_logging();
        let cache = Arc::new(MemoryCache::new());
        let codec = Arc::new(TokenCodec::new(keys(), settings));
        let google = Arc::new(StubProvider::new("google", ada()));
        let github = Arc::new(StubProvider::new(
            "github",
            profile("Ada", "Lovelace", "ada@ex.com", "github-ada"),
        ));
        let registry = Arc::new(
            ProviderRegistry::new()
                .register(google.clone())
                .register(github.clone()),
        );

        let cache_dyn: Arc<dyn Cache> = cache.clone();
        let login = Arc::new(FederatedLoginService::new(registry, cache_dyn.clone()));
        let sessions = Arc::new(SessionService::new(
            codec.clone(),
            cache_dyn,
            repository.clone(),
        ));
        let accounts = Arc::new(AccountService::new(
            login.clone(),
            sessions.clone(),
            repository,
        ));

        Self {
            cache,
            users,
            codec,
            google,
            github,
            login,
            sessions,
            accounts,
        }
    }

    /// Run `begin_auth` for `provider` and return the issued state.
    pub async fn begin(&self, provider: &str) -> String {
        let url = self
            .accounts
            .begin_auth(provider, &OauthOptions::default())
            .await
            .unwrap();
        state_from_url(&url)
    }
}

/// Repository where a concurrent sign-in wins the next write.
///
/// The rival's row is stored first, then the write reports `AlreadyExists`,
/// as a unique constraint would.
pub struct RacingRepository {
    inner: Arc<InMemoryUserRepository>,
    lose_user_insert: AtomicBool,
    rival_linkage: Mutex<Option<String>>,
}

impl RacingRepository {
    pub fn new(inner: Arc<InMemoryUserRepository>) -> Self {
        Self {
            inner,
            lose_user_insert: AtomicBool::new(false),
            rival_linkage: Mutex::new(None),
        }
    }

    /// The next `create_user` loses against an identical sign-up.
    pub fn lose_next_user_insert(self) -> Self {
        self.lose_user_insert.store(true, Ordering::SeqCst);
        self
    }

    /// The next `create_provider_linkage` loses against a rival linking `provider`.
    pub fn lose_next_linkage_to(self, provider: &str) -> Self {
        *self.rival_linkage.lock().unwrap() = Some(provider.to_string());
        self
    }
}

#[async_trait]
impl UserRepository for RacingRepository {
    async fn create_user(&self, first_name: &str, last_name: &str, email: &str) -> Result<User> {
        if self.lose_user_insert.swap(false, Ordering::SeqCst) {
            self.inner.create_user(first_name, last_name, email).await?;
            return Err(AuthError::already_exists("duplicate email"));
        }
        self.inner.create_user(first_name, last_name, email).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<User> {
        self.inner.find_user_by_id(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<User> {
        self.inner.find_user_by_email(email).await
    }

    async fn find_provider_linkage(&self, user_id: Uuid) -> Result<ProviderLinkage> {
        self.inner.find_provider_linkage(user_id).await
    }

    async fn create_provider_linkage(
        &self,
        user_id: Uuid,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<ProviderLinkage> {
        let rival = self.rival_linkage.lock().unwrap().take();
        if let Some(rival) = rival {
            self.inner
                .create_provider_linkage(user_id, &rival, "rival-account")
                .await?;
            return Err(AuthError::already_exists("duplicate linkage"));
        }
        self.inner
            .create_provider_linkage(user_id, provider, provider_user_id)
            .await
    }
}

pub fn state_from_url(url: &str) -> String {
    url::Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("authorization URL carries a state")
}
