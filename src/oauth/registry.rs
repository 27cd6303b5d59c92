// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use super::{GoogleProvider, OauthProvider};
use crate::config::OauthConfig;
use crate::error::{AuthError, Result};
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Name to provider lookup table, filled once at startup.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn OauthProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider under its own name, replacing any previous one.
    pub fn register(mut self, provider: Arc<dyn OauthProvider>) -> Self {
        info!("Registering identity provider {}", provider.name());
        self.providers.insert(provider.name(), provider);
        self
    }

    /// Build the registry from the `oauth` configuration section.
    ///
    /// Providers without configuration are simply not registered.
    pub fn from_config(config: &OauthConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .build()?;

        let mut registry = Self::new();
        if let Some(google) = &config.google {
            registry = registry.register(Arc::new(GoogleProvider::from_config(google, http)?));
        }
        Ok(registry)
    }

    /// Look up a provider, `Invalid` if the name is not registered.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn OauthProvider>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| AuthError::invalid(format!("unknown login provider {:?}", name)))
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
