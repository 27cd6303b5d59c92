// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! In-process [`UserRepository`] used by single-node deployments and tests.

use super::UserRepository;
use crate::domain::{normalize_email, ProviderLinkage, User};
use crate::error::{AuthError, Result};
use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
struct Store {
    users: HashMap<Uuid, User>,
    /// Normalized email to user id
    emails: HashMap<String, Uuid>,
    linkages: HashMap<Uuid, ProviderLinkage>,
}

/// All data lives behind a single mutex, which makes every check-and-insert atomic.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    store: Mutex<Store>,
    initial_credits: i64,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits granted to every user created from now on.
    pub fn with_initial_credits(mut self, credits: i64) -> Self {
        self.initial_credits = credits;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>> {
        self.store
            .lock()
            .map_err(|_| AuthError::internal("user store lock poisoned"))
    }

    pub fn user_count(&self) -> usize {
        self.lock().map(|s| s.users.len()).unwrap_or(0)
    }

    pub fn linkage_count(&self) -> usize {
        self.lock().map(|s| s.linkages.len()).unwrap_or(0)
    }

    /// Mark a user inactive, returns false if unknown.
    pub fn deactivate_user(&self, id: Uuid) -> Result<bool> {
        let mut store = self.lock()?;
        Ok(match store.users.get_mut(&id) {
            Some(user) => {
                user.is_active = false;
                true
            }
            None => false,
        })
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, first_name: &str, last_name: &str, email: &str) -> Result<User> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::invalid("email is required"));
        }

        let mut store = self.lock()?;
        if store.emails.contains_key(&email) {
            return Err(AuthError::already_exists(format!(
                "a user with email {} already exists",
                email
            )));
        }

        let user = User {
            id: Uuid::new_v4(),
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: email.clone(),
            credits: self.initial_credits,
            is_active: true,
            created_at: Utc::now(),
        };
        store.emails.insert(email, user.id);
        store.users.insert(user.id, user.clone());
        debug!("Created user {}", user.id);
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<User> {
        self.lock()?
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AuthError::not_found(format!("user {} not found", id)))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<User> {
        let email = normalize_email(email);
        let store = self.lock()?;
        store
            .emails
            .get(&email)
            .and_then(|id| store.users.get(id))
            .cloned()
            .ok_or_else(|| AuthError::not_found(format!("no user with email {}", email)))
    }

    async fn find_provider_linkage(&self, user_id: Uuid) -> Result<ProviderLinkage> {
        self.lock()?
            .linkages
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AuthError::not_found(format!("user {} has no provider linkage", user_id)))
    }

    async fn create_provider_linkage(
        &self,
        user_id: Uuid,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<ProviderLinkage> {
        let mut store = self.lock()?;
        if !store.users.contains_key(&user_id) {
            return Err(AuthError::not_found(format!("user {} not found", user_id)));
        }
        if let Some(existing) = store.linkages.get(&user_id) {
            return Err(AuthError::already_exists(format!(
                "user {} is already linked to {}",
                user_id, existing.provider
            )));
        }

        let linkage = ProviderLinkage {
            user_id,
            provider: provider.to_string(),
            provider_user_id: provider_user_id.to_string(),
        };
        store.linkages.insert(user_id, linkage.clone());
        debug!("Linked user {} to provider {}", user_id, provider);
        Ok(linkage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn email_is_unique_regardless_of_case() {
        let repo = InMemoryUserRepository::new();
        let user = repo.create_user("Ada", "Lovelace", "Ada@Ex.com").await.unwrap();
        assert_eq!(user.email, "ada@ex.com");
        assert!(user.is_active);

        let err = repo
            .create_user("Ada", "Byron", " ADA@EX.COM ")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let found = repo.find_user_by_email("ADA@ex.com").await.unwrap();
        assert_eq!(found.id, user.id);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let repo = InMemoryUserRepository::new();
        let id = Uuid::new_v4();
        assert_eq!(
            repo.find_user_by_id(id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            repo.find_provider_linkage(id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            repo.create_provider_linkage(id, "google", "g-1")
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn one_linkage_per_user() {
        let repo = InMemoryUserRepository::new();
        let user = repo.create_user("Ada", "Lovelace", "ada@ex.com").await.unwrap();
        repo.create_provider_linkage(user.id, "google", "g-1")
            .await
            .unwrap();

        let err = repo
            .create_provider_linkage(user.id, "github", "gh-1")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        let linkage = repo.find_provider_linkage(user.id).await.unwrap();
        assert_eq!(linkage.provider, "google");
        assert_eq!(repo.linkage_count(), 1);
    }

    #[tokio::test]
    async fn initial_credits_and_deactivation() {
        let repo = InMemoryUserRepository::new().with_initial_credits(25);
        let user = repo.create_user("Ada", "Lovelace", "ada@ex.com").await.unwrap();
        assert_eq!(user.credits, 25);

        assert!(repo.deactivate_user(user.id).unwrap());
        assert!(!repo.find_user_by_id(user.id).await.unwrap().is_active);
        assert!(!repo.deactivate_user(Uuid::new_v4()).unwrap());
    }
}
