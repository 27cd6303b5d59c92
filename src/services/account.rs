// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Account orchestration
//!
//! Turns a completed federated login into an account and a session. An email
//! is bound to the first provider it signed in with; a later login for the same
//! email through another provider is refused with `AlreadyExists`.

use super::{FederatedLoginService, SessionService};
use crate::domain::{AuthResult, LoginResult, OauthOptions, Profile, ProviderLinkage, User};
use crate::error::{AuthError, ErrorKind, ResultExt, Result};
use crate::repository::UserRepository;
use log::{debug, info, warn};
use std::sync::Arc;
use uuid::Uuid;

pub struct AccountService {
    login: Arc<FederatedLoginService>,
    sessions: Arc<SessionService>,
    users: Arc<dyn UserRepository>,
}

impl AccountService {
    pub fn new(
        login: Arc<FederatedLoginService>,
        sessions: Arc<SessionService>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            login,
            sessions,
            users,
        }
    }

    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }

    /// Start a login, returns the provider authorization URL.
    pub async fn begin_auth(&self, provider: &str, options: &OauthOptions) -> Result<String> {
        self.login.begin(provider, options).await.within("begin auth")
    }

    /// Complete a login and open a session.
    ///
    /// # Errors
    ///
    /// Everything [`FederatedLoginService::complete`] reports, plus
    /// `AlreadyExists` when the email is linked to another provider and
    /// repository failures.
    pub async fn finish_auth(&self, code: &str, state: &str) -> Result<AuthResult> {
        let login = self
            .login
            .complete(code, state, &OauthOptions::default())
            .await
            .within("finish auth")?;

        let user = self.resolve_user(&login).await.within("finish auth")?;
        let token = self.sessions.create_session(user.id).within("finish auth")?;

        info!("User {} signed in with {}", user.id, login.provider);
        Ok(AuthResult {
            token,
            profile: Profile::from(&user),
        })
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        self.sessions.logout(token).await.within("logout")
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Profile> {
        let user = self
            .users
            .find_user_by_id(user_id)
            .await
            .within("get profile")?;
        Ok(Profile::from(&user))
    }

    /// Find the account for a login, creating it on first sign-in.
    async fn resolve_user(&self, login: &LoginResult) -> Result<User> {
        let user = match self.users.find_user_by_email(&login.email).await {
            Ok(user) => user,
            Err(e) if e.is(ErrorKind::NotFound) => self.create_user(login).await?,
            Err(e) => return Err(e),
        };
        self.ensure_linkage(&user, login).await?;
        Ok(user)
    }

    /// Create the user, or fetch it when a concurrent sign-in created it first.
    async fn create_user(&self, login: &LoginResult) -> Result<User> {
        match self
            .users
            .create_user(&login.first_name, &login.last_name, &login.email)
            .await
        {
            Ok(user) => {
                info!("Created account {} from {} login", user.id, login.provider);
                Ok(user)
            }
            Err(e) if e.is(ErrorKind::AlreadyExists) => {
                debug!("Concurrent sign-up detected, reusing existing account");
                self.users.find_user_by_email(&login.email).await
            }
            Err(e) => Err(e),
        }
    }

    /// Check the user's linkage matches the login provider, writing it if missing.
    ///
    /// A missing linkage means an earlier sign-up stopped between the two
    /// writes, or a concurrent one has not written it yet.
    async fn ensure_linkage(&self, user: &User, login: &LoginResult) -> Result<()> {
        let linkage = match self.users.find_provider_linkage(user.id).await {
            Ok(linkage) => linkage,
            Err(e) if e.is(ErrorKind::NotFound) => {
                match self
                    .users
                    .create_provider_linkage(user.id, &login.provider, &login.provider_user_id)
                    .await
                {
                    Ok(linkage) => linkage,
                    Err(e) if e.is(ErrorKind::AlreadyExists) => {
                        self.users.find_provider_linkage(user.id).await?
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };
        Self::check_provider(&linkage, login)
    }

    fn check_provider(linkage: &ProviderLinkage, login: &LoginResult) -> Result<()> {
        if linkage.provider != login.provider {
            warn!(
                "Refused {} login for user {} linked to {}",
                login.provider, linkage.user_id, linkage.provider
            );
            return Err(AuthError::already_exists(format!(
                "this email is already linked to {}",
                linkage.provider
            )));
        }
        Ok(())
    }
}
