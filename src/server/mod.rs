// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # HTTP server
//!
//! Rocket application exposing the authentication services:
//!
//! | Route                     | Purpose                                  |
//! |---------------------------|------------------------------------------|
//! | `POST /api/auth/begin`    | provider authorization URL               |
//! | `POST /api/auth/finish`   | finish login, sets the session cookie    |
//! | `GET  /api/auth/callback` | same as finish, for direct redirects     |
//! | `POST /api/auth/logout`   | revoke session, clear cookie             |
//! | `GET  /api/profile`       | profile of the signed-in user            |
//! | `GET  /healthz`           | liveness                                 |

pub mod cookies;
pub mod error;
pub mod guard;
pub mod handlers;

pub use cookies::{CookieSettings, SESSION_COOKIE};
pub use error::ApiError;
pub use guard::SessionUser;

use crate::cache::{Cache, MemoryCache, RedisCache};
use crate::config::{CacheBackend, Config};
use crate::oauth::ProviderRegistry;
use crate::repository::{InMemoryUserRepository, UserRepository};
use crate::services::{AccountService, FederatedLoginService, SessionService};
use crate::token::{SessionKeyPair, TokenCodec};
use anyhow::Context;
use log::{info, warn};
use rocket::data::{Limits, ToByteUnit};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::figment::Figment;
use rocket::http::Header;
use rocket::{catchers, routes, Build, Request, Response, Rocket};
use std::sync::Arc;

/// State shared by every request.
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub cookies: CookieSettings,
}

impl AppState {
    pub fn new(accounts: Arc<AccountService>, cookies: CookieSettings) -> Self {
        Self { accounts, cookies }
    }

    /// Wire the services described by `config`.
    ///
    /// The key pair is derived once here and shared by the codec; accounts are
    /// kept in memory.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let keys = Arc::new(
            SessionKeyPair::from_base64_seed(&config.session.seed)
                .context("Failed to derive the session key pair")?,
        );
        let settings = config.session.token_settings();
        let cookies = CookieSettings::from_config(&config.server, settings.lifetime);
        let codec = Arc::new(TokenCodec::new(keys, settings));

        let cache: Arc<dyn Cache> = match config.cache.backend {
            CacheBackend::Memory => {
                info!("Using in-memory revocation cache");
                Arc::new(MemoryCache::new())
            }
            CacheBackend::Redis => {
                let url = config
                    .cache
                    .redis_url
                    .as_deref()
                    .context("cache.redis_url is required for the redis backend")?;
                let redis = RedisCache::new(url, config.cache.operation_timeout())?;
                if let Err(e) = redis.ping().await {
                    warn!("Redis is not reachable yet: {}", e);
                }
                Arc::new(redis)
            }
        };

        let users: Arc<dyn UserRepository> = Arc::new(
            InMemoryUserRepository::new().with_initial_credits(config.accounts.initial_credits),
        );
        let registry = Arc::new(ProviderRegistry::from_config(&config.oauth)?);
        if registry.names().is_empty() {
            warn!("No identity provider configured, logins will be refused");
        }

        let sessions = Arc::new(SessionService::new(codec, cache.clone(), users.clone()));
        let login = Arc::new(
            FederatedLoginService::new(registry, cache).with_state_ttl(config.cache.state_ttl()),
        );
        let accounts = Arc::new(AccountService::new(login, sessions, users));
        Ok(Self::new(accounts, cookies))
    }
}

/// Adds CORS headers for the configured origins.
///
/// Session cookies need credentialed requests, so the request origin is echoed
/// back instead of `*`, and only when it is allowed.
pub struct Cors {
    allowed_origins: Vec<String>,
}

impl Cors {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self { allowed_origins }
    }
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let Some(origin) = request.headers().get_one("Origin") else {
            return;
        };
        let origin = origin.trim_end_matches('/');
        if !self
            .allowed_origins
            .iter()
            .any(|allowed| allowed.trim_end_matches('/') == origin)
        {
            return;
        }
        response.set_header(Header::new("Access-Control-Allow-Origin", origin.to_string()));
        response.set_header(Header::new("Vary", "Origin"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "Content-Type"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

/// Rocket figment from the `server` configuration section.
pub fn figment_from_config(config: &Config) -> Figment {
    let mut figment = rocket::Config::figment()
        .merge(("ident", config.server.name.clone()))
        .merge(("limits", Limits::new().limit("json", 64.kibibytes())))
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port))
        .merge(("log_level", config.server.log_level.clone()));

    if let (Some(cert), Some(key)) = (&config.server.cert, &config.server.key) {
        figment = figment
            .merge(("tls.certs", cert.clone()))
            .merge(("tls.key", key.clone()));
    }
    figment
}

/// Build the Rocket instance serving `state`.
pub fn build_rocket(figment: Figment, state: AppState, allowed_origins: Vec<String>) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(Cors::new(allowed_origins))
        .manage(state)
        .mount(
            "/api",
            routes![
                handlers::begin,
                handlers::finish,
                handlers::callback,
                handlers::logout,
                handlers::profile,
            ],
        )
        .mount("/", routes![handlers::healthz, handlers::preflight])
        .register(
            "/",
            catchers![
                handlers::unauthorized,
                handlers::not_found,
                handlers::default_catcher
            ],
        )
}
