// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session cookie attributes.

use crate::config::ServerConfig;
use rocket::http::{Cookie, SameSite};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone)]
pub struct CookieSettings {
    /// Domain attribute, host-only cookie when `None`
    pub domain: Option<String>,
    pub secure: bool,
    /// Max-Age in seconds, matches the token lifetime
    pub max_age_seconds: i64,
}

impl CookieSettings {
    pub fn from_config(server: &ServerConfig, token_lifetime: chrono::Duration) -> Self {
        Self {
            domain: server.cookie_domain.clone(),
            secure: server.secure_cookie,
            max_age_seconds: token_lifetime.num_seconds(),
        }
    }

    /// `HttpOnly`, `SameSite=Lax` cookie holding `token`.
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        let mut builder = Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(rocket::time::Duration::seconds(self.max_age_seconds));
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }

    /// Cookie to hand to `CookieJar::remove`, path and domain must match the
    /// ones used when it was set.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        let mut builder = Cookie::build(SESSION_COOKIE).path("/");
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }
}
