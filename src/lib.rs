// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust account authentication library
//!
//! Session tokens, OAuth federated login and account linkage.
//!
//! - [`token`]: Ed25519 signed session tokens with proactive refresh
//! - [`cache`]: revocation cache contract with Redis and in-memory backends
//! - [`repository`]: user and provider linkage persistence contract
//! - [`oauth`]: identity provider trait, registry and Google implementation
//! - [`services`]: session, federated login and account services
//! - [`server`]: Rocket HTTP surface with cookie sessions

pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod oauth;
pub mod repository;
pub mod server;
pub mod services;
pub mod token;

pub use error::{AuthError, ErrorKind};
