// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Authentication services, leaf first: sessions, federated login, accounts.

pub mod account;
pub mod federated;
pub mod session;

pub use account::AccountService;
pub use federated::{generate_state, FederatedLoginService, DEFAULT_STATE_TTL};
pub use session::{token_hash, SessionService, SessionValidation};
