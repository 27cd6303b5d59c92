// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-account-auth project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Configuration Management
//!
//! This module loads, validates and saves the server configuration. The file is
//! YAML, checked against the embedded JSON schema before it is deserialized,
//! then checked again for rules the schema cannot express.
//!
//! ## Configuration Structure
//!
//! - `server`: HTTP binding and session cookie attributes
//! - `session`: token signing seed, issuer, audience and timings
//! - `cache`: revocation cache backend and OAuth state lifetime
//! - `accounts`: defaults applied to newly created accounts
//! - `oauth`: identity provider credentials
//!
//! ## Usage
//!
//! ```no_run
//! use rust_account_auth::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(Some(8081), Some("0.0.0.0".to_string()), None);
//!
//! println!("Server port: {}", config.server.port);
//! ```

use crate::cache::redis::DEFAULT_OPERATION_TIMEOUT;
use crate::oauth::google::{GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, GOOGLE_USERINFO_URL};
use crate::services::DEFAULT_STATE_TTL;
use crate::token::codec::{
    DEFAULT_AUDIENCE, DEFAULT_ISSUER, DEFAULT_LEEWAY_SECONDS, DEFAULT_REFRESH_WINDOW_HOURS,
    DEFAULT_TOKEN_LIFETIME_HOURS,
};
use crate::token::{generate_seed, TokenSettings, SEED_LENGTH};
use anyhow::{Context, Result};
use base64::Engine;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::Path,
    time::Duration,
};

/// Root configuration structure.
///
/// Every section falls back to its defaults when missing from the file, so a
/// minimal configuration only needs the values that differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub accounts: AccountsConfig,

    #[serde(default)]
    pub oauth: OauthConfig,
}

/// HTTP server and session cookie settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// TCP port the server listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address to bind to, e.g. `127.0.0.1` or `0.0.0.0`
    #[serde(default = "default_address")]
    pub address: String,

    /// Server name sent in the `Server` header
    #[serde(default = "default_name")]
    pub name: String,

    /// Domain attribute of the session cookie, host-only when unset
    #[serde(default)]
    pub cookie_domain: Option<String>,

    /// `Secure` attribute of the session cookie
    ///
    /// Only disable this for plain HTTP development setups.
    #[serde(default = "default_true")]
    pub secure_cookie: bool,

    /// Origins allowed to call the API with credentials
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// PEM certificate chain path, enables TLS together with `key`
    #[serde(default)]
    pub cert: Option<String>,

    /// PEM private key path
    #[serde(default)]
    pub key: Option<String>,

    /// Rocket log level: `off`, `critical`, `normal` or `debug`
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    8080
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_name() -> String {
    format!("RustAccountAuth/{}", env!("CARGO_PKG_VERSION"))
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "normal".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            address: default_address(),
            name: default_name(),
            cookie_domain: None,
            secure_cookie: default_true(),
            allowed_origins: Vec::new(),
            cert: None,
            key: None,
            log_level: default_log_level(),
        }
    }
}

/// Session token settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Base64 encoded 32-byte Ed25519 seed
    ///
    /// Changing it invalidates every issued session. When absent from the
    /// file, a seed is generated and written back by [`Config::from_file`].
    #[serde(default = "generate_seed")]
    pub seed: String,

    #[serde(default = "default_issuer")]
    pub issuer: String,

    #[serde(default = "default_audience")]
    pub audience: String,

    #[serde(default = "default_lifetime_hours")]
    pub lifetime_hours: u32,

    /// Remaining lifetime under which tokens are silently reissued
    #[serde(default = "default_refresh_window_hours")]
    pub refresh_window_hours: u32,

    /// Tolerated clock skew
    #[serde(default = "default_leeway_seconds")]
    pub leeway_seconds: u32,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("seed", &"[HIDDEN]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("lifetime_hours", &self.lifetime_hours)
            .field("refresh_window_hours", &self.refresh_window_hours)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

fn default_issuer() -> String {
    DEFAULT_ISSUER.to_string()
}

fn default_audience() -> String {
    DEFAULT_AUDIENCE.to_string()
}

fn default_lifetime_hours() -> u32 {
    DEFAULT_TOKEN_LIFETIME_HOURS as u32
}

fn default_refresh_window_hours() -> u32 {
    DEFAULT_REFRESH_WINDOW_HOURS as u32
}

fn default_leeway_seconds() -> u32 {
    DEFAULT_LEEWAY_SECONDS as u32
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: generate_seed(),
            issuer: default_issuer(),
            audience: default_audience(),
            lifetime_hours: default_lifetime_hours(),
            refresh_window_hours: default_refresh_window_hours(),
            leeway_seconds: default_leeway_seconds(),
        }
    }
}

impl SessionConfig {
    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
            lifetime: chrono::Duration::hours(i64::from(self.lifetime_hours)),
            refresh_window: chrono::Duration::hours(i64::from(self.refresh_window_hours)),
            leeway: chrono::Duration::seconds(i64::from(self.leeway_seconds)),
        }
    }
}

/// Revocation cache backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// In-process map, single server only
    Memory,
    Redis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_backend")]
    pub backend: CacheBackend,

    /// Required for the redis backend, e.g. `redis://127.0.0.1:6379/0`
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Upper bound of one cache operation
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// Lifetime of a pending OAuth state
    #[serde(default = "default_state_ttl_seconds")]
    pub state_ttl_seconds: u64,
}

fn default_backend() -> CacheBackend {
    CacheBackend::Memory
}

fn default_operation_timeout_ms() -> u64 {
    DEFAULT_OPERATION_TIMEOUT.as_millis() as u64
}

fn default_state_ttl_seconds() -> u64 {
    DEFAULT_STATE_TTL.as_secs()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            redis_url: None,
            operation_timeout_ms: default_operation_timeout_ms(),
            state_ttl_seconds: default_state_ttl_seconds(),
        }
    }
}

impl CacheConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.state_ttl_seconds)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountsConfig {
    /// Credits granted to new accounts
    #[serde(default)]
    pub initial_credits: i64,
}

/// Identity provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OauthConfig {
    /// Timeout of outbound calls to identity providers
    #[serde(default = "default_http_timeout_seconds")]
    pub http_timeout_seconds: u64,

    /// Google sign-in, disabled when absent
    #[serde(default)]
    pub google: Option<GoogleConfig>,
}

fn default_http_timeout_seconds() -> u64 {
    10
}

impl Default for OauthConfig {
    fn default() -> Self {
        Self {
            http_timeout_seconds: default_http_timeout_seconds(),
            google: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,

    pub client_secret: String,

    /// Callback URL registered in the Google console
    pub redirect_url: String,

    #[serde(default = "default_google_auth_url")]
    pub auth_url: String,

    #[serde(default = "default_google_token_url")]
    pub token_url: String,

    #[serde(default = "default_google_userinfo_url")]
    pub userinfo_url: String,
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[HIDDEN]")
            .field("redirect_url", &self.redirect_url)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .finish()
    }
}

fn default_google_auth_url() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_google_token_url() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

fn default_google_userinfo_url() -> String {
    GOOGLE_USERINFO_URL.to_string()
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_url: String::new(),
            auth_url: default_google_auth_url(),
            token_url: default_google_token_url(),
            userinfo_url: default_google_userinfo_url(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            session: SessionConfig::default(),
            cache: CacheConfig::default(),
            accounts: AccountsConfig::default(),
            oauth: OauthConfig::default(),
        }
    }
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let sample_path = path.as_ref().with_extension("sample.yaml");

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory for sample config at {:?}", parent)
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with default values, including a freshly
    /// generated session seed. A file without `session.seed` gets one generated
    /// and saved the same way. An invalid file is left untouched and a
    /// `<name>.sample.yaml` is written next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;
        let json_value = serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?;

        let validator = Self::schema_validator()?;
        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = config.validate_specific_rules() {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        // A seed generated at load time must be persisted, otherwise every
        // restart would sign with a new key.
        if json_value.pointer("/session/seed").is_none() {
            warn!(
                "No session seed in {}, storing a newly generated one",
                path.display()
            );
            config.save_to_file(path)?;
        }

        Ok(config)
    }

    fn schema_validator() -> Result<jsonschema::Validator> {
        let schema_str = include_str!("../resources/config.schema.json");
        let schema: serde_json::Value =
            serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;
        Ok(validator)
    }

    /// Run schema and rule validation on an in-memory configuration.
    pub fn validate(&self) -> Result<()> {
        let json_value =
            serde_json::to_value(self).context("Failed to serialize configuration")?;
        if let Err(error) = Self::schema_validator()?.validate(&json_value) {
            anyhow::bail!("Configuration validation failed: {}", error);
        }
        self.validate_specific_rules()
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// # Parameters
    ///
    /// * `port` - TCP port for the server
    /// * `address` - Network address to bind to
    /// * `seed` - Base64 session seed
    ///
    /// # Example
    ///
    /// ```rust
    /// use rust_account_auth::config::Config;
    /// let mut config = Config::default();
    /// config.apply_args(Some(9000), Some("0.0.0.0".to_string()), None);
    /// assert_eq!(config.server.port, 9000);
    /// ```
    pub fn apply_args(&mut self, port: Option<u16>, address: Option<String>, seed: Option<String>) {
        if let Some(port) = port {
            debug!("Overriding port from command line: {}", port);
            self.server.port = port;
        }

        if let Some(address) = address {
            debug!("Overriding address from command line: {}", address);
            self.server.address = address;
        }

        if let Some(seed) = seed {
            debug!("Overriding session seed from command line");
            self.session.seed = seed;
        }
    }

    /// Validates rules the JSON schema cannot express.
    ///
    /// # Validation Rules
    ///
    /// - **Session seed**: base64 encoding of exactly 32 bytes
    /// - **Token timings**: refresh window strictly shorter than the lifetime
    /// - **TLS**: certificate and key are given together
    /// - **Cache**: the redis backend has a URL
    /// - **Port Range**: 1-65534
    fn validate_specific_rules(&self) -> Result<()> {
        debug!("Performing additional validation checks");

        let seed = base64::engine::general_purpose::STANDARD
            .decode(self.session.seed.trim())
            .context("Session seed is not valid base64")?;
        if seed.len() != SEED_LENGTH {
            anyhow::bail!(
                "Session seed must decode to {} bytes, got {}",
                SEED_LENGTH,
                seed.len()
            );
        }

        if self.session.refresh_window_hours >= self.session.lifetime_hours {
            anyhow::bail!(
                "Refresh window ({}h) must be shorter than the token lifetime ({}h)",
                self.session.refresh_window_hours,
                self.session.lifetime_hours
            );
        }

        match (&self.server.cert, &self.server.key) {
            (Some(_), None) => anyhow::bail!("SSL certificate provided without a key"),
            (None, Some(_)) => anyhow::bail!("SSL key provided without a certificate"),
            _ => {}
        }

        if self.cache.backend == CacheBackend::Redis && self.cache.redis_url.is_none() {
            anyhow::bail!("The redis cache backend requires cache.redis_url");
        }

        if self.server.port < 1 || self.server.port > 65534 {
            anyhow::bail!("Invalid port number: {}", self.server.port);
        }

        if !is_valid_ip_address(&self.server.address) {
            debug!(
                "Potentially invalid address format: {}",
                self.server.address
            );
        }

        Ok(())
    }
}

/// Check if a string is a valid IP address
fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./rust_account_auth --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema_str = include_str!("../resources/config.schema.json");
    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;
    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;
    println!("{}", formatted_schema);
    Ok(())
}
