//! Builder pattern for constructing Latchkey instances
//!
//! The builder uses a type-state pattern so a [`Latchkey`] cannot be built
//! before a token store has been chosen.
//!
//! # Example
//!
//! ```rust
//! use chrono::Duration;
//! use latchkey::{JwtConfig, LatchkeyBuilder};
//!
//! let latchkey = LatchkeyBuilder::new()
//!     .with_memory_store()
//!     .with_base_url("https://shop.example.com")
//!     .with_magic_link_ttl(Duration::minutes(15))
//!     .with_jwt_config(JwtConfig::new_hs256(b"a-long-random-production-secret".to_vec()))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

use chrono::Duration;
use latchkey_core::{InMemoryTokenStore, JwtConfig, TokenStore, token::MAX_TTL_SECS};

use crate::{Latchkey, LatchkeyConfig};

/// Errors that can occur when building a Latchkey instance.
#[derive(Debug, thiserror::Error)]
pub enum LatchkeyBuilderError {
    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Marker type indicating no token store has been configured yet.
pub struct NoStore;

/// Marker type indicating a token store has been configured.
pub struct WithStore<S: TokenStore> {
    store: Arc<S>,
}

/// A type-safe builder for constructing [`Latchkey`] instances.
///
/// # Type States
///
/// - [`NoStore`]: Initial state, a token store must be configured
/// - [`WithStore<S>`]: Store configured, ready to build
pub struct LatchkeyBuilder<Store> {
    store: Store,
    config: LatchkeyConfig,
}

impl Default for LatchkeyBuilder<NoStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl LatchkeyBuilder<NoStore> {
    /// Create a new builder with [`LatchkeyConfig::default`].
    pub fn new() -> Self {
        Self {
            store: NoStore,
            config: LatchkeyConfig::default(),
        }
    }

    /// Use an externally constructed token store.
    pub fn with_store<S: TokenStore>(self, store: Arc<S>) -> LatchkeyBuilder<WithStore<S>> {
        LatchkeyBuilder {
            store: WithStore { store },
            config: self.config,
        }
    }

    /// Use a process-local [`InMemoryTokenStore`].
    pub fn with_memory_store(self) -> LatchkeyBuilder<WithStore<InMemoryTokenStore>> {
        self.with_store(Arc::new(InMemoryTokenStore::new()))
    }
}

impl<Store> LatchkeyBuilder<Store> {
    /// Replace the whole configuration, e.g. with [`LatchkeyConfig::from_env`].
    pub fn with_config(mut self, config: LatchkeyConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_magic_link_ttl(mut self, ttl: Duration) -> Self {
        self.config.magic_link_ttl = ttl;
        self
    }

    pub fn with_bearer_ttl(mut self, ttl: Duration) -> Self {
        self.config.bearer_ttl = ttl;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn with_verify_path(mut self, path: impl Into<String>) -> Self {
        self.config.verify_path = path.into();
        self
    }

    pub fn with_jwt_config(mut self, jwt: JwtConfig) -> Self {
        self.config.jwt = jwt;
        self
    }

    pub fn without_bearer_tokens(mut self) -> Self {
        self.config.bearer_tokens = false;
        self
    }
}

impl<S: TokenStore> LatchkeyBuilder<WithStore<S>> {
    /// Validate the configuration and build the instance.
    pub fn build(self) -> Result<Latchkey<S>, LatchkeyBuilderError> {
        validate(&self.config)?;
        Ok(Latchkey::new(self.store.store, self.config))
    }
}

fn validate(config: &LatchkeyConfig) -> Result<(), LatchkeyBuilderError> {
    let invalid = |msg: &str| Err(LatchkeyBuilderError::InvalidConfiguration(msg.to_string()));

    let max_ttl = Duration::seconds(MAX_TTL_SECS);

    if config.magic_link_ttl <= Duration::zero() {
        return invalid("magic link TTL must be positive");
    }
    if config.magic_link_ttl > max_ttl {
        return invalid("magic link TTL exceeds the maximum of 100 years");
    }
    if config.bearer_tokens && config.bearer_ttl <= Duration::zero() {
        return invalid("bearer token TTL must be positive");
    }
    if config.bearer_tokens && config.bearer_ttl > max_ttl {
        return invalid("bearer token TTL exceeds the maximum of 100 years");
    }
    if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
        return invalid("base URL must be an absolute http(s) URL");
    }
    if config.verify_path.trim().is_empty() {
        return invalid("verify path must not be empty");
    }
    if config.bearer_tokens && config.jwt.secret_key.is_empty() {
        return invalid("JWT secret must not be empty");
    }
    Ok(())
}
