//! Process-wide configuration
//!
//! Everything here has a default. The only default that is unsafe to ship is
//! the bearer signing secret; see [`JwtConfig::insecure_default`].

use chrono::Duration;
use latchkey_core::{
    Error, JwtConfig,
    bearer::DEFAULT_BEARER_TTL_SECS,
    error::ValidationError,
    token::{DEFAULT_MAGIC_LINK_TTL_SECS, MAX_TTL_SECS},
};

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_VERIFY_PATH: &str = "/auth/magic-link/verify";

/// Configuration for a [`crate::Latchkey`] instance.
///
/// # Example
///
/// ```rust
/// use chrono::Duration;
/// use latchkey::LatchkeyConfig;
///
/// let config = LatchkeyConfig::default()
///     .with_base_url("https://shop.example.com")
///     .with_magic_link_ttl(Duration::minutes(10));
/// ```
#[derive(Debug, Clone)]
pub struct LatchkeyConfig {
    /// How long a magic link stays redeemable
    pub magic_link_ttl: Duration,
    /// How long a bearer token stays valid
    pub bearer_ttl: Duration,
    /// Scheme and host used for links without a redirect target
    pub base_url: String,
    /// Path of the verification handler on `base_url`
    pub verify_path: String,
    /// Bearer token signing settings
    pub jwt: JwtConfig,
    /// Whether redemptions may be exchanged for bearer tokens
    pub bearer_tokens: bool,
}

impl Default for LatchkeyConfig {
    fn default() -> Self {
        Self {
            magic_link_ttl: Duration::seconds(DEFAULT_MAGIC_LINK_TTL_SECS),
            bearer_ttl: Duration::seconds(DEFAULT_BEARER_TTL_SECS),
            base_url: DEFAULT_BASE_URL.to_string(),
            verify_path: DEFAULT_VERIFY_PATH.to_string(),
            jwt: JwtConfig::insecure_default(),
            bearer_tokens: true,
        }
    }
}

impl LatchkeyConfig {
    /// Read configuration from `LATCHKEY_*` environment variables.
    ///
    /// | Variable                        | Default                     |
    /// | ------------------------------- | --------------------------- |
    /// | `LATCHKEY_JWT_SECRET`           | insecure development secret |
    /// | `LATCHKEY_JWT_ALGORITHM`        | `HS256`                     |
    /// | `LATCHKEY_JWT_ISSUER`           | none                        |
    /// | `LATCHKEY_MAGIC_LINK_TTL_SECS`  | `1800`                      |
    /// | `LATCHKEY_BEARER_TTL_SECS`      | `604800`                    |
    /// | `LATCHKEY_BASE_URL`             | `http://localhost:8000`     |
    /// | `LATCHKEY_VERIFY_PATH`          | `/auth/magic-link/verify`   |
    /// | `LATCHKEY_BEARER_TOKENS`        | `true`                      |
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LatchkeyConfig::from_env`] with an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let defaults = Self::default();

        let mut jwt = JwtConfig::from_parts(
            lookup("LATCHKEY_JWT_SECRET"),
            lookup("LATCHKEY_JWT_ALGORITHM").as_deref(),
        )?;
        if let Some(issuer) = lookup("LATCHKEY_JWT_ISSUER").filter(|i| !i.is_empty()) {
            jwt = jwt.with_issuer(issuer);
        }

        let magic_link_ttl = match lookup("LATCHKEY_MAGIC_LINK_TTL_SECS") {
            Some(raw) => parse_seconds("LATCHKEY_MAGIC_LINK_TTL_SECS", &raw)?,
            None => defaults.magic_link_ttl,
        };
        let bearer_ttl = match lookup("LATCHKEY_BEARER_TTL_SECS") {
            Some(raw) => parse_seconds("LATCHKEY_BEARER_TTL_SECS", &raw)?,
            None => defaults.bearer_ttl,
        };

        let bearer_tokens = match lookup("LATCHKEY_BEARER_TOKENS") {
            Some(raw) => !matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "false" | "0" | "no" | "off"
            ),
            None => defaults.bearer_tokens,
        };

        Ok(Self {
            magic_link_ttl,
            bearer_ttl,
            base_url: lookup("LATCHKEY_BASE_URL").unwrap_or(defaults.base_url),
            verify_path: lookup("LATCHKEY_VERIFY_PATH").unwrap_or(defaults.verify_path),
            jwt,
            bearer_tokens,
        })
    }

    pub fn with_magic_link_ttl(mut self, ttl: Duration) -> Self {
        self.magic_link_ttl = ttl;
        self
    }

    pub fn with_bearer_ttl(mut self, ttl: Duration) -> Self {
        self.bearer_ttl = ttl;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_verify_path(mut self, path: impl Into<String>) -> Self {
        self.verify_path = path.into();
        self
    }

    pub fn with_jwt(mut self, jwt: JwtConfig) -> Self {
        self.jwt = jwt;
        self
    }

    /// Disable bearer token issuance; redemptions then only yield identities.
    pub fn without_bearer_tokens(mut self) -> Self {
        self.bearer_tokens = false;
        self
    }
}

fn parse_seconds(key: &str, raw: &str) -> Result<Duration, Error> {
    let seconds = raw
        .trim()
        .parse::<i64>()
        .map_err(|e| ValidationError::InvalidField(format!("{key}: {e}")))?;
    if seconds > MAX_TTL_SECS {
        return Err(ValidationError::InvalidField(format!(
            "{key}: {seconds}s exceeds the maximum of {MAX_TTL_SECS}s"
        ))
        .into());
    }
    Duration::try_seconds(seconds)
        .ok_or_else(|| ValidationError::InvalidField(format!("{key}: out of range")).into())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use jsonwebtoken::Algorithm;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LatchkeyConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.magic_link_ttl, Duration::minutes(30));
        assert_eq!(config.bearer_ttl, Duration::days(7));
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.verify_path, "/auth/magic-link/verify");
        assert_eq!(config.jwt.algorithm, Algorithm::HS256);
        assert!(config.jwt.is_insecure_default());
        assert!(config.bearer_tokens);
    }

    #[test]
    fn test_overrides() {
        let config = LatchkeyConfig::from_lookup(lookup(&[
            ("LATCHKEY_JWT_SECRET", "prod-secret"),
            ("LATCHKEY_JWT_ALGORITHM", "HS384"),
            ("LATCHKEY_JWT_ISSUER", "shop"),
            ("LATCHKEY_MAGIC_LINK_TTL_SECS", "600"),
            ("LATCHKEY_BEARER_TTL_SECS", "3600"),
            ("LATCHKEY_BASE_URL", "https://shop.example.com"),
            ("LATCHKEY_BEARER_TOKENS", "off"),
        ]))
        .unwrap();

        assert_eq!(config.magic_link_ttl, Duration::minutes(10));
        assert_eq!(config.bearer_ttl, Duration::hours(1));
        assert_eq!(config.base_url, "https://shop.example.com");
        assert_eq!(config.jwt.algorithm, Algorithm::HS384);
        assert_eq!(config.jwt.issuer.as_deref(), Some("shop"));
        assert!(!config.jwt.is_insecure_default());
        assert!(!config.bearer_tokens);
    }

    #[test]
    fn test_bad_ttl_is_rejected() {
        let result =
            LatchkeyConfig::from_lookup(lookup(&[("LATCHKEY_MAGIC_LINK_TTL_SECS", "soon")]));

        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::InvalidField(_)))
        ));
    }

    #[test]
    fn test_unrepresentable_ttl_is_rejected() {
        let result = LatchkeyConfig::from_lookup(lookup(&[(
            "LATCHKEY_BEARER_TTL_SECS",
            "9000000000000000",
        )]));

        match result {
            Err(Error::Validation(ValidationError::InvalidField(msg))) => {
                assert!(msg.contains("LATCHKEY_BEARER_TTL_SECS"));
            }
            other => panic!("Expected invalid field, got {other:?}"),
        }
    }
}
