//! Bearer token signing
//!
//! A verified identity can be exchanged for a signed JWT that external
//! services check on their own, without calling back into latchkey. Bearer
//! tokens are stateless: nothing is stored server-side and validity comes
//! entirely from the signature and the embedded expiry.

use std::str::FromStr;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    error::{CryptoError, ValidationError},
};

/// Header name callers present the bearer token in.
pub const BEARER_TOKEN_TYPE: &str = "X-Authorization";

/// Default lifetime of a bearer token, in seconds (7 days).
pub const DEFAULT_BEARER_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Fallback signing secret used when none is configured.
///
/// DO NOT USE IN PRODUCTION. Anyone who reads this source can mint tokens.
const INSECURE_DEFAULT_SECRET: &[u8] = b"latchkey_default_secret_key_for_development_only";

/// JWT claims carried by a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerClaims {
    /// Subject - the verified identity, usually an email address
    pub sub: String,
    /// Human readable name of the subject
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Issued at in seconds (as UTC timestamp)
    pub iat: i64,
    /// Expiration time in seconds (as UTC timestamp)
    pub exp: i64,
    /// Issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl BearerClaims {
    pub fn new(
        subject: impl Into<String>,
        display_name: Option<String>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: subject.into(),
            name: display_name,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: None,
        }
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.iat, 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Configuration for bearer token signing
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Signing algorithm; must be an HMAC algorithm to sign successfully
    pub algorithm: Algorithm,
    /// Shared secret for both signing and verifying
    pub secret_key: Vec<u8>,
    /// Issuer claim
    pub issuer: Option<String>,
}

impl JwtConfig {
    /// Create a new JWT configuration with HS256 algorithm
    pub fn new_hs256(secret_key: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            secret_key: secret_key.into(),
            issuer: None,
        }
    }

    /// HS256 with the built-in development secret.
    pub fn insecure_default() -> Self {
        Self::new_hs256(INSECURE_DEFAULT_SECRET)
    }

    /// Build a configuration from an optional secret and an optional
    /// algorithm name such as `"HS512"`.
    ///
    /// A missing secret falls back to [`JwtConfig::insecure_default`]'s secret;
    /// a missing algorithm falls back to HS256.
    pub fn from_parts(secret: Option<String>, algorithm: Option<&str>) -> Result<Self, Error> {
        let algorithm = match algorithm.map(str::trim).filter(|a| !a.is_empty()) {
            Some(name) => Algorithm::from_str(&name.to_ascii_uppercase()).map_err(|e| {
                ValidationError::InvalidField(format!("Unknown JWT algorithm {name}: {e}"))
            })?,
            None => Algorithm::HS256,
        };

        let secret_key = match secret.filter(|s| !s.is_empty()) {
            Some(secret) => secret.into_bytes(),
            None => INSECURE_DEFAULT_SECRET.to_vec(),
        };

        Ok(Self {
            algorithm,
            secret_key,
            issuer: None,
        })
    }

    /// Set the signing algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the issuer claim
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Whether this configuration signs with the publicly known default secret.
    pub fn is_insecure_default(&self) -> bool {
        self.secret_key == INSECURE_DEFAULT_SECRET
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::insecure_default()
    }
}

/// A freshly signed bearer token
#[derive(Debug, Clone)]
pub struct SignedBearer {
    pub token: String,
    /// How the caller should present `token`; always [`BEARER_TOKEN_TYPE`].
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies bearer tokens
///
/// Keys are derived once at construction. The signer performs no identity
/// checks; callers pass it identities that were already verified.
pub struct BearerTokenSigner {
    config: JwtConfig,
    ttl: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl BearerTokenSigner {
    pub fn new(config: JwtConfig, ttl: Duration) -> Self {
        if config.is_insecure_default() {
            tracing::warn!(
                "Bearer tokens are signed with the built-in development secret; configure a real secret before deploying"
            );
        }
        let encoding_key = EncodingKey::from_secret(&config.secret_key);
        let decoding_key = DecodingKey::from_secret(&config.secret_key);
        Self {
            config,
            ttl,
            encoding_key,
            decoding_key,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Sign a bearer token for an already verified subject
    pub fn sign(&self, subject: &str, display_name: Option<String>) -> Result<SignedBearer, Error> {
        let issued_at = Utc::now().trunc_subsecs(0);
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| {
                CryptoError::JwtSigning(format!(
                    "Expiry out of range for a TTL of {}s",
                    self.ttl.num_seconds()
                ))
            })?
            .trunc_subsecs(0);

        let mut claims = BearerClaims::new(subject, display_name, issued_at, expires_at);
        claims.iss = self.config.issuer.clone();

        let header = Header::new(self.config.algorithm);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| CryptoError::JwtSigning(format!("Failed to encode JWT: {e}")))?;

        Ok(SignedBearer {
            token,
            token_type: BEARER_TOKEN_TYPE,
            expires_at,
        })
    }

    /// Verify a bearer token and return its claims
    pub fn verify(&self, token: &str) -> Result<BearerClaims, Error> {
        let token_data =
            decode::<BearerClaims>(token, &self.decoding_key, &self.config.validation())
                .map_err(|e| {
                    CryptoError::JwtVerification(format!("JWT validation failed: {e}"))
                })?;

        Ok(token_data.claims)
    }
}
