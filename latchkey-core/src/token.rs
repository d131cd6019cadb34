//! Magic link tokens
//!
//! A magic link token binds an opaque identity to a random, single-use secret.
//!
//! | Field        | Type       | Description                                   |
//! | ------------ | ---------- | --------------------------------------------- |
//! | `token`      | `String`   | The random secret. Stores key it by digest.   |
//! | `identity`   | `String`   | The subject the token authenticates.          |
//! | `issued_at`  | `DateTime` | When the token was minted.                    |
//! | `expires_at` | `DateTime` | `issued_at` plus the magic link TTL.          |
//!
//! Tokens are immutable. They are destroyed either by their first successful
//! redemption or by expiry.

use chrono::{DateTime, Duration, Utc};

use crate::{Error, crypto::generate_secure_token, error::ValidationError};

/// Default lifetime of a magic link token, in seconds (30 minutes).
pub const DEFAULT_MAGIC_LINK_TTL_SECS: i64 = 30 * 60;

/// Longest TTL configuration accepts for any token, in seconds (100 years).
pub const MAX_TTL_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// `start + ttl`, or an error when the result does not fit in a `DateTime`.
pub fn expiry_after(
    start: DateTime<Utc>,
    ttl: Duration,
) -> Result<DateTime<Utc>, ValidationError> {
    start.checked_add_signed(ttl).ok_or_else(|| {
        ValidationError::InvalidField(format!("TTL of {}s is out of range", ttl.num_seconds()))
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicLinkToken {
    pub token: String,
    pub identity: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl MagicLinkToken {
    /// Mint a fresh token for `identity` that expires after `ttl`.
    pub fn generate(identity: impl Into<String>, ttl: Duration) -> Result<Self, Error> {
        let issued_at = Utc::now();
        let expires_at = expiry_after(issued_at, ttl)?;
        Ok(Self {
            token: generate_secure_token()?,
            identity: identity.into(),
            issued_at,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_sets_expiry_from_ttl() {
        let token =
            MagicLinkToken::generate("user-1", Duration::seconds(DEFAULT_MAGIC_LINK_TTL_SECS))
                .unwrap();

        assert_eq!(token.identity, "user-1");
        assert_eq!(token.expires_at - token.issued_at, Duration::minutes(30));
        assert!(token.expires_at > Utc::now());
    }

    #[test]
    fn test_unrepresentable_ttl_is_rejected() {
        let result = MagicLinkToken::generate("user-1", Duration::seconds(9_000_000_000_000_000));

        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::InvalidField(_)))
        ));
    }

    #[test]
    fn test_max_ttl_is_representable() {
        assert!(expiry_after(Utc::now(), Duration::seconds(MAX_TTL_SECS)).is_ok());
    }
}
