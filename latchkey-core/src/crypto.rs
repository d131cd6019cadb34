//! Cryptographic utilities for magic link tokens
//!
//! Tokens carry 256 bits of OS randomness and are encoded as URL-safe base64
//! so they can be dropped into a query string untouched.
//!
//! Stores index tokens by their SHA256 digest rather than the plaintext value,
//! so a dump of the store does not hand out live credentials. A plain digest
//! is enough here: with 256 bits of entropy there is nothing to brute force,
//! so a slow password hash would only add latency to every redemption.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

/// Number of random bytes behind every token.
pub const TOKEN_BYTES: usize = 32;

/// Length of an encoded token: 32 bytes of base64 without padding.
pub const TOKEN_LENGTH: usize = 43;

/// Generate a cryptographically secure random token.
///
/// Returns a 43 character URL-safe base64 string, or an error when the OS
/// entropy source cannot be read.
pub fn generate_secure_token() -> Result<String, CryptoError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::Entropy(e.to_string()))?;
    Ok(BASE64_URL_SAFE_NO_PAD.encode(bytes))
}

/// Hash a token for storage using SHA256.
///
/// The digest is deterministic so it can be used as a lookup key.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_generated_token_shape() {
        let token = generate_secure_token().unwrap();

        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_eq!(BASE64_URL_SAFE_NO_PAD.decode(&token).unwrap().len(), TOKEN_BYTES);
    }

    #[test]
    fn test_generated_tokens_are_distinct() {
        let tokens: HashSet<String> = (0..1_000)
            .map(|_| generate_secure_token().unwrap())
            .collect();
        assert_eq!(tokens.len(), 1_000);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let hash1 = hash_token("test_token");
        let hash2 = hash_token("test_token");

        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_produces_hex_string() {
        let hash = hash_token("test_token");

        // SHA256 produces 32 bytes = 64 hex chars
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_different_tokens_produce_different_hashes() {
        assert_ne!(hash_token("token_a"), hash_token("token_b"));
    }
}
