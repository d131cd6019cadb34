//! In-memory token store
//!
//! Bindings live in a [`DashMap`] keyed by the SHA256 digest of the token.
//! Expiry is checked lazily on redemption and eagerly by
//! [`TokenStore::purge_expired`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::{Error, crypto::hash_token};

use super::TokenStore;

#[derive(Debug, Clone)]
struct Binding {
    identity: String,
    expires_at: DateTime<Utc>,
}

impl Binding {
    fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Process-local token store
///
/// Suitable for a single process; bindings do not survive a restart.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    bindings: DashMap<String, Binding>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bindings currently held, expired or not.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn put_until(
        &self,
        token: &str,
        identity: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        let binding = Binding {
            identity: identity.to_string(),
            expires_at,
        };
        if self.bindings.insert(hash_token(token), binding).is_some() {
            tracing::warn!("Replaced an existing magic link binding");
        }
        Ok(())
    }

    async fn take_if_valid(&self, token: &str) -> Result<Option<String>, Error> {
        let key = hash_token(token);
        let now = Utc::now();

        // remove_if holds the shard write lock across the predicate and the
        // removal, so only one caller can win a given binding.
        if let Some((_, binding)) = self.bindings.remove_if(&key, |_, b| b.is_live_at(now)) {
            return Ok(Some(binding.identity));
        }

        if self
            .bindings
            .remove_if(&key, |_, b| !b.is_live_at(now))
            .is_some()
        {
            tracing::debug!("Dropped expired magic link binding on redemption");
        }
        Ok(None)
    }

    async fn purge_expired(&self) -> Result<usize, Error> {
        let now = Utc::now();
        let mut removed = 0;
        self.bindings.retain(|_, binding| {
            let live = binding.is_live_at(now);
            if !live {
                removed += 1;
            }
            live
        });
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::error::ValidationError;

    #[tokio::test]
    async fn test_take_returns_identity_once() {
        let store = InMemoryTokenStore::new();
        store
            .put("token-a", "user-1", Duration::minutes(30))
            .await
            .unwrap();

        assert_eq!(
            store.take_if_valid("token-a").await.unwrap(),
            Some("user-1".to_string())
        );
        assert_eq!(store.take_if_valid("token-a").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_token_is_absent() {
        let store = InMemoryTokenStore::new();
        assert_eq!(store.take_if_valid("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_binding_is_absent_and_cleared() {
        let store = InMemoryTokenStore::new();
        store
            .put("token-a", "user-1", Duration::seconds(-1))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);

        assert_eq!(store.take_if_valid("token-a").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_put_rejects_unrepresentable_ttl() {
        let store = InMemoryTokenStore::new();
        let result = store
            .put("token-a", "user-1", Duration::seconds(9_000_000_000_000_000))
            .await;

        assert!(matches!(
            result,
            Err(Error::Validation(ValidationError::InvalidField(_)))
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_put_until_keeps_exact_deadline() {
        let store = InMemoryTokenStore::new();
        let expires_at = Utc::now() + Duration::minutes(5);
        store.put_until("token-a", "user-1", expires_at).await.unwrap();

        assert_eq!(
            store.bindings.get(&hash_token("token-a")).unwrap().expires_at,
            expires_at
        );
    }

    #[tokio::test]
    async fn test_put_last_write_wins() {
        let store = InMemoryTokenStore::new();
        store
            .put("token-a", "user-1", Duration::minutes(30))
            .await
            .unwrap();
        store
            .put("token-a", "user-2", Duration::minutes(30))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.take_if_valid("token-a").await.unwrap(),
            Some("user-2".to_string())
        );
    }

    #[tokio::test]
    async fn test_plaintext_token_is_not_a_key() {
        let store = InMemoryTokenStore::new();
        store
            .put("token-a", "user-1", Duration::minutes(30))
            .await
            .unwrap();

        assert!(!store.bindings.contains_key("token-a"));
        assert!(store.bindings.contains_key(&hash_token("token-a")));
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_live_bindings() {
        let store = InMemoryTokenStore::new();
        store
            .put("live", "user-1", Duration::minutes(30))
            .await
            .unwrap();
        store
            .put("stale-1", "user-2", Duration::seconds(-5))
            .await
            .unwrap();
        store
            .put("stale-2", "user-3", Duration::seconds(-5))
            .await
            .unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.take_if_valid("live").await.unwrap(),
            Some("user-1".to_string())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_takes_have_a_single_winner() {
        for round in 0..50 {
            let store = Arc::new(InMemoryTokenStore::new());
            let token = format!("token-{round}");
            store
                .put(&token, "user-1", Duration::minutes(30))
                .await
                .unwrap();

            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let store = store.clone();
                    let token = token.clone();
                    tokio::spawn(async move { store.take_if_valid(&token).await.unwrap() })
                })
                .collect();

            let mut winners = 0;
            for handle in handles {
                if handle.await.unwrap().is_some() {
                    winners += 1;
                }
            }
            assert_eq!(winners, 1, "round {round}");
        }
    }
}
