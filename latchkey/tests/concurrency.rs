use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use latchkey::{
    Error, InMemoryTokenStore, Latchkey, LatchkeyBuilder, LatchkeyConfig, StorageError,
    TokenStore,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_redemptions_have_one_winner() {
    init_tracing();
    let latchkey = Arc::new(
        LatchkeyBuilder::new()
            .with_memory_store()
            .build()
            .unwrap(),
    );

    for round in 0..25 {
        let link = latchkey
            .issue_magic_link(&format!("usr_{round}"), None)
            .await
            .unwrap();

        let handles: Vec<_> = (0..2)
            .map(|i| {
                let latchkey = latchkey.clone();
                let token = link.token.token.clone();
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        latchkey.redeem_for_session(&token).await
                    } else {
                        latchkey.redeem_for_bearer(&token).await.map(|r| r.identity)
                    }
                })
            })
            .collect();

        let mut successes = 0;
        let mut failures = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(identity) => {
                    assert_eq!(identity, format!("usr_{round}"));
                    successes += 1;
                }
                Err(e) => {
                    assert!(e.is_invalid_or_expired());
                    failures += 1;
                }
            }
        }
        assert_eq!((successes, failures), (1, 1), "round {round}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_many_racers_many_tokens() {
    init_tracing();
    let latchkey = Arc::new(
        LatchkeyBuilder::new()
            .with_memory_store()
            .build()
            .unwrap(),
    );

    let mut tokens = Vec::new();
    for i in 0..100 {
        let link = latchkey
            .issue_magic_link(&format!("usr_{i}"), None)
            .await
            .unwrap();
        tokens.push(link.token.token);
    }

    let mut handles = Vec::new();
    for _ in 0..8 {
        let latchkey = latchkey.clone();
        let tokens = tokens.clone();
        handles.push(tokio::spawn(async move {
            let mut won = Vec::new();
            for token in tokens {
                if let Ok(identity) = latchkey.redeem_for_session(&token).await {
                    won.push(identity);
                }
            }
            won
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }
    all.sort();
    all.dedup();
    assert_eq!(all.len(), 100);
    assert!(latchkey.store().is_empty());
}

/// A store whose backend is unreachable
struct UnreachableStore;

#[async_trait]
impl TokenStore for UnreachableStore {
    async fn put_until(
        &self,
        _token: &str,
        _identity: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        Err(StorageError::Backend("connection refused".to_string()).into())
    }

    async fn take_if_valid(&self, _token: &str) -> Result<Option<String>, Error> {
        Err(StorageError::Backend("connection refused".to_string()).into())
    }

    async fn purge_expired(&self) -> Result<usize, Error> {
        Err(StorageError::Backend("connection refused".to_string()).into())
    }
}

#[tokio::test]
async fn test_backend_failures_surface_as_storage_errors() {
    init_tracing();
    let latchkey = LatchkeyBuilder::new()
        .with_store(Arc::new(UnreachableStore))
        .build()
        .unwrap();

    assert!(
        latchkey
            .issue_magic_link("usr_1", None)
            .await
            .unwrap_err()
            .is_storage_error()
    );
    assert!(
        latchkey
            .redeem_for_session("some-token")
            .await
            .unwrap_err()
            .is_storage_error()
    );
}

#[tokio::test]
async fn test_shared_trait_object_store() {
    init_tracing();
    let shared: Arc<dyn TokenStore> = Arc::new(InMemoryTokenStore::new());

    // Two instances over one store, e.g. an issuing and a verifying service
    let issuing = Latchkey::new(Arc::new(shared.clone()), LatchkeyConfig::default());
    let verifying = Latchkey::new(Arc::new(shared), LatchkeyConfig::default());

    let link = issuing.issue_magic_link("usr_1", None).await.unwrap();
    assert_eq!(
        verifying
            .redeem_for_session(&link.token.token)
            .await
            .unwrap(),
        "usr_1"
    );
    assert!(
        issuing
            .redeem_for_session(&link.token.token)
            .await
            .unwrap_err()
            .is_invalid_or_expired()
    );
}
