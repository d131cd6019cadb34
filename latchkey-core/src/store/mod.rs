//! Token store abstraction
//!
//! The token store is the only shared mutable state in latchkey. It holds
//! token -> identity bindings with a time-to-live and hands each binding out
//! at most once.
//!
//! Stores are injected into the issuer and verifier; there is no global
//! instance.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::{Error, token::expiry_after};

pub use memory::InMemoryTokenStore;

/// Expiring, single-use key-value store for magic link tokens
///
/// # Atomicity
///
/// [`TokenStore::take_if_valid`] must check presence, check expiry and remove
/// the entry as one atomic step (a lock-protected critical section, `GETDEL`,
/// `DELETE ... RETURNING`). Two concurrent calls for the same token must
/// produce exactly one `Some`.
#[async_trait]
pub trait TokenStore: Send + Sync + 'static {
    /// Bind `token` to `identity` until `expires_at`. Rebinding an existing
    /// token replaces the previous binding.
    async fn put_until(
        &self,
        token: &str,
        identity: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Error>;

    /// Bind `token` to `identity` for `ttl` from now.
    ///
    /// A TTL whose deadline cannot be represented is a validation error and
    /// stores nothing.
    async fn put(&self, token: &str, identity: &str, ttl: Duration) -> Result<(), Error> {
        let expires_at = expiry_after(Utc::now(), ttl)?;
        self.put_until(token, identity, expires_at).await
    }

    /// Atomically redeem `token`.
    ///
    /// Returns the bound identity and removes the binding when it is present
    /// and unexpired. Returns `None` for unknown, expired or already redeemed
    /// tokens; expired bindings are cleared along the way.
    async fn take_if_valid(&self, token: &str) -> Result<Option<String>, Error>;

    /// Remove every expired binding, returning how many were dropped.
    async fn purge_expired(&self) -> Result<usize, Error>;
}

#[async_trait]
impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    async fn put_until(
        &self,
        token: &str,
        identity: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        (**self).put_until(token, identity, expires_at).await
    }

    async fn put(&self, token: &str, identity: &str, ttl: Duration) -> Result<(), Error> {
        (**self).put(token, identity, ttl).await
    }

    async fn take_if_valid(&self, token: &str) -> Result<Option<String>, Error> {
        (**self).take_if_valid(token).await
    }

    async fn purge_expired(&self) -> Result<usize, Error> {
        (**self).purge_expired().await
    }
}
