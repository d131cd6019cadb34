use std::sync::Arc;

use crate::{
    Error,
    error::{AuthError, utilities::RequiredFieldExt},
    store::TokenStore,
};

/// Service that redeems magic link tokens
///
/// Every failed redemption reports the same [`AuthError::InvalidOrExpiredToken`]
/// so a caller probing tokens learns nothing about which ones once existed.
pub struct CredentialVerifier<S: TokenStore> {
    store: Arc<S>,
}

impl<S: TokenStore> CredentialVerifier<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Redeem `token`, returning the identity it was bound to
    ///
    /// Succeeds at most once per token, however many callers race for it.
    pub async fn redeem(&self, token: &str) -> Result<String, Error> {
        let token = Some(token).require_field("token")?;

        match self.store.take_if_valid(token).await? {
            Some(identity) => {
                tracing::info!(identity = %identity, "Redeemed magic link token");
                Ok(identity)
            }
            None => {
                tracing::debug!("Rejected unknown, expired or used magic link token");
                Err(AuthError::InvalidOrExpiredToken.into())
            }
        }
    }
}
