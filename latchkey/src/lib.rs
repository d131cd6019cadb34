//! # Latchkey
//!
//! Latchkey issues short-lived, single-use magic links that authenticate a
//! user without a password, and can exchange a redeemed link for a signed
//! bearer token that other services verify on their own.
//!
//! The host application stays in charge of user accounts, link delivery
//! (email, SMS) and HTTP sessions. Latchkey owns the token lifecycle:
//!
//! - minting an unguessable token bound to an identity,
//! - storing that binding for a limited time,
//! - redeeming it exactly once,
//! - signing a bearer token for the redeemed identity.
//!
//! ## Example
//!
//! ```rust,no_run
//! use latchkey::LatchkeyBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let latchkey = LatchkeyBuilder::new()
//!         .with_memory_store()
//!         .with_base_url("https://shop.example.com")
//!         .build()?;
//!
//!     let link = latchkey
//!         .issue_magic_link("usr_42", Some("https://app.example.com/callback"))
//!         .await?;
//!     println!("Send this to the user: {}", link.url);
//!
//!     let redemption = latchkey.redeem_for_bearer(&link.token.token).await?;
//!     println!("Signed in as {}", redemption.identity);
//!     Ok(())
//! }
//! ```
pub mod builder;
pub mod config;
pub mod login;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use latchkey_core::{CredentialVerifier, MagicLinkIssuer, VerifyEndpoint, error::CryptoError};
use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle};

pub use builder::{LatchkeyBuilder, LatchkeyBuilderError, NoStore, WithStore};
pub use config::LatchkeyConfig;
pub use login::{LinkRequest, MagicLinkLogin, RequestedLink, VerifiedLogin};

/// Re-export core types from latchkey_core
pub use jsonwebtoken::Algorithm as JwtAlgorithm;
pub use latchkey_core::{
    BEARER_TOKEN_TYPE, BearerClaims, BearerTokenSigner, BestEffort, ContactDirectory, Error,
    InMemoryDirectory, InMemoryTokenStore, IssuedLink, JwtConfig, MagicLinkToken, SignedBearer,
    TokenStore, UserDirectory, UserRecord,
    error::{AuthError, StorageError, ValidationError},
};

/// Result of redeeming a magic link for a bearer token
///
/// `identity` is always present. The bearer fields are `None` when bearer
/// tokens are disabled or signing failed; the redemption itself still counts.
#[derive(Debug, Clone, Serialize)]
pub struct BearerRedemption {
    pub identity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// The magic link coordinator
///
/// Holds the issuer, the verifier and, when enabled, the bearer token signer,
/// all sharing one injected token store. Cheap to share behind an `Arc`.
pub struct Latchkey<S: TokenStore> {
    store: Arc<S>,
    issuer: MagicLinkIssuer<S>,
    verifier: CredentialVerifier<S>,
    signer: Option<BearerTokenSigner>,
    config: LatchkeyConfig,
}

impl<S: TokenStore> Latchkey<S> {
    /// Create a new instance over `store`
    ///
    /// Whether bearer tokens can be issued is decided here, once, from
    /// `config.bearer_tokens`. Prefer [`LatchkeyBuilder`], which also
    /// validates the configuration.
    pub fn new(store: Arc<S>, config: LatchkeyConfig) -> Self {
        let endpoint = VerifyEndpoint::new(config.base_url.clone(), config.verify_path.clone());
        let issuer = MagicLinkIssuer::new(store.clone(), config.magic_link_ttl, endpoint);
        let verifier = CredentialVerifier::new(store.clone());
        let signer = config
            .bearer_tokens
            .then(|| BearerTokenSigner::new(config.jwt.clone(), config.bearer_ttl));

        Self {
            store,
            issuer,
            verifier,
            signer,
            config,
        }
    }

    pub fn config(&self) -> &LatchkeyConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The bearer token signer, if bearer tokens are enabled
    pub fn signer(&self) -> Option<&BearerTokenSigner> {
        self.signer.as_ref()
    }

    /// Issue a magic link for an identity the caller has already resolved
    ///
    /// # Arguments
    ///
    /// * `identity` - The subject the link authenticates, e.g. a user id
    /// * `redirect_to` - Optional external URL to carry the token instead of
    ///   the configured verification endpoint
    pub async fn issue_magic_link(
        &self,
        identity: &str,
        redirect_to: Option<&str>,
    ) -> Result<IssuedLink, Error> {
        self.issuer.issue(identity, redirect_to).await
    }

    /// Redeem a token for the login flow
    ///
    /// Returns the bound identity; the caller establishes its own session.
    pub async fn redeem_for_session(&self, token: &str) -> Result<String, Error> {
        self.verifier.redeem(token).await
    }

    /// Redeem a token and exchange the identity for a bearer token
    pub async fn redeem_for_bearer(&self, token: &str) -> Result<BearerRedemption, Error> {
        let identity = self.verifier.redeem(token).await?;
        let signed = self.issue_bearer(&identity, None);

        Ok(BearerRedemption {
            bearer_token: signed.as_ref().map(|s| s.token.clone()),
            token_type: signed.as_ref().map(|s| s.token_type),
            expires_at: signed.as_ref().map(|s| s.expires_at),
            identity,
        })
    }

    /// Sign a bearer token for an already verified subject
    ///
    /// Signing failures are logged and reported as `None`, never as an error,
    /// so they cannot undo a successful redemption.
    pub fn issue_bearer(
        &self,
        subject: &str,
        display_name: Option<String>,
    ) -> Option<SignedBearer> {
        let signer = self.signer.as_ref()?;
        match signer.sign(subject, display_name) {
            Ok(signed) => Some(signed),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    subject = %subject,
                    "Bearer token generation failed"
                );
                None
            }
        }
    }

    /// Verify a bearer token previously issued by this instance
    pub fn verify_bearer(&self, token: &str) -> Result<BearerClaims, Error> {
        match &self.signer {
            Some(signer) => signer.verify(token),
            None => Err(
                CryptoError::JwtVerification("Bearer tokens are disabled".to_string()).into(),
            ),
        }
    }

    /// Start a background task that purges expired magic link bindings.
    ///
    /// Expired tokens are already rejected on redemption; this only reclaims
    /// memory for links that were never used.
    ///
    /// # Arguments
    ///
    /// * `interval` - How often to purge
    /// * `shutdown` - A watch receiver that signals when to stop the task
    pub fn start_cleanup_task(
        &self,
        interval: std::time::Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        match store.purge_expired().await {
                            Ok(count) if count > 0 => {
                                tracing::info!(count = count, "Purged expired magic link tokens");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to purge expired magic link tokens");
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down magic link cleanup task");
                        break;
                    }
                }
            }
        })
    }
}
