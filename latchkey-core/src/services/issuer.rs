use std::sync::Arc;

use chrono::Duration;

use crate::{Error, MagicLinkToken, error::utilities::RequiredFieldExt, store::TokenStore};

/// Where a default (non-redirect) magic link points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyEndpoint {
    /// Scheme and host, e.g. `https://shop.example.com`
    pub base_url: String,
    /// Path of the verification handler, e.g. `/auth/magic-link/verify`
    pub path: String,
}

impl VerifyEndpoint {
    pub fn new(base_url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            path: path.into(),
        }
    }

    fn url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

/// A minted token together with the URL that delivers it
#[derive(Debug, Clone)]
pub struct IssuedLink {
    pub token: MagicLinkToken,
    pub url: String,
}

/// Append `token=<token>` to `url`, keeping any existing query and fragment.
pub fn append_token(url: &str, token: &str) -> String {
    let (head, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };

    let separator = if head.ends_with('?') || head.ends_with('&') {
        ""
    } else if head.contains('?') {
        "&"
    } else {
        "?"
    };

    match fragment {
        Some(fragment) => format!("{head}{separator}token={token}#{fragment}"),
        None => format!("{head}{separator}token={token}"),
    }
}

/// Service that mints magic link tokens for resolved identities
pub struct MagicLinkIssuer<S: TokenStore> {
    store: Arc<S>,
    ttl: Duration,
    endpoint: VerifyEndpoint,
}

impl<S: TokenStore> MagicLinkIssuer<S> {
    pub fn new(store: Arc<S>, ttl: Duration, endpoint: VerifyEndpoint) -> Self {
        Self {
            store,
            ttl,
            endpoint,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a token for `identity` and build the link that carries it
    ///
    /// With `redirect_to` the token is appended to that URL; otherwise the
    /// link targets the configured verification endpoint.
    pub async fn issue(
        &self,
        identity: &str,
        redirect_to: Option<&str>,
    ) -> Result<IssuedLink, Error> {
        let identity = Some(identity).require_field("identity")?;
        let token = MagicLinkToken::generate(identity, self.ttl)?;

        self.store
            .put_until(&token.token, identity, token.expires_at)
            .await?;

        let redirect_to = redirect_to.map(str::trim).filter(|r| !r.is_empty());
        let url = match redirect_to {
            Some(redirect_to) => append_token(redirect_to, &token.token),
            None => append_token(&self.endpoint.url(), &token.token),
        };

        tracing::info!(
            identity = %identity,
            expires_at = %token.expires_at,
            external = redirect_to.is_some(),
            "Issued magic link"
        );

        Ok(IssuedLink { token, url })
    }
}
