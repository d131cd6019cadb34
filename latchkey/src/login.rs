//! End-to-end magic link login
//!
//! [`MagicLinkLogin`] composes a [`Latchkey`] instance with the host's user and
//! contact directories: it resolves (or creates) the account behind an email
//! address before issuing a link, and loads the account again when the link
//! is redeemed so the bearer token can carry the email and display name.

use std::sync::Arc;

use latchkey_core::{
    BestEffort, ContactDirectory, Error, IssuedLink, TokenStore, UserDirectory, UserRecord,
    error::{AuthError, utilities::RequiredFieldExt},
};
use serde::{Deserialize, Serialize};

use crate::Latchkey;

/// A request for a magic link
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkRequest {
    pub email: String,
    /// Name for a new account; without it unknown emails are rejected
    pub name: Option<String>,
    /// External URL that should receive the token
    pub redirect_to: Option<String>,
    /// Mobile number to record on the user's contact
    pub mobile_number: Option<String>,
}

impl LinkRequest {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_redirect(mut self, redirect_to: impl Into<String>) -> Self {
        self.redirect_to = Some(redirect_to.into());
        self
    }

    pub fn with_mobile_number(mut self, mobile_number: impl Into<String>) -> Self {
        self.mobile_number = Some(mobile_number.into());
        self
    }
}

/// A link issued for a resolved user
#[derive(Debug)]
pub struct RequestedLink {
    pub user: UserRecord,
    pub link: IssuedLink,
    /// Outcome of the contact update, when a mobile number was supplied
    pub contact_update: Option<BestEffort>,
}

/// A redeemed link together with the user it belonged to
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedLogin {
    pub user: String,
    pub email: String,
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<&'static str>,
}

/// Magic link login over a user and contact directory
pub struct MagicLinkLogin<S: TokenStore, D: UserDirectory + ContactDirectory> {
    latchkey: Arc<Latchkey<S>>,
    directory: Arc<D>,
}

impl<S: TokenStore, D: UserDirectory + ContactDirectory> MagicLinkLogin<S, D> {
    pub fn new(latchkey: Arc<Latchkey<S>>, directory: Arc<D>) -> Self {
        Self {
            latchkey,
            directory,
        }
    }

    pub fn latchkey(&self) -> &Arc<Latchkey<S>> {
        &self.latchkey
    }

    /// Resolve the requesting user and issue a magic link for them
    ///
    /// The contact update is best-effort: its failure is logged and reported
    /// in [`RequestedLink::contact_update`] but the link is still issued.
    pub async fn request_link(&self, request: LinkRequest) -> Result<RequestedLink, Error> {
        let email = Some(request.email.trim()).require_field("email")?;

        let user = match self.directory.find_by_email(email).await? {
            Some(user) => user,
            None => {
                let name = request
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .ok_or(AuthError::UserNotFound)?;
                let user = self.directory.create_user(email, name).await?;
                tracing::info!(user_id = %user.id, "Created user for magic link request");
                user
            }
        };

        let contact_update = match request.mobile_number.as_deref().map(str::trim) {
            Some(mobile) if !mobile.is_empty() => Some(BestEffort::from_result(
                self.directory.upsert_mobile_number(&user.id, mobile).await,
                "magic link contact update",
            )),
            _ => None,
        };

        let link = self
            .latchkey
            .issue_magic_link(&user.id, request.redirect_to.as_deref())
            .await?;

        Ok(RequestedLink {
            user,
            link,
            contact_update,
        })
    }

    /// Redeem a token for the session login flow, returning the user id
    pub async fn login(&self, token: &str) -> Result<String, Error> {
        self.latchkey.redeem_for_session(token).await
    }

    /// Redeem a token for external callers, attaching a bearer token
    ///
    /// The bearer token's subject is the user's email and its display name
    /// the user's full name.
    pub async fn verify(&self, token: &str) -> Result<VerifiedLogin, Error> {
        let user_id = self.latchkey.redeem_for_session(token).await?;
        let user = self
            .directory
            .get_user(&user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let signed = self.latchkey.issue_bearer(&user.email, user.full_name.clone());

        Ok(VerifiedLogin {
            user: user.id,
            email: user.email,
            full_name: user.full_name,
            access_token: signed.as_ref().map(|s| s.token.clone()),
            token_type: signed.as_ref().map(|s| s.token_type),
        })
    }
}
