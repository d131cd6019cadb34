//! Core functionality for latchkey
//!
//! This crate contains the credential lifecycle behind magic link login:
//!
//! - [`MagicLinkIssuer`] mints a random one-time token, binds it to an identity
//!   in a [`TokenStore`] and builds the link that delivers it.
//! - [`CredentialVerifier`] redeems a token exactly once.
//! - [`BearerTokenSigner`] turns a verified identity into a signed, expiring JWT.
//!
//! It is designed to be used through the `latchkey` crate, which wires these
//! pieces together from configuration.
pub mod bearer;
pub mod crypto;
pub mod directory;
pub mod error;
pub mod services;
pub mod store;
pub mod token;

pub use bearer::{BEARER_TOKEN_TYPE, BearerClaims, BearerTokenSigner, JwtConfig, SignedBearer};
pub use directory::{BestEffort, ContactDirectory, InMemoryDirectory, UserDirectory, UserRecord};
pub use error::Error;
pub use services::{CredentialVerifier, IssuedLink, MagicLinkIssuer, VerifyEndpoint};
pub use store::{InMemoryTokenStore, TokenStore};
pub use token::MagicLinkToken;
