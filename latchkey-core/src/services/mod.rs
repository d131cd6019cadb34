//! Service layer
//!
//! The issuer and verifier share a token store but are otherwise independent.

pub mod issuer;
pub mod verifier;

pub use issuer::{IssuedLink, MagicLinkIssuer, VerifyEndpoint, append_token};
pub use verifier::CredentialVerifier;
