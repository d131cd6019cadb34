//! Identity directory collaborators
//!
//! Latchkey does not own user accounts or contact records. The host
//! application provides them through [`UserDirectory`] and
//! [`ContactDirectory`]; [`InMemoryDirectory`] is a reference implementation
//! for tests and local development.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::{Error, crypto::generate_secure_token, error::StorageError};

/// A user account as seen by latchkey
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Stable identifier; this is what magic link tokens bind to.
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
}

#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, Error>;

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>, Error>;

    /// Create an enabled account for `email`. No welcome email is sent.
    async fn create_user(&self, email: &str, full_name: &str) -> Result<UserRecord, Error>;
}

#[async_trait]
pub trait ContactDirectory: Send + Sync + 'static {
    /// Ensure the contact record linked to `user_id` carries `mobile_number`,
    /// creating the record when the user has none.
    async fn upsert_mobile_number(&self, user_id: &str, mobile_number: &str)
    -> Result<(), Error>;
}

/// Outcome of a secondary side effect that never aborts the primary flow
#[derive(Debug)]
#[must_use]
pub enum BestEffort {
    Applied,
    Failed(Error),
}

impl BestEffort {
    /// Wrap `result`, logging a failure under `context`.
    pub fn from_result(result: Result<(), Error>, context: &str) -> Self {
        match result {
            Ok(()) => BestEffort::Applied,
            Err(e) => {
                tracing::error!(error = %e, context, "Best-effort update failed");
                BestEffort::Failed(e)
            }
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, BestEffort::Applied)
    }
}

/// Contact details kept by [`InMemoryDirectory`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactRecord {
    pub mobile_number: Option<String>,
    pub phone_numbers: Vec<String>,
}

/// DashMap-backed user and contact directory
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    users: DashMap<String, UserRecord>,
    contacts: DashMap<String, ContactRecord>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user record.
    pub fn insert_user(&self, user: UserRecord) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn contact(&self, user_id: &str) -> Option<ContactRecord> {
        self.contacts.get(user_id).map(|c| c.clone())
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, Error> {
        Ok(self
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .map(|u| u.clone()))
    }

    async fn get_user(&self, id: &str) -> Result<Option<UserRecord>, Error> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn create_user(&self, email: &str, full_name: &str) -> Result<UserRecord, Error> {
        let suffix = generate_secure_token()?;
        let user = UserRecord {
            id: format!("usr_{}", &suffix[..16]),
            email: email.to_string(),
            full_name: Some(full_name.to_string()),
        };
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }
}

#[async_trait]
impl ContactDirectory for InMemoryDirectory {
    async fn upsert_mobile_number(
        &self,
        user_id: &str,
        mobile_number: &str,
    ) -> Result<(), Error> {
        if !self.users.contains_key(user_id) {
            return Err(StorageError::NotFound.into());
        }

        let mut contact = self.contacts.entry(user_id.to_string()).or_default();
        contact.mobile_number = Some(mobile_number.to_string());
        if !contact.phone_numbers.iter().any(|p| p == mobile_number) {
            contact.phone_numbers.push(mobile_number.to_string());
        }
        Ok(())
    }
}
