//! Credential storage.
//!
//! Holds one record per `(service, name)` pair with API keys, login secrets
//! and the current vendor session. Broker clients read a credential at login
//! time and write the session artifact back; nothing else mutates it.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use trading_core::error::CredentialError;
use trading_core::types::{Credential, ServiceKind};

/// Session fields written after a successful login.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub token: String,
    pub session_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionUpdate {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            session_id: None,
            expires_at: None,
        }
    }

    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn expiring_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }
}

/// Trait for credential stores.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create or replace the credential for its `(service, name)` pair.
    async fn upsert(&self, credential: Credential) -> Result<(), CredentialError>;

    /// Get one credential.
    async fn get(&self, service: ServiceKind, name: &str) -> Result<Credential, CredentialError>;

    /// List credentials, optionally for one service, sorted by service then name.
    async fn list(&self, service: Option<ServiceKind>) -> Result<Vec<Credential>, CredentialError>;

    /// Delete a credential. Returns whether it existed.
    async fn delete(&self, service: ServiceKind, name: &str) -> Result<bool, CredentialError>;

    /// Record a new session after login.
    async fn update_session(
        &self,
        service: ServiceKind,
        name: &str,
        update: SessionUpdate,
    ) -> Result<(), CredentialError>;

    /// Drop the session token after logout or expiry.
    async fn clear_session(&self, service: ServiceKind, name: &str) -> Result<(), CredentialError>;
}

/// Validate fields that every store enforces.
pub(crate) fn check(credential: &Credential) -> Result<(), CredentialError> {
    if credential.name.trim().is_empty() {
        return Err(CredentialError::InvalidField("name must not be empty".into()));
    }
    Ok(())
}

/// Apply a session update to a credential in place.
pub(crate) fn apply_session(credential: &mut Credential, update: SessionUpdate) {
    credential.session_token = Some(update.token);
    if let Some(id) = update.session_id {
        credential.session_id = Some(id);
    }
    credential.session_expires_at = update.expires_at;
    credential.updated_at = Utc::now();
}

pub(crate) fn not_found(service: ServiceKind, name: &str) -> CredentialError {
    CredentialError::NotFound {
        service,
        name: name.to_string(),
    }
}
