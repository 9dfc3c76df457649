//! In-memory credential store.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use trading_core::error::CredentialError;
use trading_core::types::{Credential, ServiceKind};

use crate::{apply_session, check, not_found, CredentialStore, SessionUpdate};

/// Credential store kept in memory, for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<(ServiceKind, String), Credential>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with the given credentials.
    pub fn with_credentials(credentials: impl IntoIterator<Item = Credential>) -> Self {
        let records = credentials
            .into_iter()
            .map(|c| ((c.service, c.name.clone()), c))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn upsert(&self, credential: Credential) -> Result<(), CredentialError> {
        check(&credential)?;
        let mut records = self.records.write().await;
        records.insert((credential.service, credential.name.clone()), credential);
        Ok(())
    }

    async fn get(&self, service: ServiceKind, name: &str) -> Result<Credential, CredentialError> {
        let records = self.records.read().await;
        records
            .get(&(service, name.to_string()))
            .cloned()
            .ok_or_else(|| not_found(service, name))
    }

    async fn list(&self, service: Option<ServiceKind>) -> Result<Vec<Credential>, CredentialError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|c| service.map_or(true, |s| c.service == s))
            .cloned()
            .collect())
    }

    async fn delete(&self, service: ServiceKind, name: &str) -> Result<bool, CredentialError> {
        let mut records = self.records.write().await;
        Ok(records.remove(&(service, name.to_string())).is_some())
    }

    async fn update_session(
        &self,
        service: ServiceKind,
        name: &str,
        update: SessionUpdate,
    ) -> Result<(), CredentialError> {
        let mut records = self.records.write().await;
        let credential = records
            .get_mut(&(service, name.to_string()))
            .ok_or_else(|| not_found(service, name))?;
        apply_session(credential, update);
        Ok(())
    }

    async fn clear_session(&self, service: ServiceKind, name: &str) -> Result<(), CredentialError> {
        let mut records = self.records.write().await;
        let credential = records
            .get_mut(&(service, name.to_string()))
            .ok_or_else(|| not_found(service, name))?;
        credential.clear_session();
        Ok(())
    }
}
