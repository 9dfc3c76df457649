//! JSON file-backed credential store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;
use trading_core::error::CredentialError;
use trading_core::types::{Credential, ServiceKind};

use crate::{apply_session, check, not_found, CredentialStore, SessionUpdate};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    credentials: Vec<Credential>,
}

impl Document {
    fn position(&self, service: ServiceKind, name: &str) -> Option<usize> {
        self.credentials
            .iter()
            .position(|c| c.service == service && c.name == name)
    }

    fn find_mut(&mut self, service: ServiceKind, name: &str) -> Result<&mut Credential, CredentialError> {
        let idx = self.position(service, name).ok_or_else(|| not_found(service, name))?;
        Ok(&mut self.credentials[idx])
    }
}

/// Credential store persisted as a single JSON document.
///
/// The file is re-read on every operation so that the CLI and a running
/// scheduler see each other's writes. Writes go to a temporary file that is
/// renamed over the original.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store at the given path. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Document, CredentialError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Document::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, mut doc: Document) -> Result<(), CredentialError> {
        doc.credentials
            .sort_by(|a, b| (a.service, &a.name).cmp(&(b.service, &b.name)));
        let json = serde_json::to_vec_pretty(&doc)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), count = doc.credentials.len(), "Credential store written");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for JsonFileStore {
    async fn upsert(&self, credential: Credential) -> Result<(), CredentialError> {
        check(&credential)?;
        let _guard = self.lock.lock().await;
        let mut doc = self.load().await?;
        match doc.position(credential.service, &credential.name) {
            Some(idx) => doc.credentials[idx] = credential,
            None => doc.credentials.push(credential),
        }
        self.save(doc).await
    }

    async fn get(&self, service: ServiceKind, name: &str) -> Result<Credential, CredentialError> {
        let _guard = self.lock.lock().await;
        let doc = self.load().await?;
        doc.credentials
            .into_iter()
            .find(|c| c.service == service && c.name == name)
            .ok_or_else(|| not_found(service, name))
    }

    async fn list(&self, service: Option<ServiceKind>) -> Result<Vec<Credential>, CredentialError> {
        let _guard = self.lock.lock().await;
        let doc = self.load().await?;
        let mut items: Vec<Credential> = doc
            .credentials
            .into_iter()
            .filter(|c| service.map_or(true, |s| c.service == s))
            .collect();
        items.sort_by(|a, b| (a.service, &a.name).cmp(&(b.service, &b.name)));
        Ok(items)
    }

    async fn delete(&self, service: ServiceKind, name: &str) -> Result<bool, CredentialError> {
        let _guard = self.lock.lock().await;
        let mut doc = self.load().await?;
        match doc.position(service, name) {
            Some(idx) => {
                doc.credentials.remove(idx);
                self.save(doc).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_session(
        &self,
        service: ServiceKind,
        name: &str,
        update: SessionUpdate,
    ) -> Result<(), CredentialError> {
        let _guard = self.lock.lock().await;
        let mut doc = self.load().await?;
        apply_session(doc.find_mut(service, name)?, update);
        self.save(doc).await
    }

    async fn clear_session(&self, service: ServiceKind, name: &str) -> Result<(), CredentialError> {
        let _guard = self.lock.lock().await;
        let mut doc = self.load().await?;
        doc.find_mut(service, name)?.clear_session();
        self.save(doc).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn breeze() -> Credential {
        Credential::new(ServiceKind::Breeze, "primary").with_api_key("appkey", "secret")
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("creds.json"));
        assert!(store.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("creds.json");

        let store = JsonFileStore::new(&path);
        store.upsert(breeze()).await.unwrap();
        store
            .upsert(Credential::new(ServiceKind::Neo, "main").with_pin("4321"))
            .await
            .unwrap();

        let reopened = JsonFileStore::new(&path);
        let listed = reopened.list(None).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].service, ServiceKind::Breeze);
        assert_eq!(listed[1].secondary_pin.as_deref(), Some("4321"));

        let only_neo = reopened.list(Some(ServiceKind::Neo)).await.unwrap();
        assert_eq!(only_neo.len(), 1);
    }

    #[tokio::test]
    async fn test_session_update_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("creds.json"));
        store.upsert(breeze()).await.unwrap();

        let expiry = Utc::now() + Duration::hours(8);
        store
            .update_session(
                ServiceKind::Breeze,
                "primary",
                SessionUpdate::new("session-xyz").expiring_at(expiry),
            )
            .await
            .unwrap();

        let cred = store.get(ServiceKind::Breeze, "primary").await.unwrap();
        assert_eq!(cred.active_session(Utc::now()), Some("session-xyz"));

        store.clear_session(ServiceKind::Breeze, "primary").await.unwrap();
        let cred = store.get(ServiceKind::Breeze, "primary").await.unwrap();
        assert!(cred.session_token.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("creds.json"));
        store.upsert(breeze()).await.unwrap();

        assert!(store.delete(ServiceKind::Breeze, "primary").await.unwrap());
        assert!(!store.delete(ServiceKind::Breeze, "primary").await.unwrap());
        assert!(store.get(ServiceKind::Breeze, "primary").await.is_err());
    }

    #[tokio::test]
    async fn test_session_update_for_unknown_credential() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("creds.json"));
        let err = store
            .update_session(ServiceKind::Neo, "ghost", SessionUpdate::new("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::NotFound { .. }));
    }
}
