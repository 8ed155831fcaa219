//! Local key-value persistence
//!
//! A flat JSON object of string keys to string values kept in one file in the
//! app config directory. The session record lives under a single key.

use crate::domain::session::Session;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// File name of the store inside the config directory.
pub const STORE_FILE_NAME: &str = "storage.json";

/// Key the signed-in user is stored under.
pub const SESSION_KEY: &str = "user";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage file is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error("stored session is malformed: {0}")]
    MalformedSession(String),
    #[error("could not encode session: {0}")]
    Encode(#[source] serde_json::Error),
}

pub struct KeyValueStore {
    path: PathBuf,
}

impl KeyValueStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(StorageError::Corrupt),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_all(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(items).map_err(StorageError::Encode)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    pub async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all().await?.remove(key))
    }

    pub async fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        // A corrupt file is replaced rather than blocking every future write.
        let mut items = self.read_all().await.unwrap_or_default();
        items.insert(key.to_string(), value);
        self.write_all(&items).await
    }

    pub async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.read_all().await.unwrap_or_default();
        if items.remove(key).is_some() {
            self.write_all(&items).await?;
        }
        Ok(())
    }
}

/// Typed access to the persisted session record.
pub struct SessionStore {
    store: KeyValueStore,
}

impl SessionStore {
    pub fn new(store: KeyValueStore) -> Self {
        Self { store }
    }

    /// `Ok(None)` when nobody is signed in.
    pub async fn load(&self) -> Result<Option<Session>, StorageError> {
        let Some(raw) = self.store.get_item(SESSION_KEY).await? else {
            debug!(path = %self.store.path().display(), "No stored session");
            return Ok(None);
        };

        let session: Session = serde_json::from_str(&raw)
            .map_err(|e| StorageError::MalformedSession(e.to_string()))?;
        if !session.is_valid() {
            return Err(StorageError::MalformedSession(
                "access token is empty".to_string(),
            ));
        }

        info!(email = ?session.email, "Session restored from storage");
        Ok(Some(session))
    }

    pub async fn save(&self, session: &Session) -> Result<(), StorageError> {
        let json = serde_json::to_string(session).map_err(StorageError::Encode)?;
        self.store.set_item(SESSION_KEY, json).await
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.store.remove_item(SESSION_KEY).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn scratch_store() -> KeyValueStore {
        let dir = std::env::temp_dir().join(format!("esp32_remote-{}", uuid::Uuid::new_v4()));
        KeyValueStore::new(dir.join("storage.json"))
    }

    fn session() -> Session {
        Session {
            access_token: "ya29.token".to_string(),
            id_token: None,
            email: Some("ada@example.com".to_string()),
            given_name: Some("Ada".to_string()),
            photo_url: None,
        }
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let store = scratch_store();
        assert_eq!(store.get_item("user").await.unwrap(), None);
        store.remove_item("user").await.unwrap();
    }

    #[tokio::test]
    async fn session_survives_a_reload() {
        let store = SessionStore::new(scratch_store());
        store.save(&session()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(session()));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn other_keys_are_preserved() {
        let kv = scratch_store();
        kv.set_item("theme", "dark".to_string()).await.unwrap();
        let path = kv.path().to_path_buf();

        let sessions = SessionStore::new(kv);
        sessions.save(&session()).await.unwrap();
        sessions.clear().await.unwrap();

        let kv = KeyValueStore::new(path);
        assert_eq!(kv.get_item("theme").await.unwrap().as_deref(), Some("dark"));
    }

    #[tokio::test]
    async fn malformed_session_is_an_error_not_a_panic() {
        let kv = scratch_store();
        kv.set_item(SESSION_KEY, "{\"accessToken\": 42".to_string())
            .await
            .unwrap();

        let store = SessionStore::new(kv);
        assert!(matches!(
            store.load().await,
            Err(StorageError::MalformedSession(_))
        ));
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let kv = scratch_store();
        kv.set_item(SESSION_KEY, r#"{"accessToken":""}"#.to_string())
            .await
            .unwrap();

        let store = SessionStore::new(kv);
        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn corrupt_file_is_reported_then_overwritten() {
        let kv = scratch_store();
        tokio::fs::create_dir_all(kv.path().parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(kv.path(), "[1, 2").await.unwrap();

        assert!(matches!(
            kv.get_item(SESSION_KEY).await,
            Err(StorageError::Corrupt(_))
        ));

        kv.set_item("k", "v".to_string()).await.unwrap();
        assert_eq!(kv.get_item("k").await.unwrap().as_deref(), Some("v"));
    }
}
