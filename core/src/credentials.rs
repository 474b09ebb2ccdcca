//! Persistence of the Salesforce login bundle.
//!
//! Credentials live in a small key-value store under a single key, encoded
//! as a JSON string. The store is a trait so the gateway can be handed a
//! file-backed store in the CLI and an in-memory one in tests.

use std::collections::HashMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::get_default_config_dir;
use crate::errors::{SalesforceError, SalesforceResult};

/// Key the credential bundle is stored under
pub const CREDENTIALS_KEY: &str = "salesforce_credentials";

/// Username, password and security token for the SOAP login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub security_token: String,
}

impl Credentials {
    /// The backend expects the security token appended to the password
    pub fn login_password(&self) -> String {
        format!("{}{}", self.password, self.security_token)
    }
}

/// Process-wide string key-value storage
#[async_trait]
pub trait CredentialStore: Send + Sync + Debug {
    async fn get_item(&self, key: &str) -> SalesforceResult<Option<String>>;

    async fn set_item(&self, key: &str, value: &str) -> SalesforceResult<()>;

    async fn remove_item(&self, key: &str) -> SalesforceResult<()>;
}

/// Type alias for Arc-wrapped CredentialStore trait objects
pub type CredentialStoreRef = Arc<dyn CredentialStore>;

/// Stores the credential bundle as a JSON string
pub async fn save_credentials(
    store: &dyn CredentialStore,
    credentials: &Credentials,
) -> SalesforceResult<()> {
    let encoded = serde_json::to_string(credentials)?;
    store.set_item(CREDENTIALS_KEY, &encoded).await
}

/// Returns the stored bundle, or `None` when nothing has been saved yet
pub async fn load_credentials(store: &dyn CredentialStore) -> SalesforceResult<Option<Credentials>> {
    match store.get_item(CREDENTIALS_KEY).await? {
        Some(raw) if !raw.is_empty() => Ok(Some(serde_json::from_str(&raw)?)),
        _ => Ok(None),
    }
}

pub async fn clear_credentials(store: &dyn CredentialStore) -> SalesforceResult<()> {
    store.remove_item(CREDENTIALS_KEY).await
}

/// In-memory implementation of CredentialStore
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    items: RwLock<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get_item(&self, key: &str) -> SalesforceResult<Option<String>> {
        let items = self.items.read().map_err(|e| {
            SalesforceError::CredentialStore(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> SalesforceResult<()> {
        let mut items = self.items.write().map_err(|e| {
            SalesforceError::CredentialStore(format!("Failed to acquire write lock: {}", e))
        })?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> SalesforceResult<()> {
        let mut items = self.items.write().map_err(|e| {
            SalesforceError::CredentialStore(format!("Failed to acquire write lock: {}", e))
        })?;
        items.remove(key);
        Ok(())
    }
}

/// Key-value store persisted as one JSON object file
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.config/sfmemo/local_storage.json`
    pub fn default_location() -> SalesforceResult<Self> {
        Ok(Self::new(get_default_config_dir()?.join("local_storage.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> SalesforceResult<Map<String, Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(SalesforceError::CredentialStore(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
        }
    }

    async fn write_all(&self, items: &Map<String, Value>) -> SalesforceResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(items)?;
        tokio::fs::write(&self.path, content).await?;
        debug!(path = %self.path.display(), "Wrote local storage");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get_item(&self, key: &str) -> SalesforceResult<Option<String>> {
        let items = self.read_all().await?;
        Ok(items.get(key).and_then(Value::as_str).map(str::to_string))
    }

    async fn set_item(&self, key: &str, value: &str) -> SalesforceResult<()> {
        let mut items = self.read_all().await?;
        items.insert(key.to_string(), Value::String(value.to_string()));
        self.write_all(&items).await
    }

    async fn remove_item(&self, key: &str) -> SalesforceResult<()> {
        let mut items = self.read_all().await?;
        if items.remove(key).is_some() {
            self.write_all(&items).await?;
        }
        Ok(())
    }
}
