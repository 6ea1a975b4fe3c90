//! Key-Value Settings Store backed by a JSON file

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

/// JSON file-backed settings store
///
/// Loads the full map at construction and rewrites the file on every
/// mutation. Suited to the engine's small persisted footprint (favorite
/// set, cache index, a handful of flags); not a general database.
pub struct JsonSettingsStore {
    path: PathBuf,
    entries: Mutex<Map<String, Value>>,
}

impl JsonSettingsStore {
    /// Open (or create) the settings file at `path`.
    pub fn new(path: PathBuf) -> std::io::Result<Self> {
        let entries = match std::fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data).unwrap_or_default(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Open the settings file in the platform config directory.
    pub fn in_default_location() -> std::io::Result<Self> {
        let dir = dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("media-client-core");
        std::fs::create_dir_all(&dir)?;
        Self::new(dir.join("settings.json"))
    }

    async fn persist(&self, entries: &Map<String, Value>) -> Result<()> {
        let data = serde_json::to_vec_pretty(entries)
            .map_err(|e| BridgeError::OperationFailed(format!("Settings serialization: {}", e)))?;

        tokio::fs::write(&self.path, data)
            .await
            .map_err(BridgeError::Io)?;
        debug!(path = ?self.path, keys = entries.len(), "Persisted settings");
        Ok(())
    }

    async fn set_value(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
        self.persist(&entries).await
    }

    async fn get_value(&self, key: &str) -> Option<Value> {
        self.entries.lock().await.get(key).cloned()
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, Value::String(value.to_string())).await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .get_value(key)
            .await
            .and_then(|v| v.as_str().map(String::from)))
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_value(key, Value::Bool(value)).await
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.get_value(key).await.and_then(|v| v.as_bool()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }
}
