use crate::core::{Settings, SettingsStore};
use crate::errors::{PageSizeError, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

fn select(values: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .filter_map(|key| values.get(*key).map(|value| (key.to_string(), value.clone())))
        .collect()
}

/// Settings held in memory, shared between the popup side and any number
/// of page sessions.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: RwLock<Map<String, Value>>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self::from_values(settings.to_values())
    }

    /// Raw values, stored as given. Useful for values the extension would
    /// decode leniently.
    pub fn from_values(values: Map<String, Value>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    pub async fn set(&self, key: &str, value: Value) {
        self.values.write().await.insert(key.to_string(), value);
    }

    pub async fn remove(&self, key: &str) {
        self.values.write().await.remove(key);
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        let values = self.values.read().await;
        Ok(select(&values, keys))
    }
}

/// Settings read from a JSON object on disk on every request. A missing
/// file behaves like an empty store.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No settings file at {}", self.path.display());
                return Ok(Map::new());
            }
            Err(e) => {
                return Err(PageSizeError::SettingsUnavailable(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(values) => Ok(select(&values, keys)),
            _ => Err(PageSizeError::SettingsUnavailable(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
        }
    }
}
