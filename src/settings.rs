//! Key-value settings store holding the LLM API key and the wallet key.
//!
//! Values are opaque credentials: they are stored and handed to
//! collaborators, never parsed.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, WalletError};

pub const OPENAI_API_KEY: &str = "openaiApiKey";
pub const PRIVATE_KEY: &str = "privateKey";

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// A value that must be present and non-empty.
    async fn require(&self, key: &str) -> Result<String> {
        match self.get(key).await? {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(WalletError::MissingCredential(key.to_string())),
        }
    }
}

fn initial_values(config: &Config) -> HashMap<String, String> {
    let mut values = HashMap::new();
    if let Some(key) = &config.openai_api_key {
        values.insert(OPENAI_API_KEY.to_string(), key.clone());
    }
    if let Some(key) = &config.private_key {
        values.insert(PRIVATE_KEY.to_string(), key.clone());
    }
    values
}

#[derive(Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        MemorySettings {
            values: RwLock::new(initial_values(config)),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Settings persisted as a JSON object on disk; rewritten on every `set`.
pub struct FileSettings {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl FileSettings {
    /// Opens the file, falling back to `config` values for keys it lacks.
    pub async fn open(path: PathBuf, config: &Config) -> Result<Self> {
        let mut values = initial_values(config);

        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                let stored: HashMap<String, String> = serde_json::from_str(&raw).map_err(|e| {
                    WalletError::ConfigError(format!(
                        "Invalid settings file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                values.extend(stored);
                info!("Loaded {} settings from {}", values.len(), path.display());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Settings file {} does not exist yet", path.display());
            }
            Err(e) => {
                return Err(WalletError::ConfigError(format!(
                    "Cannot read settings file {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        Ok(FileSettings {
            path,
            values: RwLock::new(values),
        })
    }
}

#[async_trait]
impl SettingsStore for FileSettings {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value.to_string());

        let raw = serde_json::to_string_pretty(&*values)
            .map_err(|e| WalletError::ConfigError(e.to_string()))?;
        tokio::fs::write(&self.path, raw).await.map_err(|e| {
            WalletError::ConfigError(format!(
                "Cannot write settings file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!("Persisted setting {}", key);
        Ok(())
    }
}
