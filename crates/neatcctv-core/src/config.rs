//! Application configuration management.
//!
//! Holds the vendor base URL, the last account used, an optional request
//! timeout and the storage backend for session state.
//!
//! Configuration is stored at `~/.config/neatcctv/config.json`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ReqwestTransport, DEFAULT_BASE_URL};
use crate::storage::{FileStore, KeyValueStore, KeyringStore};

/// Application name used for config directory paths
const APP_NAME: &str = "neatcctv";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the vendor base URL
pub const BASE_URL_ENV: &str = "NEATCCTV_API_URL";

/// Where session state is persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub base_url: Option<String>,
    pub last_username: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub storage: StorageBackend,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME))
    }

    /// Base URL from the environment, then the config file, then the default.
    pub fn api_base_url(&self) -> String {
        let env = std::env::var(BASE_URL_ENV).ok();
        Self::resolve_base_url(env.as_deref(), self.base_url.as_deref())
    }

    fn resolve_base_url(env: Option<&str>, configured: Option<&str>) -> String {
        env.into_iter()
            .chain(configured)
            .map(str::trim)
            .find(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Open the configured session store.
    pub fn open_store(&self) -> Result<Arc<dyn KeyValueStore>> {
        let store: Arc<dyn KeyValueStore> = match self.storage {
            StorageBackend::File => Arc::new(FileStore::in_dir(&Self::config_dir()?)),
            StorageBackend::Keyring => Arc::new(KeyringStore::default()),
        };
        Ok(store)
    }

    /// Build an API client from this configuration over `store`.
    pub fn api_client(&self, store: Arc<dyn KeyValueStore>) -> Result<ApiClient> {
        let transport = ReqwestTransport::new(self.request_timeout())
            .context("Failed to build HTTP client")?;
        Ok(ApiClient::with_transport(
            self.api_base_url(),
            Arc::new(transport),
            store,
        ))
    }
}
