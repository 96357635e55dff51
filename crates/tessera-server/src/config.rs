use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tessera_store::StoreConfig;
use tessera_types::LayoutPolicy;
use tessera_worker::WorkerConfig;

use crate::error::{ServerError, ServerResult};

/// Listener settings for the HTTP surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8043)),
        }
    }
}

/// Storage backend settings, as read from the host configuration file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    pub enable: bool,
    /// Root of the canonical address space.
    pub storage_directory: PathBuf,
    /// Root where content is actually written.
    pub mount_directory: PathBuf,
    pub storage_path_format: LayoutPolicy,
    pub max_retry: u32,
    pub delayed_deletion: DelayedDeletionSettings,
}

impl Default for StorageSettings {
    fn default() -> Self {
        let store = StoreConfig::default();
        Self {
            enable: false,
            storage_directory: store.root,
            mount_directory: store.mount,
            storage_path_format: store.layout,
            max_retry: store.max_retry,
            delayed_deletion: DelayedDeletionSettings::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DelayedDeletionSettings {
    pub enable: bool,
    pub throttle_delay_ms: u64,
    /// Queue database file. Defaults to a per-node file under the storage
    /// directory.
    pub path: Option<PathBuf>,
}

impl StorageSettings {
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Read settings from a TOML file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.storage_directory, &self.mount_directory)
            .with_layout(self.storage_path_format)
            .with_max_retry(self.max_retry)
    }

    pub fn worker_config(&self, node_identifier: &str) -> WorkerConfig {
        WorkerConfig::new(node_identifier)
            .with_throttle_delay(Duration::from_millis(self.delayed_deletion.throttle_delay_ms))
    }

    /// Queue database path for `node_identifier`.
    pub fn queue_path(&self, node_identifier: &str) -> PathBuf {
        match &self.delayed_deletion.path {
            Some(path) => path.clone(),
            None => self
                .storage_directory
                .join(self.worker_config(node_identifier).queue_file_name()),
        }
    }

    /// Apply the hot-reloadable subset of settings.
    pub fn apply(&mut self, update: &ConfigurationUpdate) {
        if let Some(mount) = &update.mount_directory {
            self.mount_directory = mount.clone();
        }
        if let Some(layout) = update.storage_path_format {
            self.storage_path_format = layout;
        }
        if let Some(max_retry) = update.max_retry {
            self.max_retry = max_retry;
        }
    }
}

/// Settings that may change while the backend is running. Every other key
/// in a posted configuration document is ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationUpdate {
    pub mount_directory: Option<PathBuf>,
    pub storage_path_format: Option<LayoutPolicy>,
    pub max_retry: Option<u32>,
}

impl ConfigurationUpdate {
    pub fn is_empty(&self) -> bool {
        self.mount_directory.is_none()
            && self.storage_path_format.is_none()
            && self.max_retry.is_none()
    }
}
