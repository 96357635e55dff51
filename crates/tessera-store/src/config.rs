use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tessera_types::LayoutPolicy;

/// Configuration for a [`FileSystemStore`](crate::FileSystemStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root of the canonical address space (indirection records, legacy blobs).
    pub root: PathBuf,
    /// Root of the mount address space (actual content).
    pub mount: PathBuf,
    /// Mount layout policy for recognised content.
    pub layout: LayoutPolicy,
    /// Attempts per write before a transient failure is surfaced.
    pub max_retry: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("TesseraStorage"),
            mount: PathBuf::from("fs1"),
            layout: LayoutPolicy::Full,
            max_retry: 3,
        }
    }
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>, mount: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            mount: mount.into(),
            ..Self::default()
        }
    }

    pub fn with_layout(mut self, layout: LayoutPolicy) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }
}
