use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tessera_store::{BlobStore, ContentClassifier, FileSystemStore};
use tessera_types::{BlobId, ContentKind};
use tessera_worker::DeletionWorker;
use tracing::{debug, info};

use crate::config::{ConfigurationUpdate, StorageSettings};
use crate::error::{ServerError, ServerResult};

/// Deletion statistics as reported over HTTP.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub files_pending_deletion: u64,
    pub database_server_identifier: String,
}

/// The storage area handed to the archive server.
///
/// Blob operations go to the current [`FileSystemStore`]. A configuration
/// update swaps in a freshly built store; callers already holding the old one
/// finish against it. With delayed deletion enabled, `remove` only enqueues
/// and the [`DeletionWorker`] does the removal later.
pub struct StorageBackend {
    node_identifier: String,
    classifier: Arc<dyn ContentClassifier>,
    settings: RwLock<StorageSettings>,
    store: RwLock<Arc<FileSystemStore>>,
    worker: Option<Arc<DeletionWorker>>,
}

impl StorageBackend {
    /// Build the store and, when delayed deletion is enabled, open the queue.
    /// The worker is left in `Setup`; call [`start`](Self::start).
    pub fn open(
        mut settings: StorageSettings,
        node_identifier: impl Into<String>,
        classifier: Arc<dyn ContentClassifier>,
    ) -> ServerResult<Self> {
        let node_identifier = node_identifier.into();
        let store = FileSystemStore::new(settings.store_config(), Arc::clone(&classifier))?;
        let store = Arc::new(store);

        let worker = if settings.delayed_deletion.enable {
            let queue_path = settings.queue_path(&node_identifier);
            let worker = DeletionWorker::open(
                Arc::clone(&store) as Arc<dyn BlobStore>,
                &queue_path,
                settings.worker_config(&node_identifier),
            )?;
            settings.delayed_deletion.path = Some(queue_path);
            Some(Arc::new(worker))
        } else {
            None
        };

        info!(
            root = %settings.storage_directory.display(),
            mount = %settings.mount_directory.display(),
            layout = settings.storage_path_format.as_str(),
            delayed_deletion = worker.is_some(),
            "storage backend ready"
        );

        Ok(Self {
            node_identifier,
            classifier,
            settings: RwLock::new(settings),
            store: RwLock::new(store),
            worker,
        })
    }

    /// Start the deletion worker, if there is one.
    pub fn start(&self) -> ServerResult<()> {
        if let Some(worker) = &self.worker {
            worker.start()?;
        }
        Ok(())
    }

    /// Stop the deletion worker, if there is one.
    pub fn stop(&self) {
        if let Some(worker) = &self.worker {
            worker.stop();
        }
    }

    pub fn node_identifier(&self) -> &str {
        &self.node_identifier
    }

    pub fn worker(&self) -> Option<&Arc<DeletionWorker>> {
        self.worker.as_ref()
    }

    pub fn deferred_deletion(&self) -> bool {
        self.worker.is_some()
    }

    /// The store currently used for new operations.
    pub fn store(&self) -> Arc<FileSystemStore> {
        Arc::clone(&self.store.read().expect("store lock poisoned"))
    }

    pub fn create(&self, id: &str, content: &[u8]) -> ServerResult<()> {
        self.store().create(id, content)?;
        Ok(())
    }

    pub fn read_whole(&self, id: &str) -> ServerResult<Vec<u8>> {
        Ok(self.store().read_whole(id)?)
    }

    pub fn read_range(&self, id: &str, offset: u64, length: u64) -> ServerResult<Vec<u8>> {
        Ok(self.store().read_range(id, offset, length)?)
    }

    /// Remove `id`, either now or through the deletion queue.
    pub fn remove(&self, id: &str, kind: ContentKind) -> ServerResult<()> {
        match &self.worker {
            Some(worker) => {
                let id = BlobId::parse(id).map_err(tessera_store::StoreError::from)?;
                worker.enqueue(&id, kind)?;
            }
            None => {
                debug!(id, kind = %kind, "removing blob synchronously");
                self.store().remove(id)?;
            }
        }
        Ok(())
    }

    /// Where unrecognised content for `id` would be written.
    pub fn path_of(&self, id: &str) -> ServerResult<PathBuf> {
        Ok(self.store().get_path(id)?)
    }

    /// The effective settings.
    pub fn configuration(&self) -> StorageSettings {
        self.settings.read().expect("settings lock poisoned").clone()
    }

    /// Apply a hot-reload update and return the resulting settings.
    ///
    /// The new store is built before anything is replaced, so a rejected
    /// update leaves both the settings and the store untouched.
    pub fn update_configuration(
        &self,
        update: &ConfigurationUpdate,
    ) -> ServerResult<StorageSettings> {
        let mut settings = self.settings.write().expect("settings lock poisoned");
        if update.is_empty() {
            return Ok(settings.clone());
        }

        let mut next = settings.clone();
        next.apply(update);
        let store = FileSystemStore::new(next.store_config(), Arc::clone(&self.classifier))
            .map_err(|e| ServerError::Config(e.to_string()))?;

        *self.store.write().expect("store lock poisoned") = Arc::new(store);
        *settings = next;
        info!(
            mount = %settings.mount_directory.display(),
            layout = settings.storage_path_format.as_str(),
            max_retry = settings.max_retry,
            "storage configuration updated"
        );
        Ok(settings.clone())
    }

    pub fn status(&self) -> ServerResult<StatusReport> {
        let files_pending_deletion = match &self.worker {
            Some(worker) => worker.statistics()?.pending_count,
            None => 0,
        };
        Ok(StatusReport {
            files_pending_deletion,
            database_server_identifier: self.node_identifier.clone(),
        })
    }
}

impl std::fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageBackend")
            .field("node_identifier", &self.node_identifier)
            .field("settings", &self.configuration())
            .field("worker", &self.worker)
            .finish()
    }
}
