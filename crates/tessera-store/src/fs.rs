use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tessera_types::BlobId;
use tracing::{debug, error};

use crate::address::{canonical_path, indirection_path};
use crate::classify::ContentClassifier;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::layout;
use crate::retry::RetryPolicy;
use crate::traits::BlobStore;

/// Number of directory levels above a removed file that are pruned when empty.
const PRUNE_LEVELS: usize = 2;

/// Where a blob's bytes were found after dereferencing its indirection record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// Canonical address derived from the id.
    pub canonical: PathBuf,
    /// Path holding the content.
    pub content: PathBuf,
    /// Indirection record, when one exists. `None` means legacy mode: the
    /// canonical address holds the content itself.
    pub indirection: Option<PathBuf>,
}

/// On-disk blob store with canonical and mount address families.
///
/// Holds no state besides its configuration; every call recomputes or
/// re-reads what it needs from the filesystem.
pub struct FileSystemStore {
    config: StoreConfig,
    classifier: Arc<dyn ContentClassifier>,
    retry: RetryPolicy,
}

impl FileSystemStore {
    /// Create a store. Fails with `InvalidArgument` if the root or mount
    /// directory is empty.
    pub fn new(config: StoreConfig, classifier: Arc<dyn ContentClassifier>) -> StoreResult<Self> {
        if config.root.as_os_str().is_empty() {
            return Err(StoreError::InvalidArgument("storage directory must not be empty".into()));
        }
        if config.mount.as_os_str().is_empty() {
            return Err(StoreError::InvalidArgument("mount directory must not be empty".into()));
        }
        let retry = RetryPolicy::new(config.max_retry);
        Ok(Self {
            config,
            classifier,
            retry,
        })
    }

    /// Replace the retry policy (the attempt budget still comes from the config
    /// unless overridden here).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Sharded mount path used for unrecognised content. Pure: no I/O.
    pub fn get_path(&self, id: &str) -> StoreResult<PathBuf> {
        let id = BlobId::parse(id)?;
        Ok(layout::attachment_path(&self.config.mount, &id))
    }

    /// Resolve the canonical address of `id` through its indirection record.
    pub fn resolve(&self, id: &str) -> StoreResult<Location> {
        let canonical = canonical_path(&self.config.root, id)?;
        let link = indirection_path(&canonical);
        match fs::read_to_string(&link) {
            Ok(target) => {
                let target = target.trim_end_matches(['\r', '\n']);
                if target.is_empty() {
                    return Err(StoreError::CorruptedFile {
                        path: link,
                        reason: "indirection record is empty".into(),
                    });
                }
                Ok(Location {
                    content: PathBuf::from(target),
                    canonical,
                    indirection: Some(link),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Location {
                content: canonical.clone(),
                canonical,
                indirection: None,
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn not_found(id: &str, err: io::Error) -> StoreError {
        match (err.kind(), BlobId::parse(id)) {
            (io::ErrorKind::NotFound, Ok(id)) => StoreError::NotFound(id),
            _ => StoreError::Io(err),
        }
    }
}

impl BlobStore for FileSystemStore {
    fn create(&self, id: &str, content: &[u8]) -> StoreResult<()> {
        let blob_id = BlobId::parse(id)?;
        let canonical = canonical_path(&self.config.root, id)?;
        let link = indirection_path(&canonical);

        let classification = self.classifier.classify(content);
        let mount = layout::mount_path(
            &self.config.mount,
            &blob_id,
            &classification,
            self.config.layout,
            Utc::now().date_naive(),
        );
        let target = mount.to_str().ok_or_else(|| {
            StoreError::InvalidArgument(format!("mount path is not UTF-8: {}", mount.display()))
        })?;

        // Both directory trees must exist before the first byte is written.
        self.retry.run(&mount, || {
            ensure_parent_dir(&link)?;
            ensure_parent_dir(&mount)?;
            fs::write(&mount, content)?;
            Ok(())
        })?;

        self.retry.run(&link, || {
            ensure_parent_dir(&link)?;
            fs::write(&link, target.as_bytes())?;
            Ok(())
        })?;

        debug!(
            id = %blob_id,
            size = content.len(),
            recognized = classification.recognized,
            mount = %mount.display(),
            "blob created"
        );
        Ok(())
    }

    fn read_whole(&self, id: &str) -> StoreResult<Vec<u8>> {
        let location = self.resolve(id)?;
        let content = fs::read(&location.content).map_err(|e| Self::not_found(id, e))?;
        debug!(id, path = %location.content.display(), size = content.len(), "blob read");
        Ok(content)
    }

    fn read_range(&self, id: &str, offset: u64, length: u64) -> StoreResult<Vec<u8>> {
        let location = self.resolve(id)?;
        let mut file = File::open(&location.content).map_err(|e| Self::not_found(id, e))?;
        file.seek(SeekFrom::Start(offset))?;

        let mut buffer = Vec::new();
        file.take(length).read_to_end(&mut buffer)?;

        if buffer.len() as u64 != length {
            error!(
                id,
                path = %location.content.display(),
                offset,
                length,
                read = buffer.len(),
                "short range read"
            );
            return Err(StoreError::CorruptedFile {
                path: location.content,
                reason: format!(
                    "expected {length} bytes at offset {offset}, read {}",
                    buffer.len()
                ),
            });
        }
        Ok(buffer)
    }

    fn remove(&self, id: &str) -> StoreResult<()> {
        let location = self.resolve(id)?;

        remove_file_if_exists(&location.content)?;
        if let Some(link) = &location.indirection {
            remove_file_if_exists(link)?;
        }

        prune_empty_parents(&location.content, PRUNE_LEVELS);
        if location.indirection.is_some() {
            prune_empty_parents(&location.canonical, PRUNE_LEVELS);
        }

        debug!(id, path = %location.content.display(), "blob removed");
        Ok(())
    }
}

impl std::fmt::Debug for FileSystemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystemStore")
            .field("config", &self.config)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Make sure the parent directory of `path` exists.
///
/// A plain file sitting where a directory is needed is a permanent
/// [`StoreError::DirectoryOverFile`].
fn ensure_parent_dir(path: &Path) -> StoreResult<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    match fs::metadata(parent) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(StoreError::DirectoryOverFile(parent.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(parent).map_err(|e| directory_error(parent, e))
        }
        Err(e) => Err(directory_error(parent, e)),
    }
}

fn directory_error(dir: &Path, err: io::Error) -> StoreError {
    match dir.ancestors().find(|p| p.is_file()) {
        Some(file) => StoreError::DirectoryOverFile(file.to_path_buf()),
        None => StoreError::Io(err),
    }
}

fn remove_file_if_exists(path: &Path) -> StoreResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Best-effort removal of now-empty shard directories above `path`.
fn prune_empty_parents(path: &Path, levels: usize) {
    for dir in path.ancestors().skip(1).take(levels) {
        if fs::remove_dir(dir).is_err() {
            break;
        }
    }
}
