use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use tessera_types::BlobId;

use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. Follows the same validation and range
/// semantics as [`FileSystemStore`](crate::FileSystemStore).
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<BlobId, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        match BlobId::parse(id) {
            Ok(id) => self.blobs.read().expect("lock poisoned").contains_key(&id),
            Err(_) => false,
        }
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn create(&self, id: &str, content: &[u8]) -> StoreResult<()> {
        let id = BlobId::parse(id)?;
        self.blobs
            .write()
            .expect("lock poisoned")
            .insert(id, content.to_vec());
        Ok(())
    }

    fn read_whole(&self, id: &str) -> StoreResult<Vec<u8>> {
        let id = BlobId::parse(id)?;
        let map = self.blobs.read().expect("lock poisoned");
        map.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn read_range(&self, id: &str, offset: u64, length: u64) -> StoreResult<Vec<u8>> {
        let id = BlobId::parse(id)?;
        let map = self.blobs.read().expect("lock poisoned");
        let content = map.get(&id).ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(content.len());
        let end = usize::try_from(offset.saturating_add(length))
            .unwrap_or(usize::MAX)
            .min(content.len());
        let slice = &content[start..end];
        if slice.len() as u64 != length {
            return Err(StoreError::CorruptedFile {
                path: PathBuf::from(id.as_str()),
                reason: format!(
                    "expected {length} bytes at offset {offset}, got {}",
                    slice.len()
                ),
            });
        }
        Ok(slice.to_vec())
    }

    fn remove(&self, id: &str) -> StoreResult<()> {
        let id = BlobId::parse(id)?;
        self.blobs.write().expect("lock poisoned").remove(&id);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .finish()
    }
}
