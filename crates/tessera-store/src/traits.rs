use crate::error::StoreResult;

/// Pluggable blob storage backend.
///
/// All implementations must satisfy these invariants:
/// - Identifiers are validated before any I/O; malformed ones fail with
///   `InvalidArgument`.
/// - `read_range` returns exactly `length` bytes or fails with
///   `CorruptedFile`.
/// - `remove` of an unknown identifier succeeds.
/// - Operations are synchronous and may block on I/O.
pub trait BlobStore: Send + Sync {
    /// Store `content` under `id`.
    fn create(&self, id: &str, content: &[u8]) -> StoreResult<()>;

    /// Read the whole content stored under `id`.
    fn read_whole(&self, id: &str) -> StoreResult<Vec<u8>>;

    /// Read `length` bytes starting at `offset`.
    fn read_range(&self, id: &str, offset: u64, length: u64) -> StoreResult<Vec<u8>>;

    /// Remove the content stored under `id`, if any.
    fn remove(&self, id: &str) -> StoreResult<()>;
}
