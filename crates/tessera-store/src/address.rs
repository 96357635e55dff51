//! Pure identifier-to-path mapping. Nothing in this module touches the
//! filesystem.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tessera_types::BlobId;

use crate::error::{StoreError, StoreResult};

/// Suffix appended to the canonical address to name the indirection record.
pub const INDIRECTION_SUFFIX: &str = ".link";

/// Returns `true` iff `id` has UUID syntax.
pub fn validate(id: &str) -> bool {
    BlobId::is_valid(id)
}

/// `base/id[0:2]/id[2:4]/id`.
pub fn sharded_path(base: &Path, id: &BlobId) -> PathBuf {
    let (first, second) = id.shards();
    base.join(first).join(second).join(id.as_str())
}

/// Canonical address of `id` under `root`.
///
/// Fails with [`StoreError::InvalidArgument`] if `root` is empty or `id` is
/// not a valid UUID.
pub fn canonical_path(root: &Path, id: &str) -> StoreResult<PathBuf> {
    if root.as_os_str().is_empty() {
        return Err(StoreError::InvalidArgument("storage root is empty".into()));
    }
    let id = BlobId::parse(id)?;
    Ok(sharded_path(root, &id))
}

/// Path of the indirection record belonging to a canonical address.
pub fn indirection_path(canonical: &Path) -> PathBuf {
    let mut name = OsString::from(canonical.as_os_str());
    name.push(INDIRECTION_SUFFIX);
    PathBuf::from(name)
}
