use std::io;
use std::path::PathBuf;

use tessera_types::{BlobId, TypeError};

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Malformed identifier or configuration value. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A path component that must be a directory exists as a plain file.
    #[error("path component exists as a file: {}", .0.display())]
    DirectoryOverFile(PathBuf),

    /// A transient I/O failure persisted after the whole retry budget.
    #[error("I/O on {} still failing after {attempts} attempts: {source}", .path.display())]
    Transient {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    /// Stored data does not match what the caller was promised.
    #[error("corrupted file {}: {reason}", .path.display())]
    CorruptedFile { path: PathBuf, reason: String },

    /// No content is stored for the identifier.
    #[error("blob not found: {0}")]
    NotFound(BlobId),

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Unclassified failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Whether this error may clear up if the operation is simply re-attempted.
    ///
    /// Contended directory creation and removal surface as these kinds, e.g.
    /// a concurrent deletion pruning a shard directory this call just made.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::NotFound
                    | io::ErrorKind::AlreadyExists
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_contention_kinds_are_transient() {
        let transient = StoreError::Io(io::Error::from(io::ErrorKind::NotFound));
        assert!(transient.is_transient());

        let denied = StoreError::Io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(!denied.is_transient());

        assert!(!StoreError::DirectoryOverFile(PathBuf::from("/x")).is_transient());
        assert!(!StoreError::InvalidArgument("bad".into()).is_transient());
    }

    #[test]
    fn type_errors_become_invalid_argument() {
        let err: StoreError = TypeError::InvalidBlobId("x".into()).into();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }
}
