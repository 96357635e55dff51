use std::io;
use std::path::PathBuf;

use tessera_types::TypeError;

/// Errors produced by the deletion queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Failure inside the embedded database.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database directory could not be prepared.
    #[error("cannot prepare queue directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A stored row could not be decoded.
    #[error("corrupt queue row: {0}")]
    Row(#[from] TypeError),
}

/// Convenience alias used throughout the queue crate.
pub type QueueResult<T> = Result<T, QueueError>;
