//! Durable deletion queue for Tessera.
//!
//! Removal requests on the foreground path are appended here and committed
//! before the caller is answered. A single background consumer later drains
//! the queue in FIFO order. The queue is an embedded SQLite database file, so
//! pending entries survive process restarts.
//!
//! Dequeue is destructive: once an entry is handed out it is gone from the
//! file, whatever the consumer does with it.

pub mod error;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use queue::{DeletionQueue, PendingDeletion};
