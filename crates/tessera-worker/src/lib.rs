//! Deferred deletion for Tessera.
//!
//! A [`DeletionWorker`] accepts removal requests on the foreground path by
//! appending them to a [`DeletionQueue`](tessera_queue::DeletionQueue), and
//! carries them out later on a dedicated background thread.
//!
//! # Lifecycle
//!
//! ```text
//! Setup --start()--> Running --stop()--> Stopped
//! ```
//!
//! `Running` is entered at most once. `Stopped` is terminal.
//!
//! # Delivery
//!
//! Entries are removed from the queue before the blob is deleted. A failed
//! removal is logged and the entry is dropped, so the worker never stalls on
//! one bad entry; a crash between dequeue and removal loses that entry too.
//! Delivery is therefore at most once.

pub mod config;
mod drain;
pub mod error;
pub mod worker;

pub use config::{RemovalFailurePolicy, WorkerConfig};
pub use error::{WorkerError, WorkerResult};
pub use worker::{DeletionWorker, WorkerState, WorkerStatistics};
