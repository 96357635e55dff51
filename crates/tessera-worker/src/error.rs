use std::io;

use tessera_queue::QueueError;

use crate::worker::WorkerState;

/// Errors produced by the deletion worker.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// A lifecycle transition was requested from the wrong state.
    #[error("bad sequence of calls: cannot {operation} while {state:?}")]
    BadSequenceOfCalls {
        operation: &'static str,
        state: WorkerState,
    },

    /// The durable queue rejected the operation.
    #[error("deletion queue error: {0}")]
    Queue(#[from] QueueError),

    /// The background thread could not be started.
    #[error("cannot spawn deletion thread: {0}")]
    Spawn(#[source] io::Error),
}

pub type WorkerResult<T> = Result<T, WorkerError>;
