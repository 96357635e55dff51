//! One pass over the deletion queue.

use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use tessera_queue::{DeletionQueue, QueueError};
use tessera_store::BlobStore;
use tracing::{error, info};

use crate::config::RemovalFailurePolicy;

/// What a single drain pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct DrainReport {
    /// Entries whose blob was removed.
    pub removed: u64,
    /// Entries dropped because removal failed.
    pub failed: u64,
    /// Whether the pass ended early because a stop was requested.
    pub interrupted: bool,
}

impl DrainReport {
    pub(crate) fn processed(&self) -> u64 {
        self.removed + self.failed
    }
}

/// Dequeue and remove entries until the queue is empty or `stop` fires.
///
/// Removal failures are handled according to `on_failure`. A row that cannot
/// be decoded is dropped and counted as failed. Any other queue error ends
/// the pass; the next poll retries.
pub(crate) fn drain(
    queue: &DeletionQueue,
    store: &dyn BlobStore,
    throttle: Duration,
    on_failure: RemovalFailurePolicy,
    stop: &Receiver<()>,
) -> DrainReport {
    let mut report = DrainReport::default();

    loop {
        if stop_requested(stop) {
            report.interrupted = true;
            break;
        }

        let entry = match queue.dequeue() {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(QueueError::Row(e)) => {
                error!(error = %e, "dropping undecodable pending deletion");
                report.failed += 1;
                continue;
            }
            Err(e) => {
                error!(error = %e, "cannot read the deletion queue");
                break;
            }
        };

        if report.processed() == 0 {
            info!("processing pending deletions");
        }

        match store.remove(entry.id.as_str()) {
            Ok(()) => {
                report.removed += 1;
                info!(id = %entry.id, kind = %entry.kind, "blob removed asynchronously");
                if !throttle.is_zero() && sleep_or_stop(stop, throttle) {
                    report.interrupted = true;
                    break;
                }
            }
            Err(e) => match on_failure {
                RemovalFailurePolicy::LogAndDrop => {
                    report.failed += 1;
                    error!(
                        id = %entry.id,
                        kind = %entry.kind,
                        error = %e,
                        "cannot remove blob; entry dropped"
                    );
                }
            },
        }
    }

    if report.processed() > 0 {
        info!(
            removed = report.removed,
            failed = report.failed,
            "pending deletions processed"
        );
    }
    report
}

/// Non-blocking check for a stop request. A dropped sender counts as one.
fn stop_requested(stop: &Receiver<()>) -> bool {
    !matches!(stop.try_recv(), Err(TryRecvError::Empty))
}

/// Sleep for `duration`, waking early on a stop request. Returns `true` if
/// the sleep was cut short by a stop.
pub(crate) fn sleep_or_stop(stop: &Receiver<()>, duration: Duration) -> bool {
    !matches!(stop.recv_timeout(duration), Err(RecvTimeoutError::Timeout))
}
