use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tessera_types::{BlobId, ContentKind};
use tracing::{debug, info};

use crate::error::{QueueError, QueueResult};

/// How long SQLite waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS pending_deletions (
        seq  INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT    NOT NULL,
        kind INTEGER NOT NULL
    );
";

/// A removal that has been accepted but not yet carried out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDeletion {
    pub id: BlobId,
    pub kind: ContentKind,
}

impl PendingDeletion {
    pub fn new(id: BlobId, kind: ContentKind) -> Self {
        Self { id, kind }
    }
}

/// Crash-safe FIFO of pending deletions.
///
/// Safe for many concurrent producers and one consumer: every operation
/// runs under a single connection mutex, and each enqueue is committed
/// (with `synchronous = FULL`) before it returns.
pub struct DeletionQueue {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl DeletionQueue {
    /// Open (or create) the queue database at `path`.
    pub fn open(path: &Path) -> QueueResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| QueueError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        // journal_mode answers with the resulting mode, so it is read as a row.
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;

        let queue = Self {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
        };
        info!(path = %path.display(), pending = queue.size()?, "deletion queue opened");
        Ok(queue)
    }

    /// Append an entry. Durable once this returns `Ok`.
    pub fn enqueue(&self, id: &BlobId, kind: ContentKind) -> QueueResult<()> {
        let conn = self.conn.lock().expect("queue lock poisoned");
        conn.execute(
            "INSERT INTO pending_deletions (uuid, kind) VALUES (?1, ?2)",
            params![id.as_str(), kind.code()],
        )?;
        debug!(id = %id, kind = %kind, "deletion enqueued");
        Ok(())
    }

    /// Remove and return the oldest entry, or `None` when the queue is empty.
    ///
    /// The row is deleted in the same transaction that reads it. A row that
    /// fails to decode is still deleted and reported as [`QueueError::Row`],
    /// so one bad row cannot wedge the consumer.
    pub fn dequeue(&self) -> QueueResult<Option<PendingDeletion>> {
        let mut conn = self.conn.lock().expect("queue lock poisoned");
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let row: Option<(i64, String, i64)> = tx
            .query_row(
                "SELECT seq, uuid, kind FROM pending_deletions ORDER BY seq LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((seq, uuid, kind)) = row else {
            return Ok(None);
        };

        tx.execute("DELETE FROM pending_deletions WHERE seq = ?1", params![seq])?;
        tx.commit()?;

        let entry = PendingDeletion {
            id: BlobId::parse(&uuid)?,
            kind: ContentKind::from_code(kind)?,
        };
        debug!(seq, id = %entry.id, kind = %entry.kind, "deletion dequeued");
        Ok(Some(entry))
    }

    /// Number of entries still pending.
    pub fn size(&self) -> QueueResult<u64> {
        let conn = self.conn.lock().expect("queue lock poisoned");
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM pending_deletions", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for DeletionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionQueue")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn open_temp() -> (tempfile::TempDir, DeletionQueue) {
        let dir = tempfile::tempdir().unwrap();
        let queue = DeletionQueue::open(&dir.path().join("pending.db")).unwrap();
        (dir, queue)
    }

    #[test]
    fn dequeue_on_empty_queue_returns_none() {
        let (_dir, queue) = open_temp();
        assert_eq!(queue.dequeue().unwrap(), None);
        assert_eq!(queue.size().unwrap(), 0);
    }

    #[test]
    fn entries_come_out_in_fifo_order() {
        let (_dir, queue) = open_temp();
        let ids: Vec<BlobId> = (0..5).map(|_| BlobId::generate()).collect();
        for (i, id) in ids.iter().enumerate() {
            queue.enqueue(id, ContentKind::ALL[i % 3]).unwrap();
        }
        assert_eq!(queue.size().unwrap(), 5);

        for (i, id) in ids.iter().enumerate() {
            let entry = queue.dequeue().unwrap().unwrap();
            assert_eq!(entry, PendingDeletion::new(id.clone(), ContentKind::ALL[i % 3]));
        }
        assert_eq!(queue.dequeue().unwrap(), None);
    }

    #[test]
    fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/pending.db");
        let id = BlobId::generate();
        {
            let queue = DeletionQueue::open(&path).unwrap();
            queue.enqueue(&id, ContentKind::DerivedMetadata).unwrap();
        }

        let queue = DeletionQueue::open(&path).unwrap();
        assert_eq!(queue.size().unwrap(), 1);
        assert_eq!(
            queue.dequeue().unwrap(),
            Some(PendingDeletion::new(id, ContentKind::DerivedMetadata))
        );
    }

    #[test]
    fn dequeue_is_destructive_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending.db");
        {
            let queue = DeletionQueue::open(&path).unwrap();
            queue.enqueue(&BlobId::generate(), ContentKind::Primary).unwrap();
            queue.dequeue().unwrap().unwrap();
        }
        let queue = DeletionQueue::open(&path).unwrap();
        assert_eq!(queue.size().unwrap(), 0);
    }

    #[test]
    fn undecodable_row_is_dropped_and_reported() {
        let (_dir, queue) = open_temp();
        {
            let conn = queue.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO pending_deletions (uuid, kind) VALUES ('garbage', 1)",
                [],
            )
            .unwrap();
        }
        let good = BlobId::generate();
        queue.enqueue(&good, ContentKind::Partial).unwrap();

        assert!(matches!(queue.dequeue(), Err(QueueError::Row(_))));
        assert_eq!(
            queue.dequeue().unwrap(),
            Some(PendingDeletion::new(good, ContentKind::Partial))
        );
    }

    #[test]
    fn concurrent_producers_single_consumer_never_duplicate() {
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 50;

        let (_dir, queue) = open_temp();
        let queue = Arc::new(queue);
        let done = Arc::new(AtomicBool::new(false));

        let consumer = {
            let queue = Arc::clone(&queue);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut seen = Vec::new();
                loop {
                    match queue.dequeue().unwrap() {
                        Some(entry) => seen.push(entry.id),
                        None if done.load(Ordering::SeqCst) => {
                            if queue.size().unwrap() == 0 {
                                break;
                            }
                        }
                        None => thread::yield_now(),
                    }
                }
                seen
            })
        };

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut ids = Vec::new();
                    for _ in 0..PER_PRODUCER {
                        let id = BlobId::generate();
                        queue.enqueue(&id, ContentKind::Primary).unwrap();
                        ids.push(id);
                    }
                    ids
                })
            })
            .collect();

        let mut produced = HashSet::new();
        for handle in producers {
            produced.extend(handle.join().unwrap());
        }
        done.store(true, Ordering::SeqCst);

        let consumed = consumer.join().unwrap();
        let unique: HashSet<_> = consumed.iter().cloned().collect();
        assert_eq!(consumed.len(), unique.len(), "an entry was delivered twice");
        assert_eq!(unique, produced);
    }
}
