use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use tessera_queue::DeletionQueue;
use tessera_store::BlobStore;
use tessera_types::{BlobId, ContentKind};
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::drain::{drain, sleep_or_stop};
use crate::error::{WorkerError, WorkerResult};

/// Lifecycle of a [`DeletionWorker`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    Setup,
    Running,
    Stopped,
}

/// Read-only snapshot reported to the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerStatistics {
    pub pending_count: u64,
    pub node_identifier: String,
}

/// Owner-side handles of the background thread.
struct Control {
    state: WorkerState,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

/// Background deletion worker.
///
/// `start` and `stop` are expected to come from a single control thread.
/// `enqueue` and `statistics` may be called from any number of threads at
/// any time; the queue does its own serialization.
pub struct DeletionWorker {
    queue: Arc<DeletionQueue>,
    store: Arc<dyn BlobStore>,
    config: WorkerConfig,
    control: Mutex<Control>,
}

impl DeletionWorker {
    pub fn new(store: Arc<dyn BlobStore>, queue: Arc<DeletionQueue>, config: WorkerConfig) -> Self {
        Self {
            queue,
            store,
            config,
            control: Mutex::new(Control {
                state: WorkerState::Setup,
                stop_tx: None,
                handle: None,
            }),
        }
    }

    /// Open the queue file at `queue_path` and build a worker around it.
    pub fn open(
        store: Arc<dyn BlobStore>,
        queue_path: &Path,
        config: WorkerConfig,
    ) -> WorkerResult<Self> {
        info!(
            path = %queue_path.display(),
            node = %config.node_identifier,
            "opening deletion queue"
        );
        let queue = DeletionQueue::open(queue_path)?;
        Ok(Self::new(store, Arc::new(queue), config))
    }

    pub fn state(&self) -> WorkerState {
        self.control.lock().expect("worker lock poisoned").state
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<DeletionQueue> {
        &self.queue
    }

    /// Launch the background loop. Only valid from [`WorkerState::Setup`].
    pub fn start(&self) -> WorkerResult<()> {
        let mut control = self.control.lock().expect("worker lock poisoned");
        if control.state != WorkerState::Setup {
            return Err(WorkerError::BadSequenceOfCalls {
                operation: "start",
                state: control.state,
            });
        }

        info!(
            node = %self.config.node_identifier,
            poll_ms = self.config.poll_interval.as_millis() as u64,
            throttle_ms = self.config.throttle_delay.as_millis() as u64,
            "starting deletion worker"
        );

        let (stop_tx, stop_rx) = mpsc::channel();
        let queue = Arc::clone(&self.queue);
        let store = Arc::clone(&self.store);
        let config = self.config.clone();
        let handle = thread::Builder::new()
            .name("tessera-deletion".into())
            .spawn(move || run(&queue, store.as_ref(), &config, &stop_rx))
            .map_err(WorkerError::Spawn)?;

        control.state = WorkerState::Running;
        control.stop_tx = Some(stop_tx);
        control.handle = Some(handle);
        Ok(())
    }

    /// Stop the background loop and wait for it to exit.
    ///
    /// A removal already in flight is allowed to finish. No-op unless the
    /// worker is running.
    pub fn stop(&self) {
        let mut control = self.control.lock().expect("worker lock poisoned");
        if control.state != WorkerState::Running {
            debug!(state = ?control.state, "stop ignored; worker not running");
            return;
        }

        info!("stopping deletion worker");
        control.state = WorkerState::Stopped;
        if let Some(stop_tx) = control.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = control.handle.take() {
            if handle.join().is_err() {
                error!("deletion thread panicked");
            }
        }
        info!("deletion worker stopped");
    }

    /// Schedule `id` for deletion. Durable once this returns `Ok`.
    pub fn enqueue(&self, id: &BlobId, kind: ContentKind) -> WorkerResult<()> {
        info!(id = %id, kind = %kind, "scheduling delayed deletion");
        self.queue.enqueue(id, kind)?;
        Ok(())
    }

    pub fn statistics(&self) -> WorkerResult<WorkerStatistics> {
        Ok(WorkerStatistics {
            pending_count: self.queue.size()?,
            node_identifier: self.config.node_identifier.clone(),
        })
    }
}

impl Drop for DeletionWorker {
    fn drop(&mut self) {
        if self.state() == WorkerState::Running {
            warn!("deletion worker dropped while running; stop() should be called explicitly");
            self.stop();
        }
    }
}

impl std::fmt::Debug for DeletionWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeletionWorker")
            .field("queue", &self.queue)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

/// Background loop: drain, then sleep one poll interval, until stopped.
fn run(queue: &DeletionQueue, store: &dyn BlobStore, config: &WorkerConfig, stop: &Receiver<()>) {
    debug!("deletion thread running");
    loop {
        let report = drain(
            queue,
            store,
            config.throttle_delay,
            config.removal_failure,
            stop,
        );
        if report.interrupted || sleep_or_stop(stop, config.poll_interval) {
            break;
        }
    }
    debug!("deletion thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::{Duration, Instant};
    use tessera_store::{InMemoryBlobStore, StoreResult};

    const FAST_POLL: Duration = Duration::from_millis(20);

    /// In-memory store that counts removals per id.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryBlobStore,
        removals: Mutex<HashMap<String, usize>>,
    }

    impl BlobStore for CountingStore {
        fn create(&self, id: &str, content: &[u8]) -> StoreResult<()> {
            self.inner.create(id, content)
        }
        fn read_whole(&self, id: &str) -> StoreResult<Vec<u8>> {
            self.inner.read_whole(id)
        }
        fn read_range(&self, id: &str, offset: u64, length: u64) -> StoreResult<Vec<u8>> {
            self.inner.read_range(id, offset, length)
        }
        fn remove(&self, id: &str) -> StoreResult<()> {
            *self.removals.lock().unwrap().entry(id.to_string()).or_default() += 1;
            self.inner.remove(id)
        }
    }

    fn worker_with(store: Arc<dyn BlobStore>, dir: &Path, poll: Duration) -> DeletionWorker {
        let config = WorkerConfig::new("node-1").with_poll_interval(poll);
        DeletionWorker::open(store, &dir.join(config.queue_file_name()), config).unwrap()
    }

    fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    #[test]
    fn starts_in_setup_state() {
        let dir = tempfile::tempdir().unwrap();
        let worker = worker_with(Arc::new(InMemoryBlobStore::new()), dir.path(), FAST_POLL);
        assert_eq!(worker.state(), WorkerState::Setup);
    }

    #[test]
    fn start_twice_is_bad_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let worker = worker_with(Arc::new(InMemoryBlobStore::new()), dir.path(), FAST_POLL);
        worker.start().unwrap();
        assert_eq!(worker.state(), WorkerState::Running);

        let err = worker.start().unwrap_err();
        assert!(matches!(
            err,
            WorkerError::BadSequenceOfCalls { operation: "start", state: WorkerState::Running }
        ));
        worker.stop();
    }

    #[test]
    fn stop_is_idempotent_and_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let worker = worker_with(Arc::new(InMemoryBlobStore::new()), dir.path(), FAST_POLL);

        worker.stop();
        assert_eq!(worker.state(), WorkerState::Setup);

        worker.start().unwrap();
        worker.stop();
        assert_eq!(worker.state(), WorkerState::Stopped);
        worker.stop();
        assert_eq!(worker.state(), WorkerState::Stopped);

        assert!(matches!(
            worker.start(),
            Err(WorkerError::BadSequenceOfCalls { state: WorkerState::Stopped, .. })
        ));
    }

    #[test]
    fn drains_enqueued_items_within_a_poll_interval() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryBlobStore::new());
        let worker = worker_with(store.clone(), dir.path(), FAST_POLL);

        worker.start().unwrap();
        for _ in 0..10 {
            let id = BlobId::generate();
            store.create(id.as_str(), b"payload").unwrap();
            worker.enqueue(&id, ContentKind::Primary).unwrap();
        }

        assert!(wait_until(Duration::from_secs(5), || {
            worker.statistics().unwrap().pending_count == 0 && store.is_empty()
        }));
        worker.stop();
    }

    #[test]
    fn statistics_report_pending_and_node() {
        let dir = tempfile::tempdir().unwrap();
        let worker = worker_with(Arc::new(InMemoryBlobStore::new()), dir.path(), FAST_POLL);
        worker.enqueue(&BlobId::generate(), ContentKind::Partial).unwrap();
        worker.enqueue(&BlobId::generate(), ContentKind::Primary).unwrap();

        let stats = worker.statistics().unwrap();
        assert_eq!(
            stats,
            WorkerStatistics {
                pending_count: 2,
                node_identifier: "node-1".into()
            }
        );
    }

    #[test]
    fn stop_interrupts_long_poll_promptly() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryBlobStore::new());
        let worker = worker_with(store, dir.path(), Duration::from_secs(60));
        worker.start().unwrap();
        thread::sleep(Duration::from_millis(20));

        let started = Instant::now();
        worker.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn pending_entries_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryBlobStore::new());
        let id = BlobId::generate();
        store.create(id.as_str(), b"x").unwrap();

        {
            let worker = worker_with(store.clone(), dir.path(), FAST_POLL);
            worker.enqueue(&id, ContentKind::Primary).unwrap();
        }

        let worker = worker_with(store.clone(), dir.path(), FAST_POLL);
        assert_eq!(worker.statistics().unwrap().pending_count, 1);
        worker.start().unwrap();
        assert!(wait_until(Duration::from_secs(5), || store.is_empty()));
        worker.stop();
    }

    #[test]
    fn drop_stops_running_worker() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryBlobStore::new());
        let worker = worker_with(store, dir.path(), Duration::from_secs(60));
        worker.start().unwrap();

        let started = Instant::now();
        drop(worker);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn concurrent_enqueue_while_draining_removes_each_entry_once() {
        const THREADS: usize = 4;
        const PER_THREAD: usize = 25;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CountingStore::default());
        let worker = Arc::new(worker_with(store.clone(), dir.path(), Duration::from_millis(5)));
        worker.start().unwrap();

        let producers: Vec<_> = (0..THREADS)
            .map(|_| {
                let worker = Arc::clone(&worker);
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let mut ids = Vec::new();
                    for _ in 0..PER_THREAD {
                        let id = BlobId::generate();
                        store.create(id.as_str(), b"x").unwrap();
                        worker.enqueue(&id, ContentKind::Primary).unwrap();
                        ids.push(id.to_string());
                    }
                    ids
                })
            })
            .collect();

        let mut produced = Vec::new();
        for handle in producers {
            produced.extend(handle.join().unwrap());
        }

        assert!(wait_until(Duration::from_secs(10), || {
            worker.statistics().unwrap().pending_count == 0 && store.inner.is_empty()
        }));
        worker.stop();

        let removals = store.removals.lock().unwrap();
        assert_eq!(removals.len(), THREADS * PER_THREAD);
        for id in &produced {
            assert_eq!(removals.get(id), Some(&1), "entry {id} not removed exactly once");
        }
    }
}
