use std::time::Duration;

/// What the drain loop does with an entry whose blob could not be removed.
///
/// The entry has already left the queue when removal runs, so no policy can
/// retry it without re-enqueueing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RemovalFailurePolicy {
    /// Log the failure, drop the entry and continue with the next one.
    #[default]
    LogAndDrop,
}

/// Configuration for a [`DeletionWorker`](crate::DeletionWorker).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Opaque identifier of this server instance, reported in statistics and
    /// used to keep queue files apart on shared storage.
    pub node_identifier: String,
    /// Pause after each successful removal. Zero disables throttling.
    pub throttle_delay: Duration,
    /// Sleep between drains once the queue is empty.
    pub poll_interval: Duration,
    pub removal_failure: RemovalFailurePolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            node_identifier: "default".into(),
            throttle_delay: Duration::ZERO,
            poll_interval: Duration::from_secs(10),
            removal_failure: RemovalFailurePolicy::LogAndDrop,
        }
    }
}

impl WorkerConfig {
    pub fn new(node_identifier: impl Into<String>) -> Self {
        Self {
            node_identifier: node_identifier.into(),
            ..Self::default()
        }
    }

    pub fn with_throttle_delay(mut self, delay: Duration) -> Self {
        self.throttle_delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_removal_failure(mut self, policy: RemovalFailurePolicy) -> Self {
        self.removal_failure = policy;
        self
    }

    /// Default queue file name for this node: `pending-deletions.<node>.db`.
    pub fn queue_file_name(&self) -> String {
        format!("pending-deletions.{}.db", self.node_identifier)
    }
}
