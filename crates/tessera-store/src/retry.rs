use std::path::Path;
use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::{StoreError, StoreResult};

/// Bounded retry with jittered linear backoff for transient I/O failures.
///
/// Only errors for which [`StoreError::is_transient`] holds are retried;
/// anything else is returned from the first failing attempt.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Never below 1.
    pub max_attempts: u32,
    /// Backoff unit. Attempt `n` sleeps `n * base_delay` plus up to one
    /// `base_delay` of jitter.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(20),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Run `op` until it succeeds, fails permanently, or the budget is spent.
    ///
    /// `path` names the file the operation targets and is reported when the
    /// budget is exhausted.
    pub fn run<T, F>(&self, path: &Path, mut op: F) -> StoreResult<T>
    where
        F: FnMut() -> StoreResult<T>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => {
                    if attempt >= max_attempts {
                        return Err(exhausted(err, path, attempt));
                    }
                    let delay = self.backoff(attempt);
                    warn!(
                        path = %path.display(),
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "transient I/O failure; retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let jitter = if base > 0 {
            rand::thread_rng().gen_range(0..base)
        } else {
            0
        };
        Duration::from_millis(base * u64::from(attempt) + jitter)
    }
}

fn exhausted(err: StoreError, path: &Path, attempts: u32) -> StoreError {
    match err {
        StoreError::Io(source) => StoreError::Transient {
            path: path.to_path_buf(),
            attempts,
            source,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io;
    use std::path::PathBuf;

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts).with_base_delay(Duration::from_millis(1))
    }

    fn transient() -> StoreError {
        StoreError::Io(io::Error::from(io::ErrorKind::NotFound))
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let result = quick(3).run(Path::new("/x"), || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(transient())
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn exhausted_budget_surfaces_transient_error() {
        let calls = Cell::new(0);
        let result: StoreResult<()> = quick(3).run(Path::new("/x/y"), || {
            calls.set(calls.get() + 1);
            Err(transient())
        });
        assert_eq!(calls.get(), 3);
        match result.unwrap_err() {
            StoreError::Transient { path, attempts, .. } => {
                assert_eq!(path, PathBuf::from("/x/y"));
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: StoreResult<()> = quick(5).run(Path::new("/x"), || {
            calls.set(calls.get() + 1);
            Err(StoreError::DirectoryOverFile(PathBuf::from("/x")))
        });
        assert!(matches!(result, Err(StoreError::DirectoryOverFile(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn non_transient_io_is_not_retried() {
        let calls = Cell::new(0);
        let result: StoreResult<()> = quick(5).run(Path::new("/x"), || {
            calls.set(calls.get() + 1);
            Err(StoreError::Io(io::Error::from(io::ErrorKind::PermissionDenied)))
        });
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn zero_attempts_still_runs_once() {
        let calls = Cell::new(0);
        let _ = RetryPolicy::new(0).run(Path::new("/x"), || {
            calls.set(calls.get() + 1);
            Ok(())
        });
        assert_eq!(calls.get(), 1);
    }
}
