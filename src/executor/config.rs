/*!
 * Worker Pool Configuration
 *
 * Runtime configuration for pool sizing and worker thread setup
 */

use crate::core::errors::{FailureSink, PoolError, PoolResult};
use crate::core::limits::{
    DEFAULT_WORKER_COUNT, DEFAULT_WORKER_NAME_PREFIX, MAX_WORKER_COUNT, WORKERS_ENV_VAR,
};
use std::fmt;
use tracing::warn;

/// Worker pool configuration
#[derive(Clone)]
pub struct PoolConfig {
    /// Number of worker threads (fixed for the pool's lifetime, >= 1)
    pub worker_count: usize,
    /// Worker threads are named `<prefix>-<index>`
    pub thread_name_prefix: String,
    /// Stack size for worker threads; platform default when `None`
    pub stack_size: Option<usize>,
    /// Receives failures of fire-and-forget items (and of every item, for observability)
    pub failure_sink: Option<FailureSink>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let worker_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(DEFAULT_WORKER_COUNT)
            .min(MAX_WORKER_COUNT);

        Self {
            worker_count,
            thread_name_prefix: DEFAULT_WORKER_NAME_PREFIX.to_string(),
            stack_size: None,
            failure_sink: None,
        }
    }
}

impl PoolConfig {
    /// Configuration with exactly `worker_count` workers
    pub fn with_workers(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Default::default()
        }
    }

    /// One worker: items run strictly in submission order
    pub fn single_threaded() -> Self {
        Self::with_workers(1)
    }

    /// Default configuration, with the worker count overridden by `CONCUR_WORKERS`
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(WORKERS_ENV_VAR) {
            match raw.trim().parse::<usize>() {
                Ok(count) => config.worker_count = count,
                Err(e) => warn!(
                    variable = WORKERS_ENV_VAR,
                    value = %raw,
                    error = %e,
                    "Ignoring invalid worker count"
                ),
            }
        }
        config
    }

    /// Set the worker thread name prefix
    pub fn named(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    pub fn with_failure_sink(mut self, sink: FailureSink) -> Self {
        self.failure_sink = Some(sink);
        self
    }

    /// Reject worker counts outside `1..=MAX_WORKER_COUNT`
    pub fn validate(&self) -> PoolResult<()> {
        if self.worker_count == 0 || self.worker_count > MAX_WORKER_COUNT {
            return Err(PoolError::InvalidWorkerCount(self.worker_count));
        }
        Ok(())
    }
}

impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("worker_count", &self.worker_count)
            .field("thread_name_prefix", &self.thread_name_prefix)
            .field("stack_size", &self.stack_size)
            .field("failure_sink", &self.failure_sink.is_some())
            .finish()
    }
}
