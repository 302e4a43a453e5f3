/*!
 * Timer Service Configuration
 */

use crate::core::errors::FailureSink;
use crate::core::limits::{
    DEFAULT_TIMER_DISPATCH_WORKERS, TIMER_THREAD_NAME, TIMER_WORKER_NAME_PREFIX,
};
use std::fmt;

/// Timer service configuration
#[derive(Clone)]
pub struct TimerConfig {
    /// Threads running timer callbacks; bounds how many registrations fire concurrently
    pub dispatch_workers: usize,
    /// Name of the dispatcher thread
    pub thread_name: String,
    /// Prefix for callback worker thread names
    pub worker_name_prefix: String,
    /// Receives `TimerCallbackFailed` reports
    pub failure_sink: Option<FailureSink>,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            dispatch_workers: DEFAULT_TIMER_DISPATCH_WORKERS,
            thread_name: TIMER_THREAD_NAME.to_string(),
            worker_name_prefix: TIMER_WORKER_NAME_PREFIX.to_string(),
            failure_sink: None,
        }
    }
}

impl TimerConfig {
    pub fn with_dispatch_workers(mut self, workers: usize) -> Self {
        self.dispatch_workers = workers;
        self
    }

    pub fn with_failure_sink(mut self, sink: FailureSink) -> Self {
        self.failure_sink = Some(sink);
        self
    }
}

impl fmt::Debug for TimerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerConfig")
            .field("dispatch_workers", &self.dispatch_workers)
            .field("thread_name", &self.thread_name)
            .field("worker_name_prefix", &self.worker_name_prefix)
            .field("failure_sink", &self.failure_sink.is_some())
            .finish()
    }
}
