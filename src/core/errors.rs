/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use super::types::{TaskId, TimerId};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Worker pool errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum PoolError {
    #[error("Worker pool is closed")]
    #[diagnostic(
        code(pool::closed),
        help("Submissions are rejected once shutdown has begun. Create a new pool.")
    )]
    PoolClosed,

    #[error("Invalid worker count: {0}")]
    #[diagnostic(
        code(pool::invalid_worker_count),
        help("A pool needs at least one worker and at most the configured maximum.")
    )]
    InvalidWorkerCount(usize),

    #[error("Invalid pool state: {0}")]
    #[diagnostic(
        code(pool::invalid_state),
        help("The operation is not allowed in the pool's current lifecycle state.")
    )]
    InvalidState(String),

    #[error("Failed to spawn worker thread: {0}")]
    #[diagnostic(
        code(pool::spawn_failed),
        help("The OS refused to create a thread. Check thread limits and memory.")
    )]
    SpawnFailed(String),
}

/// Work item outcome errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum TaskError {
    #[error("Task {task} failed: {message}")]
    #[diagnostic(
        code(task::item_failed),
        help("The work item returned an error or panicked. Other items are unaffected.")
    )]
    ItemFailed { task: TaskId, message: String },

    #[error("Task {0} was abandoned before completion")]
    #[diagnostic(
        code(task::abandoned),
        help("The work item was dropped without running, usually because its pool was torn down.")
    )]
    Abandoned(TaskId),
}

impl TaskError {
    /// Task the error belongs to
    pub fn task_id(&self) -> TaskId {
        match self {
            TaskError::ItemFailed { task, .. } => *task,
            TaskError::Abandoned(task) => *task,
        }
    }
}

/// Timer service errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum TimerError {
    #[error("Timer {timer} callback failed: {message}")]
    #[diagnostic(
        code(timer::callback_failed),
        help("The callback panicked. The registration stays active; cancel it explicitly if needed.")
    )]
    TimerCallbackFailed { timer: TimerId, message: String },

    #[error("Repeating timers need a non-zero period")]
    #[diagnostic(
        code(timer::invalid_period),
        help("Use schedule_once for a single delayed callback.")
    )]
    InvalidPeriod,

    #[error("Timer {timer} due time is beyond the clock's range")]
    #[diagnostic(
        code(timer::out_of_range),
        help("Delays and periods must keep the due time representable. Use a shorter duration.")
    )]
    OutOfRange { timer: TimerId },

    #[error("Timer service has been stopped")]
    #[diagnostic(
        code(timer::service_stopped),
        help("Registrations are rejected after shutdown. Create a new timer service.")
    )]
    ServiceStopped,

    #[error("Timer service failed to start: {0}")]
    #[diagnostic(code(timer::start_failed))]
    StartFailed(String),
}

/// Lock usage errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum LockError {
    #[error("Deadlock risk: thread already holds this mutex")]
    #[diagnostic(
        code(lock::deadlock_risk),
        help("The mutex is not reentrant. Release the outer guard before acquiring again.")
    )]
    DeadlockRisk,
}

/// Unified toolkit error type with miette diagnostics
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ToolkitError {
    #[error("Pool error: {0}")]
    #[diagnostic(transparent)]
    Pool(#[from] PoolError),

    #[error("Task error: {0}")]
    #[diagnostic(transparent)]
    Task(#[from] TaskError),

    #[error("Timer error: {0}")]
    #[diagnostic(transparent)]
    Timer(#[from] TimerError),

    #[error("Lock error: {0}")]
    #[diagnostic(transparent)]
    Lock(#[from] LockError),
}

impl ToolkitError {
    /// Stable snake_case category, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            ToolkitError::Pool(_) => "pool_error",
            ToolkitError::Task(_) => "task_error",
            ToolkitError::Timer(_) => "timer_error",
            ToolkitError::Lock(_) => "lock_error",
        }
    }
}

/// Result type for pool operations
pub type PoolResult<T> = std::result::Result<T, PoolError>;

/// Result type for a work item's outcome
pub type TaskResult<T> = std::result::Result<T, TaskError>;

/// Result type for timer operations
pub type TimerResult<T> = std::result::Result<T, TimerError>;

/// Result type spanning every subsystem
pub type ToolkitResult<T> = std::result::Result<T, ToolkitError>;

/// Receiver for failures that have no caller to return to
///
/// Invoked on the thread where the failure was captured (a worker or timer
/// callback thread). Must not block for long and must not panic.
pub type FailureSink = std::sync::Arc<dyn Fn(&ToolkitError) + Send + Sync + 'static>;
