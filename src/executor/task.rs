/*!
 * Task Handles
 *
 * Completion handle for a submitted work item. The submitter keeps a
 * `TaskHandle`; the worker that runs the item holds the matching
 * `Completer` and resolves it exactly once.
 */

use super::panic;
use crate::core::errors::{TaskError, TaskResult};
use crate::core::sync::{Condvar, Mutex};
use crate::core::types::{TaskId, WorkerId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};
use tracing::warn;

type Continuation<T> = Box<dyn FnOnce(&TaskResult<T>) + Send + 'static>;

/// Coarse view of a task's progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Succeeded,
    Failed,
}

/// Bookkeeping mutated on completion and while registering waiters
struct Waiters<T> {
    completed: bool,
    completed_by: Option<WorkerId>,
    continuations: Vec<Continuation<T>>,
    wakers: Vec<Waker>,
}

struct TaskShared<T> {
    id: TaskId,
    /// Written once; immutable afterwards
    outcome: OnceLock<TaskResult<T>>,
    waiters: Mutex<Waiters<T>>,
    done: Condvar,
}

/// Handle to the outcome of one work item
///
/// Cheap to clone; every clone observes the same outcome. Reading the
/// outcome never re-runs the item.
pub struct TaskHandle<T> {
    shared: Arc<TaskShared<T>>,
}

/// Write side of a task; dropping it unresolved marks the task abandoned
pub(crate) struct Completer<T> {
    shared: Arc<TaskShared<T>>,
    resolved: bool,
}

/// Create a linked handle/completer pair for task `id`
pub(crate) fn task_pair<T>(id: TaskId) -> (TaskHandle<T>, Completer<T>) {
    let shared = Arc::new(TaskShared {
        id,
        outcome: OnceLock::new(),
        waiters: Mutex::new(Waiters {
            completed: false,
            completed_by: None,
            continuations: Vec::new(),
            wakers: Vec::new(),
        }),
        done: Condvar::new(),
    });

    (
        TaskHandle {
            shared: shared.clone(),
        },
        Completer {
            shared,
            resolved: false,
        },
    )
}

impl<T> Completer<T> {
    /// Id of the task this completer resolves
    pub(crate) fn id(&self) -> TaskId {
        self.shared.id
    }

    /// Publish the outcome, wake blocked callers and run continuations
    ///
    /// Continuations run on the calling thread, after the waiters lock has
    /// been released.
    pub(crate) fn complete(mut self, outcome: TaskResult<T>, worker: Option<WorkerId>) {
        self.resolved = true;
        resolve(&self.shared, outcome, worker);
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if !self.resolved {
            let id = self.shared.id;
            resolve(&self.shared, Err(TaskError::Abandoned(id)), None);
        }
    }
}

fn resolve<T>(shared: &TaskShared<T>, outcome: TaskResult<T>, worker: Option<WorkerId>) {
    if shared.outcome.set(outcome).is_err() {
        return;
    }

    let (continuations, wakers) = {
        let mut waiters = shared.waiters.scoped_acquire();
        waiters.completed = true;
        waiters.completed_by = worker;
        shared.done.notify_all();
        (
            std::mem::take(&mut waiters.continuations),
            std::mem::take(&mut waiters.wakers),
        )
    };

    for waker in wakers {
        waker.wake();
    }

    if let Some(outcome) = shared.outcome.get() {
        for continuation in continuations {
            run_continuation(shared.id, continuation, outcome);
        }
    }
}

fn run_continuation<T>(task: TaskId, continuation: Continuation<T>, outcome: &TaskResult<T>) {
    if let Err(message) = panic::contain(|| continuation(outcome)) {
        warn!(task, error = %message, "task continuation panicked");
    }
}

impl<T> TaskHandle<T> {
    #[inline]
    pub fn id(&self) -> TaskId {
        self.shared.id
    }

    /// Whether the item has finished (successfully or not)
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.shared.outcome.get().is_some()
    }

    pub fn status(&self) -> TaskStatus {
        match self.shared.outcome.get() {
            None => TaskStatus::Pending,
            Some(Ok(_)) => TaskStatus::Succeeded,
            Some(Err(_)) => TaskStatus::Failed,
        }
    }

    /// Worker that completed the item, once complete
    ///
    /// `None` while pending, and for abandoned items that never ran.
    pub fn completed_by(&self) -> Option<WorkerId> {
        self.shared.waiters.with(|waiters| waiters.completed_by)
    }

    /// Block until the item has completed
    pub fn wait(&self) {
        let mut waiters = self.shared.waiters.scoped_acquire();
        while !waiters.completed {
            self.shared.done.wait(&mut waiters);
        }
    }

    /// Block until the item has completed or `timeout` elapses
    ///
    /// Returns `true` if the item completed in time.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut waiters = self.shared.waiters.scoped_acquire();
        while !waiters.completed {
            if self.shared.done.wait_until(&mut waiters, deadline) {
                return waiters.completed;
            }
        }
        true
    }

    /// Borrow the outcome without blocking
    pub fn outcome(&self) -> Option<&TaskResult<T>> {
        self.shared.outcome.get()
    }

    /// Register `continuation` to run exactly once with the outcome
    ///
    /// If the item is still pending, the continuation runs on the worker
    /// that completes it. If it has already completed, the continuation runs
    /// immediately on the calling thread. A panicking continuation is logged
    /// and does not affect the worker.
    pub fn on_complete<F>(&self, continuation: F)
    where
        F: FnOnce(&TaskResult<T>) + Send + 'static,
    {
        let continuation: Continuation<T> = Box::new(continuation);
        {
            let mut waiters = self.shared.waiters.scoped_acquire();
            if !waiters.completed {
                waiters.continuations.push(continuation);
                return;
            }
        }

        if let Some(outcome) = self.shared.outcome.get() {
            run_continuation(self.shared.id, continuation, outcome);
        }
    }
}

impl<T: Clone> TaskHandle<T> {
    /// Block until the item completes and return its outcome
    ///
    /// Repeated calls return the same outcome.
    pub fn await_result(&self) -> TaskResult<T> {
        self.wait();
        self.cloned_outcome()
    }

    /// Like [`TaskHandle::await_result`] with an upper bound on the wait
    pub fn await_timeout(&self, timeout: Duration) -> Option<TaskResult<T>> {
        if self.wait_timeout(timeout) {
            Some(self.cloned_outcome())
        } else {
            None
        }
    }

    /// Outcome if already complete, without blocking
    pub fn try_result(&self) -> Option<TaskResult<T>> {
        self.shared.outcome.get().cloned()
    }

    fn cloned_outcome(&self) -> TaskResult<T> {
        match self.shared.outcome.get() {
            Some(outcome) => outcome.clone(),
            // `completed` is only set after the outcome cell is filled
            None => Err(TaskError::Abandoned(self.shared.id)),
        }
    }
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.shared.id)
            .field("status", &self.status())
            .finish()
    }
}

/// Awaiting a handle suspends the async caller until a worker completes the item
impl<T: Clone> Future for TaskHandle<T> {
    type Output = TaskResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.shared.outcome.get() {
            return Poll::Ready(outcome.clone());
        }

        {
            let mut waiters = self.shared.waiters.scoped_acquire();
            if !waiters.completed {
                if !waiters.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    waiters.wakers.push(cx.waker().clone());
                }
                return Poll::Pending;
            }
        }

        Poll::Ready(self.cloned_outcome())
    }
}
