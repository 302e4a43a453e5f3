/*!
 * Worker Pool
 *
 * Fixed set of worker threads draining one FIFO submission queue.
 *
 * # Lifecycle
 *
 * `Created -> Running -> Draining -> Stopped`. Submissions are accepted while
 * Created or Running; items queued before `start` run once workers exist.
 * `shutdown` closes the queue, lets workers drain everything already
 * accepted, then joins them.
 *
 * # Failure containment
 *
 * A work item that panics or returns `Err` resolves its handle with
 * `TaskError::ItemFailed`; the worker moves on to the next item.
 */

use super::config::PoolConfig;
use super::panic;
use super::stats::{PoolCounters, PoolStats};
use super::task::{task_pair, Completer, TaskHandle};
use super::worker::{self, Job};
use crate::core::errors::{
    FailureSink, PoolError, PoolResult, TaskError, TaskResult, ToolkitError,
};
use crate::core::sync::{AtomicCell, Condvar, Mutex};
use crate::core::types::{PoolState, TaskId, WorkerId};
use crate::monitoring::span_item;
use std::fmt::Display;
use std::ops::Range;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Fixed-size thread pool with a FIFO queue
///
/// # Examples
///
/// ```
/// use concur_kit::WorkerPool;
///
/// let pool = WorkerPool::with_workers(2).unwrap();
/// let handle = pool.submit(|| 6 * 7).unwrap();
/// assert_eq!(handle.await_result(), Ok(42));
/// pool.shutdown();
/// ```
pub struct WorkerPool {
    config: PoolConfig,
    state: AtomicCell<u32>,
    /// `None` once shutdown has begun; guards enqueue against close
    sender: Mutex<Option<flume::Sender<Job>>>,
    receiver: flume::Receiver<Job>,
    workers: Mutex<Workers>,
    /// Signalled once the shutdown that closed the pool has joined its workers
    stopped: Condvar,
    next_task: AtomicCell<u64>,
    counters: Arc<PoolCounters>,
}

/// Worker bookkeeping; never held while joining
#[derive(Default)]
struct Workers {
    handles: Vec<JoinHandle<()>>,
    /// Thread ids of every worker ever started, for in-item shutdown detection
    threads: Vec<ThreadId>,
    stopped: bool,
}

impl WorkerPool {
    /// Create a pool in the `Created` state
    pub fn new(config: PoolConfig) -> PoolResult<Self> {
        config.validate()?;
        let (sender, receiver) = flume::unbounded();

        Ok(Self {
            config,
            state: AtomicCell::new(PoolState::Created.as_raw()),
            sender: Mutex::new(Some(sender)),
            receiver,
            workers: Mutex::new(Workers::default()),
            stopped: Condvar::new(),
            next_task: AtomicCell::new(0),
            counters: Arc::new(PoolCounters::default()),
        })
    }

    /// Create and start a pool with `worker_count` workers
    pub fn with_workers(worker_count: usize) -> PoolResult<Self> {
        let pool = Self::new(PoolConfig::with_workers(worker_count))?;
        pool.start()?;
        Ok(pool)
    }

    /// Start the configured number of workers (`Created -> Running`)
    pub fn start(&self) -> PoolResult<()> {
        let mut workers = self.workers.scoped_acquire();

        let observed = self
            .state
            .compare_and_exchange(PoolState::Created.as_raw(), PoolState::Running.as_raw());
        if observed != PoolState::Created.as_raw() {
            return Err(PoolError::InvalidState(format!(
                "cannot start a pool that is {}",
                PoolState::from_raw(observed)
            )));
        }

        for id in 0..self.config.worker_count {
            let name = format!("{}-{}", self.config.thread_name_prefix, id);
            let handle = worker::spawn(
                id,
                name,
                self.config.stack_size,
                self.receiver.clone(),
                self.counters.clone(),
            )?;
            workers.threads.push(handle.thread().id());
            workers.handles.push(handle);
        }

        info!(
            workers = self.config.worker_count,
            prefix = %self.config.thread_name_prefix,
            "Worker pool started"
        );
        Ok(())
    }

    /// Replace the configured worker count, then start
    pub fn start_with(&mut self, worker_count: usize) -> PoolResult<()> {
        let mut config = self.config.clone();
        config.worker_count = worker_count;
        config.validate()?;
        self.config = config;
        self.start()
    }

    /// Queue `work` and return a handle to its outcome
    ///
    /// Never blocks. Fails with `PoolError::PoolClosed` once shutdown has
    /// begun, in which case nothing is queued.
    pub fn submit<T, F>(&self, work: F) -> PoolResult<TaskHandle<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.enqueue(move || Ok(work()))
    }

    /// Queue `work` with a bound argument
    pub fn submit_with<A, T, F>(&self, arg: A, work: F) -> PoolResult<TaskHandle<T>>
    where
        A: Send + 'static,
        T: Send + Sync + 'static,
        F: FnOnce(A) -> T + Send + 'static,
    {
        self.enqueue(move || Ok(work(arg)))
    }

    /// Queue fallible `work`; an `Err` resolves the handle as `ItemFailed`
    pub fn try_submit<T, E, F>(&self, work: F) -> PoolResult<TaskHandle<T>>
    where
        T: Send + Sync + 'static,
        E: Display,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        self.enqueue(move || work().map_err(|e| e.to_string()))
    }

    /// Queue `work` without keeping a handle
    ///
    /// Failures are only visible through logs and the failure sink.
    pub fn execute<F>(&self, work: F) -> PoolResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(work).map(drop)
    }

    fn enqueue<T, F>(&self, work: F) -> PoolResult<TaskHandle<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, String> + Send + 'static,
    {
        let guard = self.sender.scoped_acquire();
        let Some(sender) = guard.as_ref() else {
            self.counters.rejected.increment();
            return Err(PoolError::PoolClosed);
        };

        let id: TaskId = self.next_task.increment();
        let (handle, completer) = task_pair(id);
        let counters = self.counters.clone();
        let sink = self.config.failure_sink.clone();

        let job: Job = Box::new(move |worker| {
            run_item(worker, work, completer, &counters, sink.as_ref());
        });

        // The pool keeps its own receiver alive, so the channel cannot be disconnected here
        if sender.send(job).is_err() {
            self.counters.rejected.increment();
            return Err(PoolError::PoolClosed);
        }

        self.counters.submitted.increment();
        debug!(task = id, "Work item queued");
        Ok(handle)
    }

    /// Block until every handle in `handles` has completed
    ///
    /// Items are neither reordered nor cancelled. Must not be called from a
    /// worker of the same pool while waiting on items queued behind it.
    pub fn wait_all<T>(&self, handles: &[TaskHandle<T>]) {
        for handle in handles {
            handle.wait();
        }
    }

    /// Like [`WorkerPool::wait_all`] with an overall deadline
    ///
    /// Returns `true` if every handle completed in time.
    pub fn wait_all_timeout<T>(&self, handles: &[TaskHandle<T>], timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        handles.iter().all(|handle| {
            let remaining = deadline.saturating_duration_since(Instant::now());
            handle.wait_timeout(remaining)
        })
    }

    /// Run `body(i)` for every `i` in `range` across the pool and wait
    ///
    /// Returns one outcome per index, in index order.
    pub fn for_each<F>(&self, range: Range<usize>, body: F) -> PoolResult<Vec<TaskResult<()>>>
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        let body = Arc::new(body);
        let handles = range
            .map(|index| {
                let body = body.clone();
                self.submit(move || body(index))
            })
            .collect::<PoolResult<Vec<_>>>()?;

        self.wait_all(&handles);
        Ok(handles.iter().map(TaskHandle::await_result).collect())
    }

    /// Stop accepting work, drain the queue and join all workers
    ///
    /// Idempotent. The call that closes the pool joins the workers; concurrent
    /// callers block until it has finished. Called from inside a work item,
    /// it returns without waiting for the calling worker, which exits once the
    /// queue is drained. Items queued on a pool that was never started are
    /// abandoned.
    pub fn shutdown(&self) {
        let previous = self.close();
        let current = thread::current().id();

        if !matches!(previous, PoolState::Created | PoolState::Running) {
            let mut workers = self.workers.scoped_acquire();
            if workers.threads.contains(&current) {
                return;
            }
            while !workers.stopped {
                self.stopped.wait(&mut workers);
            }
            return;
        }

        if previous == PoolState::Created {
            let abandoned = self.receiver.drain().count();
            if abandoned > 0 {
                warn!(abandoned, "Pool shut down before start; queued items abandoned");
            }
        } else {
            info!(queued = self.receiver.len(), "Worker pool draining");
        }

        let handles = std::mem::take(&mut self.workers.scoped_acquire().handles);
        for handle in handles {
            if handle.thread().id() == current {
                // Shutdown from inside a work item: this worker exits on its own
                continue;
            }
            if handle.join().is_err() {
                warn!("Worker thread terminated abnormally");
            }
        }

        self.state.store(PoolState::Stopped.as_raw());
        {
            let mut workers = self.workers.scoped_acquire();
            workers.stopped = true;
            self.stopped.notify_all();
        }
        info!(
            completed = self.counters.completed.load(),
            failed = self.counters.failed.load(),
            "Worker pool stopped"
        );
    }

    /// Drop the sender and advance the state; returns the state before closing
    fn close(&self) -> PoolState {
        let mut sender = self.sender.scoped_acquire();
        sender.take();

        loop {
            let current = PoolState::from_raw(self.state.load());
            let next = match current {
                PoolState::Created => PoolState::Stopped,
                PoolState::Running => PoolState::Draining,
                PoolState::Draining | PoolState::Stopped => return current,
            };
            if self.state.compare_and_exchange(current.as_raw(), next.as_raw()) == current.as_raw() {
                return current;
            }
        }
    }

    #[inline]
    pub fn state(&self) -> PoolState {
        PoolState::from_raw(self.state.load())
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.config.worker_count
    }

    /// Items waiting in the queue (not counting items being executed)
    #[inline]
    pub fn queued(&self) -> usize {
        self.receiver.len()
    }

    pub fn stats(&self) -> PoolStats {
        self.counters
            .snapshot(self.state(), self.config.worker_count, self.receiver.len())
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if self.state() != PoolState::Stopped {
            self.shutdown();
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("state", &self.state())
            .field("accepting", &self.state().accepts_work())
            .field("workers", &self.config.worker_count)
            .field("queued", &self.queued())
            .finish()
    }
}

/// Execute one item on a worker and resolve its handle
fn run_item<T, F>(
    worker: WorkerId,
    work: F,
    completer: Completer<T>,
    counters: &PoolCounters,
    sink: Option<&FailureSink>,
) where
    F: FnOnce() -> Result<T, String>,
{
    let task = completer.id();
    let outcome = {
        let span = span_item(task, worker);
        let _entered = span.enter();
        match panic::contain(work) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) | Err(message) => Err(TaskError::ItemFailed { task, message }),
        }
    };

    match &outcome {
        Ok(_) => {
            counters.completed.increment();
            debug!(task, worker, "Work item completed");
        }
        Err(error) => {
            counters.failed.increment();
            warn!(task, worker, error = %error, "Work item failed");
            if let Some(sink) = sink {
                let report = ToolkitError::Task(error.clone());
                if let Err(message) = panic::contain(|| sink(&report)) {
                    warn!(task, error = %message, "Failure sink panicked");
                }
            }
        }
    }

    completer.complete(outcome, Some(worker));
}
