/*!
 * Timer Service
 *
 * One dispatcher thread sleeps on a min-heap of due times and hands expired
 * registrations to a small callback pool.
 *
 * ## Overlap policy
 *
 * A repeating registration has at most one heap entry, and it is re-queued
 * only after its callback returns. The next due time is
 * `max(previous due + period, completion time)`, so a callback that overruns
 * its period delays the next firing instead of overlapping itself, and a
 * fast callback keeps a drift-free cadence.
 *
 * ## Cancellation
 *
 * Cancelling removes the registration from the registry and sets its flag.
 * Heap entries are deleted lazily: stale entries are skipped when popped.
 */

use super::config::TimerConfig;
use super::registration::{RegistrationShared, TimerRegistration};
use crate::core::errors::{FailureSink, TimerError, TimerResult, ToolkitError};
use crate::core::limits::TIMER_MAX_PARK;
use crate::core::sync::{AtomicCell, Condvar, Mutex};
use crate::core::types::{Millis, PoolState, TimerId};
use crate::executor::panic;
use crate::executor::{PoolConfig, WorkerPool};
use ahash::RandomState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

type Callback = Arc<dyn Fn() + Send + Sync + 'static>;

/// Registered timer owned by the service
struct TimerEntry {
    registration: Arc<RegistrationShared>,
    callback: Callback,
}

/// Heap slot; ordered so the earliest due time is on top
#[derive(Debug, PartialEq, Eq)]
struct Due {
    at: Instant,
    id: TimerId,
}

impl Ord for Due {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap; ties resolve in registration order
        other.at.cmp(&self.at).then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Due {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Schedule {
    heap: BinaryHeap<Due>,
    stopped: bool,
}

#[derive(Debug, Default)]
struct TimerCounters {
    scheduled: AtomicCell<u64>,
    fired: AtomicCell<u64>,
    failed: AtomicCell<u64>,
    cancelled: AtomicCell<u64>,
}

/// Point-in-time view of a timer service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerStats {
    /// Registrations still owned by the service
    pub active: usize,
    /// Registrations ever created
    pub scheduled: u64,
    /// Callback invocations started
    pub fired: u64,
    /// Callback invocations that panicked
    pub failed: u64,
    /// Registrations cancelled before their final firing
    pub cancelled: u64,
}

pub(crate) struct ServiceInner {
    schedule: Mutex<Schedule>,
    wakeup: Condvar,
    registry: DashMap<TimerId, Arc<TimerEntry>, RandomState>,
    callbacks: WorkerPool,
    next_id: AtomicCell<u64>,
    counters: TimerCounters,
    failure_sink: Option<FailureSink>,
}

/// Schedules one-shot and repeating callbacks on a monotonic clock
///
/// # Examples
///
/// ```
/// use concur_kit::TimerService;
/// use std::time::Duration;
///
/// let timers = TimerService::new().unwrap();
/// let registration = timers
///     .schedule_repeating(Duration::from_millis(50), || println!("tick"))
///     .unwrap();
/// std::thread::sleep(Duration::from_millis(120));
/// timers.cancel(&registration);
/// timers.shutdown();
/// ```
pub struct TimerService {
    inner: Arc<ServiceInner>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl TimerService {
    /// Start a timer service with the default configuration
    pub fn new() -> TimerResult<Self> {
        Self::with_config(TimerConfig::default())
    }

    pub fn with_config(config: TimerConfig) -> TimerResult<Self> {
        let pool_config = PoolConfig::with_workers(config.dispatch_workers)
            .named(config.worker_name_prefix.clone());
        let callbacks = WorkerPool::new(pool_config)
            .and_then(|pool| pool.start().map(|_| pool))
            .map_err(|e| TimerError::StartFailed(e.to_string()))?;

        let inner = Arc::new(ServiceInner {
            schedule: Mutex::new(Schedule {
                heap: BinaryHeap::new(),
                stopped: false,
            }),
            wakeup: Condvar::new(),
            registry: DashMap::with_hasher(RandomState::new()),
            callbacks,
            next_id: AtomicCell::new(0),
            counters: TimerCounters::default(),
            failure_sink: config.failure_sink.clone(),
        });

        let dispatcher_inner = inner.clone();
        let dispatcher = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || dispatcher_inner.run_dispatcher())
            .map_err(|e| TimerError::StartFailed(e.to_string()))?;

        info!(
            dispatch_workers = config.dispatch_workers,
            "Timer service started"
        );

        Ok(Self {
            inner,
            dispatcher: Mutex::new(Some(dispatcher)),
        })
    }

    /// Run `callback` once, `delay` after now
    ///
    /// A zero delay fires on the dispatcher's next tick.
    pub fn schedule_once<F>(&self, delay: Duration, callback: F) -> TimerResult<TimerRegistration>
    where
        F: FnOnce() + Send + 'static,
    {
        let slot = Mutex::new(Some(callback));
        let callback: Callback = Arc::new(move || {
            if let Some(callback) = slot.with(Option::take) {
                callback();
            }
        });
        self.inner.register(delay, Duration::ZERO, callback)
    }

    /// Run `callback` every `period`, the first time one period from now
    ///
    /// Firings of the same registration never overlap; see the module docs
    /// for how overruns are handled.
    pub fn schedule_repeating<F>(
        &self,
        period: Duration,
        callback: F,
    ) -> TimerResult<TimerRegistration>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if period.is_zero() {
            return Err(TimerError::InvalidPeriod);
        }
        self.inner.register(period, period, Arc::new(callback))
    }

    /// Schedule with an initial delay and an optional period, in milliseconds
    ///
    /// `period_ms == 0` schedules a one-shot timer; `delay_ms == 0` fires on
    /// the next dispatcher tick.
    pub fn schedule_at_millis<F>(
        &self,
        delay_ms: Millis,
        period_ms: Millis,
        callback: F,
    ) -> TimerResult<TimerRegistration>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.register(
            Duration::from_millis(delay_ms),
            Duration::from_millis(period_ms),
            Arc::new(callback),
        )
    }

    /// Prevent all future firings of `registration`
    ///
    /// Idempotent; a firing already in progress completes. Returns `true` if
    /// this call cancelled an active registration.
    pub fn cancel(&self, registration: &TimerRegistration) -> bool {
        self.inner.cancel(registration.id())
    }

    /// Registrations the service still owns
    pub fn active_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn stats(&self) -> TimerStats {
        let counters = &self.inner.counters;
        TimerStats {
            active: self.inner.registry.len(),
            scheduled: counters.scheduled.load(),
            fired: counters.fired.load(),
            failed: counters.failed.load(),
            cancelled: counters.cancelled.load(),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.schedule.with(|schedule| schedule.stopped)
    }

    /// Cancel everything, stop the dispatcher and wait for running callbacks
    ///
    /// Idempotent. Scheduling afterwards fails with `ServiceStopped`.
    pub fn shutdown(&self) {
        {
            let mut schedule = self.inner.schedule.scoped_acquire();
            schedule.stopped = true;
            schedule.heap.clear();
            self.inner.wakeup.notify_all();
        }

        let dispatcher = self.dispatcher.with(Option::take);
        if let Some(handle) = dispatcher {
            if handle.join().is_err() {
                warn!("Timer dispatcher terminated abnormally");
            }
        }

        for entry in self.inner.registry.iter() {
            entry.value().registration.mark_cancelled();
        }
        self.inner.registry.clear();

        if self.inner.callbacks.state() != PoolState::Stopped {
            self.inner.callbacks.shutdown();
            info!(fired = self.inner.counters.fired.load(), "Timer service stopped");
        }
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TimerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerService")
            .field("active", &self.active_count())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

impl ServiceInner {
    fn register(
        self: &Arc<Self>,
        delay: Duration,
        period: Duration,
        callback: Callback,
    ) -> TimerResult<TimerRegistration> {
        let mut schedule = self.schedule.scoped_acquire();
        if schedule.stopped {
            return Err(TimerError::ServiceStopped);
        }

        let id = self.next_id.increment();
        let Some(at) = Instant::now().checked_add(delay) else {
            warn!(timer = id, delay = ?delay, "Timer delay out of range");
            return Err(TimerError::OutOfRange { timer: id });
        };
        let registration = Arc::new(RegistrationShared::new(
            id,
            period,
            at,
            Arc::downgrade(self),
        ));

        self.registry.insert(
            id,
            Arc::new(TimerEntry {
                registration: registration.clone(),
                callback,
            }),
        );
        schedule.heap.push(Due { at, id });
        self.counters.scheduled.increment();
        self.wakeup.notify_one();

        debug!(
            timer = id,
            delay_ms = delay.as_millis() as u64,
            period_ms = period.as_millis() as u64,
            "Timer scheduled"
        );
        Ok(TimerRegistration::new(registration))
    }

    pub(crate) fn cancel(&self, id: TimerId) -> bool {
        let removed = self.registry.remove(&id);
        match removed {
            Some((_, entry)) => {
                entry.registration.mark_cancelled();
                self.counters.cancelled.increment();
                debug!(timer = id, "Timer cancelled");
                true
            }
            None => false,
        }
    }

    fn run_dispatcher(self: Arc<Self>) {
        debug!("Timer dispatcher started");

        while let Some(due) = self.next_due() {
            for entry in due {
                self.dispatch(entry);
            }
        }

        debug!("Timer dispatcher exiting");
    }

    /// Sleep until at least one entry is due; `None` once stopped
    fn next_due(&self) -> Option<Vec<Due>> {
        let mut schedule = self.schedule.scoped_acquire();

        loop {
            if schedule.stopped {
                return None;
            }

            let now = Instant::now();
            match schedule.heap.peek().map(|due| due.at) {
                Some(at) if at <= now => break,
                Some(at) => {
                    let deadline = at.min(now + TIMER_MAX_PARK);
                    self.wakeup.wait_until(&mut schedule, deadline);
                }
                None => {
                    self.wakeup.wait_for(&mut schedule, TIMER_MAX_PARK);
                }
            }
        }

        let now = Instant::now();
        let mut due = Vec::new();
        while schedule.heap.peek().is_some_and(|next| next.at <= now) {
            if let Some(next) = schedule.heap.pop() {
                due.push(next);
            }
        }
        Some(due)
    }

    fn dispatch(self: &Arc<Self>, due: Due) {
        let entry = match self.registry.get(&due.id) {
            Some(entry) => entry.value().clone(),
            // Cancelled while queued
            None => return,
        };
        if entry.registration.is_cancelled() {
            return;
        }

        let inner = self.clone();
        let scheduled = due.at;
        if let Err(e) = self.callbacks.execute(move || inner.fire(&entry, scheduled)) {
            debug!(timer = due.id, error = %e, "Timer firing dropped during shutdown");
        }
    }

    /// Runs on a callback worker
    fn fire(&self, entry: &TimerEntry, scheduled: Instant) {
        let registration = &entry.registration;
        let id = registration.id;

        // Cancellation between dispatch and start still prevents the firing
        if registration.is_cancelled() {
            return;
        }

        registration.set_next_fire(None);
        let count = registration.record_fire();
        self.counters.fired.increment();
        trace!(
            timer = id,
            firing = count,
            late_us = scheduled.elapsed().as_micros() as u64,
            "Timer firing"
        );

        if let Err(message) = panic::contain(|| (entry.callback)()) {
            self.report_failure(TimerError::TimerCallbackFailed { timer: id, message });
        }

        if registration.period.is_zero() {
            if self.registry.remove(&id).is_some() {
                debug!(timer = id, "One-shot timer retired");
            }
            return;
        }

        let Some(next) = scheduled.checked_add(registration.period) else {
            self.cancel(id);
            self.report_failure(TimerError::OutOfRange { timer: id });
            return;
        };
        let next = next.max(Instant::now());
        let mut schedule = self.schedule.scoped_acquire();
        if schedule.stopped || registration.is_cancelled() {
            return;
        }
        registration.set_next_fire(Some(next));
        schedule.heap.push(Due { at: next, id });
        self.wakeup.notify_one();
    }

    fn report_failure(&self, error: TimerError) {
        self.counters.failed.increment();
        warn!(error = %error, "Timer failure");

        if let Some(sink) = &self.failure_sink {
            let report = ToolkitError::Timer(error);
            if let Err(message) = panic::contain(|| sink(&report)) {
                warn!(error = %message, "Failure sink panicked");
            }
        }
    }
}
