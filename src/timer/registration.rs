/*!
 * Timer Registrations
 * Caller-side handle to a scheduled callback
 */

use super::service::ServiceInner;
use crate::core::sync::{AtomicCell, Mutex};
use crate::core::types::TimerId;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// State shared between a registration handle and the timer service
pub(crate) struct RegistrationShared {
    pub(crate) id: TimerId,
    /// Zero for one-shot registrations
    pub(crate) period: Duration,
    cancelled: AtomicBool,
    fired: AtomicCell<u64>,
    next_fire: Mutex<Option<Instant>>,
    service: Weak<ServiceInner>,
}

impl RegistrationShared {
    pub(crate) fn new(
        id: TimerId,
        period: Duration,
        first_fire: Instant,
        service: Weak<ServiceInner>,
    ) -> Self {
        Self {
            id,
            period,
            cancelled: AtomicBool::new(false),
            fired: AtomicCell::new(0),
            next_fire: Mutex::new(Some(first_fire)),
            service,
        }
    }

    #[inline]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Set the cancelled flag; returns `true` if this call set it
    pub(crate) fn mark_cancelled(&self) -> bool {
        let first = !self.cancelled.swap(true, Ordering::SeqCst);
        if first {
            self.set_next_fire(None);
        }
        first
    }

    pub(crate) fn record_fire(&self) -> u64 {
        self.fired.increment()
    }

    pub(crate) fn set_next_fire(&self, at: Option<Instant>) {
        *self.next_fire.scoped_acquire() = at;
    }
}

/// Handle to a one-shot or repeating timer
///
/// Clones refer to the same registration. Dropping the handle does **not**
/// cancel the timer; call [`TimerRegistration::cancel`] or
/// `TimerService::cancel`.
#[derive(Clone)]
pub struct TimerRegistration {
    shared: Arc<RegistrationShared>,
}

impl TimerRegistration {
    pub(crate) fn new(shared: Arc<RegistrationShared>) -> Self {
        Self { shared }
    }

    #[inline]
    pub fn id(&self) -> TimerId {
        self.shared.id
    }

    /// Repeat period; zero for one-shot timers
    #[inline]
    pub fn period(&self) -> Duration {
        self.shared.period
    }

    #[inline]
    pub fn is_repeating(&self) -> bool {
        !self.shared.period.is_zero()
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }

    /// Number of firings whose callback has started
    pub fn fire_count(&self) -> u64 {
        self.shared.fired.load()
    }

    /// When the next firing is due, if one is scheduled
    ///
    /// `None` after cancellation, after a one-shot fired, and while a
    /// repeating callback is running (the next firing is scheduled once it
    /// returns).
    pub fn next_fire(&self) -> Option<Instant> {
        *self.shared.next_fire.scoped_acquire()
    }

    /// Prevent all future firings; a firing already running completes
    ///
    /// Idempotent. Returns `true` if this call cancelled an active registration.
    pub fn cancel(&self) -> bool {
        match self.shared.service.upgrade() {
            Some(service) => service.cancel(self.shared.id),
            None => self.shared.mark_cancelled(),
        }
    }
}

impl fmt::Debug for TimerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerRegistration")
            .field("id", &self.shared.id)
            .field("period", &self.shared.period)
            .field("cancelled", &self.is_cancelled())
            .field("fired", &self.fire_count())
            .finish()
    }
}
