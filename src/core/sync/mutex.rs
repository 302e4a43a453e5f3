/*!
 * Scoped Mutex
 *
 * Non-reentrant mutual exclusion built on parking_lot, with owner tracking
 * for best-effort detection of same-thread re-acquisition.
 */

use super::atomic::AtomicCell;
use crate::core::errors::LockError;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Owner value meaning "nobody holds the lock"
const NO_OWNER: u64 = 0;

static NEXT_THREAD_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TOKEN: u64 = NEXT_THREAD_TOKEN.fetch_add(1, Ordering::Relaxed);
}

/// Process-unique token for the calling thread (never `NO_OWNER`)
#[inline]
fn current_thread_token() -> u64 {
    THREAD_TOKEN.with(|token| *token)
}

/// Mutual exclusion lock guarding a value of type `T`
///
/// Access only goes through [`MutexGuard`], which releases the lock when it
/// is dropped on every exit path, panics included. parking_lot does not
/// poison, so a panic inside a critical section leaves the lock usable.
///
/// The lock is **not** reentrant: calling [`Mutex::acquire`] again from the
/// thread that already holds it deadlocks. Use [`Mutex::acquire_checked`]
/// where re-entry is possible to get [`LockError::DeadlockRisk`] instead.
///
/// # Examples
///
/// ```
/// use concur_kit::Mutex;
///
/// let counter = Mutex::new(0_u32);
/// {
///     let mut guard = counter.scoped_acquire();
///     *guard += 1;
/// } // released here
/// assert_eq!(counter.with(|value| *value), 1);
/// ```
pub struct Mutex<T: ?Sized> {
    owner: AtomicCell<u64>,
    inner: parking_lot::Mutex<T>,
}

impl<T> Mutex<T> {
    /// Create an unowned mutex around `value`
    pub fn new(value: T) -> Self {
        Self {
            owner: AtomicCell::new(NO_OWNER),
            inner: parking_lot::Mutex::new(value),
        }
    }

    /// Consume the mutex and return the guarded value
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T: ?Sized> Mutex<T> {
    /// Block until the lock is obtained
    ///
    /// Equivalent to [`Mutex::scoped_acquire`]; the returned guard is the
    /// only way to reach the data and the only way to release the lock.
    #[inline]
    pub fn acquire(&self) -> MutexGuard<'_, T> {
        self.scoped_acquire()
    }

    /// Block until the lock is obtained and return a releasing guard
    pub fn scoped_acquire(&self) -> MutexGuard<'_, T> {
        let inner = self.inner.lock();
        self.owner.store(current_thread_token());
        MutexGuard { owner: &self.owner, inner }
    }

    /// Acquire, failing instead of deadlocking when this thread already holds the lock
    ///
    /// Detection only covers the calling thread's own guard; lock-order
    /// inversions between different mutexes are not detected.
    pub fn acquire_checked(&self) -> Result<MutexGuard<'_, T>, LockError> {
        if self.owner.load() == current_thread_token() {
            return Err(LockError::DeadlockRisk);
        }
        Ok(self.scoped_acquire())
    }

    /// Acquire only if the lock is free right now
    pub fn try_acquire(&self) -> Option<MutexGuard<'_, T>> {
        let inner = self.inner.try_lock()?;
        self.owner.store(current_thread_token());
        Some(MutexGuard { owner: &self.owner, inner })
    }

    /// Acquire with an upper bound on the wait
    pub fn try_acquire_for(&self, timeout: Duration) -> Option<MutexGuard<'_, T>> {
        let inner = self.inner.try_lock_for(timeout)?;
        self.owner.store(current_thread_token());
        Some(MutexGuard { owner: &self.owner, inner })
    }

    /// Run `f` as a critical section over the guarded value
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.scoped_acquire();
        f(&mut guard)
    }

    /// Whether some thread currently holds the lock
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    /// Whether the calling thread holds the lock
    #[inline]
    pub fn is_held_by_current_thread(&self) -> bool {
        self.owner.load() == current_thread_token()
    }

    /// Mutable access without locking; the borrow checker proves exclusivity
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_lock() {
            Some(guard) => f.debug_struct("Mutex").field("data", &&*guard).finish(),
            None => f.debug_struct("Mutex").field("data", &"<locked>").finish(),
        }
    }
}

/// Proof of ownership of a [`Mutex`]; releases the lock on drop
#[must_use = "the mutex is released as soon as the guard is dropped"]
pub struct MutexGuard<'a, T: ?Sized> {
    owner: &'a AtomicCell<u64>,
    inner: parking_lot::MutexGuard<'a, T>,
}

impl<T: ?Sized> Deref for MutexGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized> DerefMut for MutexGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T: ?Sized> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        // Cleared while still holding the lock; `inner` unlocks right after
        self.owner.store(NO_OWNER);
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for MutexGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// Condition variable paired with [`MutexGuard`]
///
/// Waiting releases the mutex (and its owner record) and re-acquires both
/// before returning. Spurious wakeups are possible; callers re-check their
/// predicate in a loop.
#[derive(Debug, Default)]
pub struct Condvar {
    inner: parking_lot::Condvar,
}

impl Condvar {
    pub fn new() -> Self {
        Self {
            inner: parking_lot::Condvar::new(),
        }
    }

    /// Block until notified
    pub fn wait<T: ?Sized>(&self, guard: &mut MutexGuard<'_, T>) {
        guard.owner.store(NO_OWNER);
        self.inner.wait(&mut guard.inner);
        guard.owner.store(current_thread_token());
    }

    /// Block until notified or `deadline` passes; returns `true` on timeout
    pub fn wait_until<T: ?Sized>(&self, guard: &mut MutexGuard<'_, T>, deadline: Instant) -> bool {
        guard.owner.store(NO_OWNER);
        let result = self.inner.wait_until(&mut guard.inner, deadline);
        guard.owner.store(current_thread_token());
        result.timed_out()
    }

    /// Block until notified or `timeout` elapses; returns `true` on timeout
    pub fn wait_for<T: ?Sized>(&self, guard: &mut MutexGuard<'_, T>, timeout: Duration) -> bool {
        self.wait_until(guard, Instant::now() + timeout)
    }

    #[inline]
    pub fn notify_one(&self) -> bool {
        self.inner.notify_one()
    }

    #[inline]
    pub fn notify_all(&self) -> usize {
        self.inner.notify_all()
    }
}
