/*!
 * Mutex Tests
 * Mutual exclusion, release on every exit path, and condvar handoff
 */

use concur_kit::{AtomicCell, Condvar, LockError, Mutex};
use pretty_assertions::assert_eq;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_at_most_one_thread_inside() {
    let lock = Arc::new(Mutex::new(0_u64));
    let inside = Arc::new(AtomicCell::new(0_u32));
    let max_inside = Arc::new(AtomicCell::new(0_u32));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let lock = lock.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    let mut guard = lock.scoped_acquire();
                    let now = inside.increment();
                    if now > max_inside.load() {
                        max_inside.store(now);
                    }
                    *guard += 1;
                    inside.decrement();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(max_inside.load(), 1);
    assert_eq!(*lock.acquire(), 4000);
}

#[test]
fn test_released_when_critical_section_panics() {
    let lock = Arc::new(Mutex::new(Vec::<u32>::new()));

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut guard = lock.scoped_acquire();
        guard.push(1);
        panic!("failure inside critical section");
    }));
    assert!(result.is_err());

    // No poisoning: the lock is free and the data is reachable
    assert!(!lock.is_locked());
    let guard = lock.try_acquire().expect("lock should be free after panic");
    assert_eq!(*guard, vec![1]);
}

#[test]
fn test_reacquire_on_same_thread_reports_deadlock_risk() {
    let lock = Mutex::new(());
    let _outer = lock.scoped_acquire();

    assert!(lock.is_held_by_current_thread());
    assert_eq!(lock.acquire_checked().unwrap_err(), LockError::DeadlockRisk);
}

#[test]
fn test_checked_acquire_after_release() {
    let lock = Mutex::new(5);
    drop(lock.scoped_acquire());
    assert!(!lock.is_held_by_current_thread());
    assert_eq!(*lock.acquire_checked().unwrap(), 5);
}

#[test]
fn test_try_acquire_fails_while_held_elsewhere() {
    let lock = Arc::new(Mutex::new(0));
    let guard = lock.scoped_acquire();

    let lock_clone = lock.clone();
    let attempt = thread::spawn(move || lock_clone.try_acquire_for(Duration::from_millis(20)).is_some())
        .join()
        .unwrap();
    assert!(!attempt);

    drop(guard);
    let lock_clone = lock.clone();
    let attempt = thread::spawn(move || lock_clone.try_acquire().is_some())
        .join()
        .unwrap();
    assert!(attempt);
}

#[test]
fn test_condvar_handoff() {
    let state = Arc::new((Mutex::new(false), Condvar::new()));

    let state_clone = state.clone();
    let waiter = thread::spawn(move || {
        let (lock, ready) = &*state_clone;
        let mut guard = lock.scoped_acquire();
        while !*guard {
            ready.wait(&mut guard);
        }
        // Ownership is restored after waking
        lock.is_held_by_current_thread()
    });

    thread::sleep(Duration::from_millis(20));
    {
        let (lock, ready) = &*state;
        *lock.scoped_acquire() = true;
        ready.notify_all();
    }

    assert!(waiter.join().unwrap());
}

#[test]
fn test_condvar_wait_for_times_out() {
    let lock = Mutex::new(());
    let condvar = Condvar::new();
    let mut guard = lock.scoped_acquire();

    let timed_out = condvar.wait_for(&mut guard, Duration::from_millis(10));
    assert!(timed_out);
    assert!(lock.is_held_by_current_thread());
}
