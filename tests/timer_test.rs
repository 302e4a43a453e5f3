/*!
 * Timer Service Tests
 * One-shot timing, non-overlapping repeats, cancellation and failure reporting
 */

use concur_kit::{
    AtomicCell, Mutex, TimerConfig, TimerError, TimerService, ToolkitError,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Poll `condition` until it holds or `timeout` elapses
fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn test_one_shot_fires_once_after_delay() {
    let timers = TimerService::new().unwrap();
    let fired_at = Arc::new(Mutex::new(Vec::new()));

    let start = Instant::now();
    let fired_clone = fired_at.clone();
    let registration = timers
        .schedule_once(Duration::from_millis(100), move || {
            fired_clone.acquire().push(Instant::now());
        })
        .unwrap();

    assert!(!registration.is_repeating());
    assert!(wait_until(Duration::from_secs(2), || fired_at.acquire().len() == 1));

    // Nothing further arrives
    thread::sleep(Duration::from_millis(150));
    let fired_at = fired_at.acquire();
    assert_eq!(fired_at.len(), 1);
    assert!(fired_at[0].duration_since(start) >= Duration::from_millis(100));
    assert_eq!(registration.fire_count(), 1);
    timers.shutdown();
}

#[test]
fn test_repeating_timer_never_overlaps_itself() {
    let timers = TimerService::with_config(TimerConfig::default().with_dispatch_workers(4)).unwrap();
    let starts = Arc::new(Mutex::new(Vec::new()));
    let running = Arc::new(AtomicCell::new(0_u32));
    let max_running = Arc::new(AtomicCell::new(0_u32));

    let registration = timers
        .schedule_repeating(Duration::from_millis(50), {
            let starts = starts.clone();
            let running = running.clone();
            let max_running = max_running.clone();
            move || {
                let now = running.increment();
                if now > max_running.load() {
                    max_running.store(now);
                }
                starts.acquire().push(Instant::now());
                thread::sleep(Duration::from_millis(120));
                running.decrement();
            }
        })
        .unwrap();

    assert!(wait_until(Duration::from_secs(3), || starts.acquire().len() >= 3));
    registration.cancel();

    assert_eq!(max_running.load(), 1);
    let starts = starts.acquire().clone();
    for pair in starts.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(gap >= Duration::from_millis(120), "firings overlapped: gap {:?}", gap);
    }
    timers.shutdown();
}

#[test]
fn test_repeating_timer_keeps_firing() {
    let timers = TimerService::new().unwrap();
    let ticks = Arc::new(AtomicCell::new(0_u32));

    let ticks_clone = ticks.clone();
    let registration = timers
        .schedule_repeating(Duration::from_millis(20), move || {
            ticks_clone.increment();
        })
        .unwrap();

    assert!(registration.is_repeating());
    assert!(wait_until(Duration::from_secs(2), || ticks.load() >= 3));
    assert!(timers.cancel(&registration));
    timers.shutdown();
}

#[test]
fn test_cancel_before_first_firing() {
    let timers = TimerService::new().unwrap();
    let fired = Arc::new(AtomicCell::new(0_u32));

    let fired_clone = fired.clone();
    let registration = timers
        .schedule_once(Duration::from_millis(50), move || {
            fired_clone.increment();
        })
        .unwrap();

    assert!(timers.cancel(&registration));
    // Idempotent
    assert!(!timers.cancel(&registration));
    assert!(!registration.cancel());
    assert!(registration.is_cancelled());
    assert!(registration.next_fire().is_none());

    thread::sleep(Duration::from_millis(150));
    assert_eq!(fired.load(), 0);
    assert_eq!(timers.active_count(), 0);
    timers.shutdown();
}

#[test]
fn test_cancel_during_firing_lets_it_finish() {
    let timers = TimerService::new().unwrap();
    let started = Arc::new(AtomicCell::new(0_u32));
    let finished = Arc::new(AtomicCell::new(0_u32));

    let registration = timers
        .schedule_repeating(Duration::from_millis(20), {
            let started = started.clone();
            let finished = finished.clone();
            move || {
                started.increment();
                thread::sleep(Duration::from_millis(80));
                finished.increment();
            }
        })
        .unwrap();

    assert!(wait_until(Duration::from_secs(2), || started.load() == 1));
    assert!(registration.cancel());

    // The in-flight firing completes, and no new one starts
    assert!(wait_until(Duration::from_secs(2), || finished.load() == 1));
    thread::sleep(Duration::from_millis(100));
    assert_eq!(started.load(), 1);
    assert_eq!(finished.load(), 1);
    timers.shutdown();
}

#[test]
fn test_panicking_callback_is_reported_and_stays_scheduled() {
    let reports = Arc::new(Mutex::new(Vec::<ToolkitError>::new()));
    let sink_reports = reports.clone();
    let config = TimerConfig::default()
        .with_failure_sink(Arc::new(move |error: &ToolkitError| sink_reports.acquire().push(error.clone())));
    let timers = TimerService::with_config(config).unwrap();

    let registration = timers
        .schedule_repeating(Duration::from_millis(20), || panic!("callback exploded"))
        .unwrap();

    assert!(wait_until(Duration::from_secs(2), || reports.acquire().len() >= 2));
    assert!(!registration.is_cancelled());
    registration.cancel();

    let first = reports.acquire()[0].clone();
    match first {
        ToolkitError::Timer(TimerError::TimerCallbackFailed { timer, message }) => {
            assert_eq!(timer, registration.id());
            assert!(message.contains("callback exploded"));
        }
        other => panic!("expected TimerCallbackFailed, got {:?}", other),
    }
    assert!(timers.stats().failed >= 2);
    timers.shutdown();
}

#[test]
fn test_zero_delay_fires_promptly() {
    let timers = TimerService::new().unwrap();
    let fired = Arc::new(AtomicCell::new(0_u32));

    let fired_clone = fired.clone();
    timers
        .schedule_at_millis(0, 0, move || {
            fired_clone.increment();
        })
        .unwrap();

    assert!(wait_until(Duration::from_millis(500), || fired.load() == 1));
    timers.shutdown();
}

#[test]
fn test_earlier_timer_fires_first() {
    let timers = TimerService::with_config(TimerConfig::default().with_dispatch_workers(1)).unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    for (name, delay) in [("late", 80), ("early", 20), ("middle", 50)] {
        let order = order.clone();
        timers
            .schedule_once(Duration::from_millis(delay), move || order.acquire().push(name))
            .unwrap();
    }

    assert!(wait_until(Duration::from_secs(2), || order.acquire().len() == 3));
    assert_eq!(*order.acquire(), vec!["early", "middle", "late"]);
    timers.shutdown();
}

#[test]
fn test_shutdown_cancels_pending_registrations() {
    let timers = TimerService::new().unwrap();
    let registration = timers
        .schedule_once(Duration::from_secs(10), || {})
        .unwrap();

    timers.shutdown();

    assert!(registration.is_cancelled());
    assert_eq!(timers.active_count(), 0);
    assert_eq!(
        timers.schedule_once(Duration::ZERO, || {}).unwrap_err(),
        TimerError::ServiceStopped
    );
}

#[test]
fn test_delay_beyond_clock_range_is_an_error() {
    let timers = TimerService::new().unwrap();

    let once = timers.schedule_once(Duration::MAX, || {});
    assert!(matches!(once, Err(TimerError::OutOfRange { .. })));

    let repeating = timers.schedule_repeating(Duration::MAX, || {});
    assert!(matches!(repeating, Err(TimerError::OutOfRange { .. })));

    // The service keeps working afterwards
    let fired = Arc::new(AtomicCell::new(0_u32));
    let fired_clone = fired.clone();
    timers
        .schedule_once(Duration::from_millis(10), move || {
            fired_clone.increment();
        })
        .unwrap();
    assert!(wait_until(Duration::from_secs(2), || fired.load() == 1));
    timers.shutdown();
}
