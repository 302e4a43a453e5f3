/*!
 * Concurrency Toolkit - Demo Entry Point
 *
 * Walks through the toolkit's building blocks:
 * - Worker pool submissions and joins
 * - Scoped mutex and atomic counters
 * - One-shot and repeating timers
 * - Task continuations and the event hub
 */

use concur_kit::{
    init_tracing, AtomicCell, EventHub, Mutex, PoolConfig, ToolkitError, TimerService,
    WorkerPool,
};
use miette::IntoDiagnostic;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

fn main() -> miette::Result<()> {
    init_tracing();

    info!("Concurrency toolkit demo starting...");
    info!("================================================");

    let pool = WorkerPool::new(PoolConfig::from_env())?;
    pool.start()?;
    info!(workers = pool.worker_count(), "Worker pool started");

    // Fan out work and join on the handles
    let handles = (1..=4_u64)
        .map(|n| pool.submit_with(n, |n| (1..=n * 1000).sum::<u64>()))
        .collect::<Result<Vec<_>, _>>()?;
    pool.wait_all(&handles);
    for handle in &handles {
        info!(
            task = handle.id(),
            worker = ?handle.completed_by(),
            result = ?handle.await_result(),
            "Sum computed"
        );
    }

    // Shared state: mutex-guarded log plus a lock-free counter
    let log = Arc::new(Mutex::new(Vec::new()));
    let counter = Arc::new(AtomicCell::new(0_i64));
    let results = pool.for_each(0..16, {
        let log = log.clone();
        let counter = counter.clone();
        move |index| {
            let value = counter.increment();
            log.scoped_acquire().push((index, value));
        }
    })?;
    info!(
        items = results.len(),
        counter = counter.load(),
        logged = log.acquire().len(),
        "Parallel loop finished"
    );

    // Continuation runs on the worker that completes the item
    let handle = pool.submit(|| "hello from a worker")?;
    handle.on_complete(|outcome| info!(?outcome, "Continuation invoked"));
    handle.wait();

    // Failures are contained and reported, the worker survives
    let failing = pool.submit(|| -> u32 { panic!("deliberate failure") })?;
    if let Err(error) = failing.await_result() {
        info!(error = %error, "Failure contained");
    }

    // Event hub
    let hub: EventHub<String> = EventHub::new();
    let received = Arc::new(AtomicCell::new(0_u32));
    let subscriber = hub.subscribe({
        let received = received.clone();
        move |event| {
            received.increment();
            info!(event = %event, "Event delivered");
        }
    });
    hub.publish(&"pool-ready".to_string());
    hub.unsubscribe(subscriber);

    // Timers
    let timers = TimerService::new()?;
    let ticks = Arc::new(AtomicCell::new(0_u32));
    let ticker = timers.schedule_repeating(Duration::from_millis(50), {
        let ticks = ticks.clone();
        move || {
            let tick = ticks.increment();
            info!(tick, "Repeating timer fired");
        }
    })?;
    timers.schedule_once(Duration::from_millis(120), || info!("One-shot timer fired"))?;

    std::thread::sleep(Duration::from_millis(300));
    ticker.cancel();
    info!(ticks = ticks.load(), "Repeating timer cancelled");

    let pool_stats = serde_json::to_string_pretty(&pool.stats()).into_diagnostic()?;
    let timer_stats = serde_json::to_string_pretty(&timers.stats()).into_diagnostic()?;
    info!("Pool stats:\n{}", pool_stats);
    info!("Timer stats:\n{}", timer_stats);

    timers.shutdown();
    pool.shutdown();

    // Submitting after shutdown is rejected rather than silently dropped
    if let Err(error) = pool.submit(|| ()) {
        let error: ToolkitError = error.into();
        info!(kind = error.kind(), "Submission after shutdown rejected");
    }

    info!("Demo complete");
    Ok(())
}
