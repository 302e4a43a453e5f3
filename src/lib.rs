/*!
 * Concurrency Toolkit
 *
 * Small, composable building blocks for concurrent programs:
 * - `AtomicCell`: lock-free integer cell
 * - `Mutex`: scoped mutual exclusion with guaranteed release
 * - `WorkerPool`: fixed set of workers draining a FIFO queue
 * - `TaskHandle`: completion token with blocking, async and callback access
 * - `TimerService`: one-shot and non-overlapping repeating timers
 * - `EventHub`: explicit subscriber list
 *
 * ```
 * use concur_kit::{AtomicCell, WorkerPool};
 * use std::sync::Arc;
 *
 * let pool = WorkerPool::with_workers(2).unwrap();
 *
 * let counter = Arc::new(AtomicCell::new(0_u64));
 * let handles: Vec<_> = (0..8)
 *     .map(|_| {
 *         let counter = counter.clone();
 *         pool.submit(move || counter.increment()).unwrap()
 *     })
 *     .collect();
 *
 * pool.wait_all(&handles);
 * assert_eq!(counter.load(), 8);
 * pool.shutdown();
 * ```
 */

pub mod core;
pub mod events;
pub mod executor;
pub mod monitoring;
pub mod timer;

// Re-exports
pub use crate::core::errors::*;
pub use crate::core::sync::{AtomicCell, AtomicInteger, Condvar, Mutex, MutexGuard};
pub use crate::core::types::*;
pub use events::EventHub;
pub use executor::{PoolConfig, PoolStats, TaskHandle, TaskStatus, WorkerPool};
pub use monitoring::init_tracing;
pub use timer::{TimerConfig, TimerRegistration, TimerService, TimerStats};
