/*!
 * Executor
 *
 * Fixed-size worker pool and the task handles it returns.
 *
 * # Architecture
 *
 * Submissions are boxed into jobs and pushed onto a flume MPMC channel,
 * which is the pool's FIFO work queue. Each worker thread blocks on the
 * channel, runs one job at a time, and resolves the job's `TaskHandle`.
 * Closing the queue is done by dropping the only sender, so workers drain
 * whatever was accepted before exiting.
 */

mod config;
pub(crate) mod panic;
mod pool;
mod stats;
mod task;
mod worker;

pub use config::PoolConfig;
pub use pool::WorkerPool;
pub use stats::PoolStats;
pub use task::{TaskHandle, TaskStatus};
