/*!
 * Worker Loop
 * Drains the shared queue until every sender is gone and the queue is empty
 */

use super::stats::PoolCounters;
use crate::core::errors::{PoolError, PoolResult};
use crate::core::types::WorkerId;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

/// Queued unit of work; receives the id of the worker running it
pub(crate) type Job = Box<dyn FnOnce(WorkerId) + Send + 'static>;

/// Spawn worker `id` reading from `queue`
pub(crate) fn spawn(
    id: WorkerId,
    name: String,
    stack_size: Option<usize>,
    queue: flume::Receiver<Job>,
    counters: Arc<PoolCounters>,
) -> PoolResult<JoinHandle<()>> {
    let mut builder = thread::Builder::new().name(name);
    if let Some(bytes) = stack_size {
        builder = builder.stack_size(bytes);
    }

    builder
        .spawn(move || run(id, queue, counters))
        .map_err(|e| PoolError::SpawnFailed(e.to_string()))
}

fn run(id: WorkerId, queue: flume::Receiver<Job>, counters: Arc<PoolCounters>) {
    debug!(worker = id, "Worker started");

    // recv() only fails once all senders are dropped and the queue is drained
    while let Ok(job) = queue.recv() {
        counters.active.increment();
        trace!(worker = id, "Worker picked up item");
        job(id);
        counters.active.decrement();
    }

    debug!(worker = id, "Worker exiting");
}
