/*!
 * Pool Statistics
 * Lock-free counters with serializable snapshots
 */

use crate::core::sync::AtomicCell;
use crate::core::types::PoolState;
use serde::{Deserialize, Serialize};

/// Live counters shared between the pool handle and its workers
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub submitted: AtomicCell<u64>,
    pub completed: AtomicCell<u64>,
    pub failed: AtomicCell<u64>,
    pub rejected: AtomicCell<u64>,
    pub active: AtomicCell<usize>,
}

/// Point-in-time view of a worker pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub state: PoolState,
    pub worker_count: usize,
    /// Items accepted into the queue
    pub submitted: u64,
    /// Items that finished successfully
    pub completed: u64,
    /// Items that returned an error or panicked
    pub failed: u64,
    /// Submissions refused because the pool was closed
    pub rejected: u64,
    /// Workers currently running an item
    pub active: usize,
    /// Items waiting in the queue
    pub queued: usize,
}

impl PoolCounters {
    pub(crate) fn snapshot(&self, state: PoolState, worker_count: usize, queued: usize) -> PoolStats {
        PoolStats {
            state,
            worker_count,
            submitted: self.submitted.load(),
            completed: self.completed.load(),
            failed: self.failed.load(),
            rejected: self.rejected.load(),
            active: self.active.load(),
            queued,
        }
    }
}

impl PoolStats {
    /// Items accepted but not yet finished
    pub fn in_flight(&self) -> u64 {
        self.submitted
            .saturating_sub(self.completed)
            .saturating_sub(self.failed)
    }
}
