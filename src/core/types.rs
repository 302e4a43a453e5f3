/*!
 * Core Types
 * Common identifiers and aliases used across the toolkit
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned to every submitted work item
pub type TaskId = u64;

/// Identifier assigned to every timer registration
pub type TimerId = u64;

/// Index of a worker thread inside its pool (0-based)
pub type WorkerId = usize;

/// Identifier returned by an event hub subscription
pub type SubscriberId = u64;

/// Time quantity in milliseconds (0 means "next dispatcher tick")
pub type Millis = u64;

/// Lifecycle of a worker pool
///
/// Transitions are strictly forward: `Created -> Running -> Draining -> Stopped`.
/// A pool that is shut down before it was started goes `Created -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    Created,
    Running,
    Draining,
    Stopped,
}

impl PoolState {
    #[inline]
    pub(crate) const fn as_raw(self) -> u32 {
        match self {
            PoolState::Created => 0,
            PoolState::Running => 1,
            PoolState::Draining => 2,
            PoolState::Stopped => 3,
        }
    }

    #[inline]
    pub(crate) const fn from_raw(raw: u32) -> Self {
        match raw {
            0 => PoolState::Created,
            1 => PoolState::Running,
            2 => PoolState::Draining,
            _ => PoolState::Stopped,
        }
    }

    /// Whether the pool still accepts submissions in this state
    #[inline]
    pub const fn accepts_work(self) -> bool {
        matches!(self, PoolState::Created | PoolState::Running)
    }
}

impl fmt::Display for PoolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolState::Created => "created",
            PoolState::Running => "running",
            PoolState::Draining => "draining",
            PoolState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_state_raw_round_trip() {
        for state in [
            PoolState::Created,
            PoolState::Running,
            PoolState::Draining,
            PoolState::Stopped,
        ] {
            assert_eq!(PoolState::from_raw(state.as_raw()), state);
        }
    }

    #[test]
    fn test_pool_state_accepts_work() {
        assert!(PoolState::Created.accepts_work());
        assert!(PoolState::Running.accepts_work());
        assert!(!PoolState::Draining.accepts_work());
        assert!(!PoolState::Stopped.accepts_work());
    }
}
