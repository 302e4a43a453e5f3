/*!
 * Toolkit Limits and Constants
 *
 * Centralized location for defaults, thresholds, and magic numbers.
 * Organized by subsystem.
 */

use std::time::Duration;

// =============================================================================
// WORKER POOL
// =============================================================================

/// Default worker count when none is configured
/// Falls back to this when available parallelism cannot be queried
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Upper bound on workers in a single pool
/// Guards against accidental thread explosions from bad configuration
pub const MAX_WORKER_COUNT: usize = 512;

/// Prefix for worker thread names (`<prefix>-<index>`)
pub const DEFAULT_WORKER_NAME_PREFIX: &str = "concur-worker";

/// Environment variable overriding the worker count in `PoolConfig::from_env`
pub const WORKERS_ENV_VAR: &str = "CONCUR_WORKERS";

// =============================================================================
// TIMERS
// =============================================================================

/// Workers dedicated to running timer callbacks
/// Two keeps one slow callback from starving every other registration
pub const DEFAULT_TIMER_DISPATCH_WORKERS: usize = 2;

/// Name of the timer dispatcher thread
pub const TIMER_THREAD_NAME: &str = "concur-timer";

/// Prefix for timer callback worker threads
pub const TIMER_WORKER_NAME_PREFIX: &str = "concur-timer-cb";

/// Longest the dispatcher sleeps without re-checking its heap
/// [PERF] Bounded so a lost notify degrades into latency rather than a hang
pub const TIMER_MAX_PARK: Duration = Duration::from_millis(500);

// =============================================================================
// LOGGING
// =============================================================================

/// Work items running longer than this are logged at warn level
pub const SLOW_ITEM_THRESHOLD: Duration = Duration::from_millis(100);

/// Environment variable enabling JSON trace output
pub const TRACE_JSON_ENV_VAR: &str = "CONCUR_TRACE_JSON";
