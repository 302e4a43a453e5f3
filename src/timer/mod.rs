/*!
 * Timers
 *
 * One-shot and repeating callbacks driven by a monotonic clock.
 *
 * # Threads
 *
 * - One dispatcher thread waiting on the earliest due time
 * - A small worker pool running the callbacks, so a slow callback only
 *   delays its own registration
 *
 * Wall-clock adjustments have no effect: all scheduling uses `Instant`.
 */

mod config;
mod registration;
mod service;

pub use config::TimerConfig;
pub use registration::TimerRegistration;
pub use service::{TimerService, TimerStats};
