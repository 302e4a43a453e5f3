/*!
 * Core Module
 * Shared types, limits, errors and synchronization primitives
 */

pub mod errors;
pub mod limits;
pub mod sync;
pub mod types;

// Re-export for convenience
pub use errors::*;
pub use sync::{AtomicCell, AtomicInteger, Condvar, Mutex, MutexGuard};
pub use types::*;
