/*!
 * Synchronization Primitives
 *
 * Building blocks shared by the worker pool, task handles and timers:
 * - `AtomicCell`: lock-free integer with increment / exchange / CAS
 * - `Mutex`: non-reentrant scoped lock with guaranteed release
 * - `Condvar`: wait/notify paired with `MutexGuard`
 *
 * # Ordering
 *
 * Atomic operations are sequentially consistent. Lock acquisition and
 * release carry the usual acquire/release semantics of parking_lot.
 */

mod atomic;
mod mutex;

pub use atomic::{AtomicCell, AtomicInteger};
pub use mutex::{Condvar, Mutex, MutexGuard};
