/*!
 * Panic Containment
 * Runs user code so that a panic becomes a value instead of unwinding the worker
 */

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Run `f`, turning a panic into its message
///
/// The closure is asserted unwind-safe: any state it touched is owned by the
/// closure or guarded by locks that do not poison.
pub(crate) fn contain<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}

/// Best-effort extraction of the message carried by a panic payload
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked: <non-string payload>".to_string()
    }
}
