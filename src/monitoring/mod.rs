/*!
 * Monitoring
 * Structured tracing for pools, timers and work items
 */

mod tracer;

pub use tracer::init_tracing;
pub(crate) use tracer::span_item;
