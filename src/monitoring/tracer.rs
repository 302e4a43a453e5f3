/*!
 * Tracing
 * Subscriber setup and per-item spans for the toolkit's structured logs
 */

use crate::core::limits::{SLOW_ITEM_THRESHOLD, TRACE_JSON_ENV_VAR};
use crate::core::types::{TaskId, WorkerId};
use std::time::Instant;
use tracing::{debug, info, span, warn, Level, Span};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Install a global tracing subscriber
///
/// Environment variables:
/// - RUST_LOG: log filter (default: info)
/// - CONCUR_TRACE_JSON: JSON output when `1` or `true`
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(TRACE_JSON_ENV_VAR)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Tracing initialized");
    }
    installed
}

/// Span covering one work item on one worker
///
/// Logs the elapsed time on drop; items slower than
/// `SLOW_ITEM_THRESHOLD` are reported at warn level.
pub(crate) struct ItemSpan {
    span: Span,
    start: Instant,
    task: TaskId,
}

impl ItemSpan {
    pub(crate) fn new(task: TaskId, worker: WorkerId) -> Self {
        let span = span!(
            Level::DEBUG,
            "work_item",
            task = task,
            worker = worker,
            duration_us = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
            task,
        }
    }

    pub(crate) fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for ItemSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.span.record("duration_us", duration.as_micros() as u64);
        let _entered = self.span.enter();

        if duration > SLOW_ITEM_THRESHOLD {
            warn!(
                task = self.task,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow work item"
            );
        } else {
            debug!(task = self.task, duration_us = duration.as_micros() as u64, "work item finished");
        }
    }
}

/// Helper to create an item span
#[inline]
pub(crate) fn span_item(task: TaskId, worker: WorkerId) -> ItemSpan {
    ItemSpan::new(task, worker)
}
