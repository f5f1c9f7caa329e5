//! Dispatch span helpers.
//!
//! Provides span creation and state-transition recording for tasks
//! flowing through the dispatcher.

use tracing::Span;

use crate::remote::TaskHandle;

/// Start a span covering one batch dispatch.
pub fn start_dispatch_span(batch_size: usize) -> Span {
    tracing::info_span!("batch.dispatch", "batch.size" = batch_size)
}

/// Record a task state transition event on the given span.
pub fn record_task_transition(span: &Span, handle: &TaskHandle, from: &str, to: &str) {
    span.in_scope(|| {
        tracing::info!(task = %handle, from = from, to = to, "task_transition");
    });
}
