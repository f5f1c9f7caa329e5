//! Metric instrument factories for paperflow-rs.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"paperflow-rs"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for paperflow-rs instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("paperflow-rs")
}

/// Counter: remote task submissions.
/// Labels: `result` ("ok" | "error").
pub fn tasks_submitted() -> Counter<u64> {
    meter()
        .u64_counter("paperflow.tasks.submitted")
        .with_description("Number of remote task submissions")
        .build()
}

/// Counter: attempts abandoned and eligible for retry.
/// Labels: `reason` ("failed" | "timeout_pending" | "timeout_running").
pub fn task_retries() -> Counter<u64> {
    meter()
        .u64_counter("paperflow.tasks.retries")
        .with_description("Number of abandoned task attempts")
        .build()
}

/// Counter: per-document terminal outcomes.
/// Labels: `result` ("success" | "marker_missed" | "db_failure" |
/// "persist_failure" | "terminal_failure").
pub fn documents_completed() -> Counter<u64> {
    meter()
        .u64_counter("paperflow.documents.completed")
        .with_description("Number of documents reaching a terminal outcome")
        .build()
}

/// Counter: catalog rows skipped by the reader.
/// Labels: `reason` ("missing_doi" | "missing_artifact" |
/// "already_persisted").
pub fn catalog_skips() -> Counter<u64> {
    meter()
        .u64_counter("paperflow.catalog.skips")
        .with_description("Number of catalog rows skipped by the reader")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("paperflow.operation.duration_ms")
        .with_description("Operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
