//! Dispatcher: the per-batch submit, poll, and retry state machine.
//!
//! One cooperative control flow owns the whole batch: it submits every
//! item, then polls all outstanding tasks each round with a fixed sleep
//! between rounds. A retry replaces the task handle; the attempt counter
//! only increments, enforcing a hard ceiling across submit failures,
//! remote failures, and timeouts alike.

use std::collections::HashMap;
use std::time::Duration;

use opentelemetry::KeyValue;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::failures::FailureRecord;
use crate::model::WorkItem;
use crate::remote::{TaskClient, TaskHandle, TaskState};
use crate::sink::ResultSink;
use crate::telemetry::metrics;
use crate::telemetry::task::{record_task_transition, start_dispatch_span};

/// Retry/timeout policy for one dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Hard ceiling on submissions per document.
    pub max_attempts: u32,
    /// Sleep between polling rounds, and between immediate submit retries.
    pub poll_interval: Duration,
    /// Deadline for a task that never resolves, measured from this
    /// attempt's submission.
    pub pending_timeout: Duration,
    /// Deadline for a task stuck mid-execution, measured from the first
    /// observed started state of this attempt.
    pub running_timeout: Duration,
}

impl DispatchConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts,
            poll_interval: config.poll_interval,
            pending_timeout: config.pending_timeout,
            running_timeout: config.running_timeout,
        }
    }
}

/// Which locally synthesized deadline expired. Both resolve to the same
/// retry action; the distinction feeds diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// Never picked up by the remote service.
    Pending,
    /// Picked up, then stalled mid-execution.
    Running,
}

impl std::fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeoutKind::Pending => write!(f, "pending"),
            TimeoutKind::Running => write!(f, "running"),
        }
    }
}

/// Attempt bookkeeping for one document. Never reset; `used` only grows.
#[derive(Debug, Clone)]
struct AttemptState {
    used: u32,
    first_submitted_at: Instant,
    last_change_at: Instant,
}

/// One outstanding remote task. Deadlines are per attempt: a resubmission
/// gets a fresh `submitted_at` and a cleared `started_at`.
struct InFlight {
    item: WorkItem,
    submitted_at: Instant,
    started_at: Option<Instant>,
}

impl InFlight {
    fn new(item: WorkItem) -> Self {
        Self {
            item,
            submitted_at: Instant::now(),
            started_at: None,
        }
    }
}

/// What one polling round decided for one task.
enum RoundOutcome {
    StillRunning,
    Succeeded(serde_json::Value),
    AttemptFailed(String),
}

/// Counters and records for one drained batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Payload persisted (the marker may still have failed, see db_failures).
    pub successes: u64,
    /// Terminal failures: submit exhaustion, remote failure, timeout,
    /// persist failure.
    pub failures: Vec<FailureRecord>,
    /// Payload persisted but completion marker write failed.
    pub db_failures: Vec<FailureRecord>,
}

/// The per-batch state machine. Owns the attempt map and the live task
/// set; nothing else touches them.
pub struct Dispatcher<'a> {
    client: &'a dyn TaskClient,
    sink: &'a dyn ResultSink,
    config: DispatchConfig,
    attempts: HashMap<Uuid, AttemptState>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(client: &'a dyn TaskClient, sink: &'a dyn ResultSink, config: DispatchConfig) -> Self {
        Self {
            client,
            sink,
            config,
            attempts: HashMap::new(),
        }
    }

    /// Submit the batch and poll until every task resolves. Returns once
    /// the live set is empty.
    pub async fn run_batch(&mut self, batch: Vec<WorkItem>) -> BatchReport {
        let span = start_dispatch_span(batch.len());
        let inner = span.clone();
        self.dispatch_batch(batch, inner).instrument(span).await
    }

    async fn dispatch_batch(&mut self, batch: Vec<WorkItem>, span: tracing::Span) -> BatchReport {
        let mut report = BatchReport::default();
        let mut live: HashMap<TaskHandle, InFlight> = HashMap::new();

        for item in batch {
            let submitted = self.submit_attempts(&item).await;
            match submitted {
                Ok(handle) => {
                    live.insert(handle, InFlight::new(item));
                }
                Err(reason) => self.record_failure(&mut report.failures, &item, reason),
            }
        }

        info!(live = live.len(), "batch submitted");

        while !live.is_empty() {
            let handles: Vec<TaskHandle> = live.keys().cloned().collect();
            for handle in handles {
                let Some(flight) = live.get_mut(&handle) else {
                    continue;
                };
                let outcome = self.check_task(&handle, flight, &span).await;
                match outcome {
                    RoundOutcome::StillRunning => {}
                    RoundOutcome::Succeeded(payload) => {
                        let Some(flight) = live.remove(&handle) else {
                            continue;
                        };
                        self.deliver(&flight, payload, &mut report).await;
                    }
                    RoundOutcome::AttemptFailed(reason) => {
                        let Some(flight) = live.remove(&handle) else {
                            continue;
                        };
                        if self.attempts_used(flight.item.id) < self.config.max_attempts {
                            record_task_transition(&span, &handle, "failed", "resubmitted");
                            let resubmitted = self.submit_attempts(&flight.item).await;
                            match resubmitted {
                                Ok(new_handle) => {
                                    live.insert(new_handle, InFlight::new(flight.item));
                                }
                                Err(submit_reason) => self.record_failure(
                                    &mut report.failures,
                                    &flight.item,
                                    submit_reason,
                                ),
                            }
                        } else {
                            self.record_failure(&mut report.failures, &flight.item, reason);
                        }
                    }
                }
            }

            if !live.is_empty() {
                tokio::time::sleep(self.config.poll_interval).await;
            }
        }

        info!(
            successes = report.successes,
            failures = report.failures.len(),
            db_failures = report.db_failures.len(),
            "batch drained"
        );
        report
    }

    /// Poll one task and decide its fate for this round. Deadlines apply
    /// to every non-terminal round, poll errors included.
    async fn check_task(
        &mut self,
        handle: &TaskHandle,
        flight: &mut InFlight,
        span: &tracing::Span,
    ) -> RoundOutcome {
        match self.client.poll(handle).await {
            Ok(TaskState::Succeeded(payload)) => {
                record_task_transition(span, handle, "running", "succeeded");
                return RoundOutcome::Succeeded(payload);
            }
            Ok(TaskState::Failed(reason)) => {
                warn!(id = %flight.item.id, task = %handle, %reason, "task failed remotely");
                metrics::task_retries().add(1, &[KeyValue::new("reason", "failed")]);
                return RoundOutcome::AttemptFailed(reason);
            }
            Ok(TaskState::Running) => {
                if flight.started_at.is_none() {
                    let now = Instant::now();
                    flight.started_at = Some(now);
                    if let Some(state) = self.attempts.get_mut(&flight.item.id) {
                        state.last_change_at = now;
                    }
                    record_task_transition(span, handle, "pending", "running");
                }
            }
            Ok(TaskState::Pending) => {}
            Ok(TaskState::Unknown(state)) => {
                debug!(task = %handle, state, "unrecognized task state, tolerating");
            }
            Err(e) => {
                warn!(task = %handle, error = %e, "poll failed, will retry next round");
            }
        }

        let now = Instant::now();
        if now.duration_since(flight.submitted_at) >= self.config.pending_timeout {
            return self.timed_out(handle, flight, TimeoutKind::Pending, self.config.pending_timeout);
        }
        if let Some(started) = flight.started_at
            && now.duration_since(started) >= self.config.running_timeout
        {
            return self.timed_out(handle, flight, TimeoutKind::Running, self.config.running_timeout);
        }

        RoundOutcome::StillRunning
    }

    fn timed_out(
        &self,
        handle: &TaskHandle,
        flight: &InFlight,
        kind: TimeoutKind,
        deadline: Duration,
    ) -> RoundOutcome {
        let reason = format!("{kind} timeout after {:.1}s", deadline.as_secs_f64());
        error!(id = %flight.item.id, task = %handle, %reason, "task abandoned");
        metrics::task_retries().add(
            1,
            &[KeyValue::new(
                "reason",
                match kind {
                    TimeoutKind::Pending => "timeout_pending",
                    TimeoutKind::Running => "timeout_running",
                },
            )],
        );
        RoundOutcome::AttemptFailed(reason)
    }

    /// Submit one item, consuming attempts until a handle is obtained or
    /// the ceiling is reached. One poll-interval pause between tries.
    async fn submit_attempts(&mut self, item: &WorkItem) -> std::result::Result<TaskHandle, String> {
        let mut last_err = None;
        loop {
            let now = Instant::now();
            let state = self.attempts.entry(item.id).or_insert_with(|| AttemptState {
                used: 0,
                first_submitted_at: now,
                last_change_at: now,
            });
            if state.used >= self.config.max_attempts {
                return Err(last_err
                    .unwrap_or_else(|| format!("attempt ceiling {} reached", self.config.max_attempts)));
            }
            state.used += 1;
            state.last_change_at = now;
            let attempt = state.used;

            match self.client.submit(item).await {
                Ok(handle) => {
                    info!(
                        id = %item.id,
                        attempt,
                        max_attempts = self.config.max_attempts,
                        task = %handle,
                        "submitted"
                    );
                    metrics::tasks_submitted().add(1, &[KeyValue::new("result", "ok")]);
                    return Ok(handle);
                }
                Err(e) => {
                    warn!(id = %item.id, attempt, error = %e, "submit failed");
                    metrics::tasks_submitted().add(1, &[KeyValue::new("result", "error")]);
                    last_err = Some(e.to_string());
                    if attempt < self.config.max_attempts {
                        tokio::time::sleep(self.config.poll_interval).await;
                    }
                }
            }
        }
    }

    /// Persist the payload, then mark completion. Persist failure is
    /// terminal for the item (the remote work already succeeded, so it is
    /// never resubmitted); a marker failure is a distinct db outcome.
    async fn deliver(&self, flight: &InFlight, payload: serde_json::Value, report: &mut BatchReport) {
        let item = &flight.item;
        if let Err(e) = self.sink.persist(item.id, &payload).await {
            error!(id = %item.id, error = %e, "persist failed");
            metrics::documents_completed().add(1, &[KeyValue::new("result", "persist_failure")]);
            self.record_failure(&mut report.failures, item, format!("persist: {e}"));
            return;
        }

        if let Some(state) = self.attempts.get(&item.id) {
            metrics::operation_duration_ms().record(
                state.first_submitted_at.elapsed().as_millis() as f64,
                &[KeyValue::new("operation", "task.resolve")],
            );
        }

        match self.sink.mark_complete(item.id).await {
            Ok(true) => {
                report.successes += 1;
                info!(id = %item.id, "completed");
                metrics::documents_completed().add(1, &[KeyValue::new("result", "success")]);
            }
            Ok(false) => {
                // Payload exists; a missing catalog row is an integrity
                // signal for operators, not a pipeline failure.
                report.successes += 1;
                warn!(id = %item.id, "completion marker affected no row");
                metrics::documents_completed().add(1, &[KeyValue::new("result", "marker_missed")]);
            }
            Err(e) => {
                report.successes += 1;
                error!(id = %item.id, error = %e, "completion marker failed; payload persisted");
                metrics::documents_completed().add(1, &[KeyValue::new("result", "db_failure")]);
                report.db_failures.push(FailureRecord::new(
                    item,
                    e.to_string(),
                    self.attempts_used(item.id),
                ));
            }
        }
    }

    fn record_failure(&self, out: &mut Vec<FailureRecord>, item: &WorkItem, reason: String) {
        let (attempts, stalled_ms) = match self.attempts.get(&item.id) {
            Some(state) => (state.used, state.last_change_at.elapsed().as_millis() as u64),
            None => (0, 0),
        };
        error!(id = %item.id, attempts, stalled_ms, %reason, "terminal failure");
        metrics::documents_completed().add(1, &[KeyValue::new("result", "terminal_failure")]);
        out.push(FailureRecord::new(item, reason, attempts));
    }

    fn attempts_used(&self, id: Uuid) -> u32 {
        self.attempts.get(&id).map(|a| a.used).unwrap_or(0)
    }
}
