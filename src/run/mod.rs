//! Run coordinator: drives the catalog reader in bounded batches, feeds
//! each batch to the dispatcher, accumulates counters, and (in checkpoint
//! mode) persists progress after every drained batch.
//!
//! A crash loses at most the in-flight batch; the catalog's completion
//! markers make the rerun idempotent regardless.

pub mod checkpoint;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::artifact::ArtifactIndex;
use crate::catalog::{CatalogReader, SkipStats};
use crate::db::Db;
use crate::dispatch::{DispatchConfig, Dispatcher};
use crate::error::Result;
use crate::failures::FailureLog;
use crate::remote::TaskClient;
use crate::sink::ResultSink;
use checkpoint::Checkpoint;

/// Paths and pacing for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root scanned for artifacts at startup.
    pub input_dir: PathBuf,
    /// Where payloads are written; also the reader's already-done check.
    pub output_dir: PathBuf,
    /// JSONL failure log path.
    pub failure_log: PathBuf,
    /// When set, progress is checkpointed here after every batch.
    pub checkpoint_path: Option<PathBuf>,
    pub batch_size: usize,
    pub page_size: i64,
    pub batch_interval: Duration,
}

/// Global counters for one run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub dispatched: u64,
    pub successes: u64,
    pub failures: u64,
    pub db_failures: u64,
    pub skipped: SkipStats,
}

/// Top-level control loop. Batch N+1 never starts before batch N's live
/// set is fully drained, capping outstanding remote tasks at one batch.
pub struct RunCoordinator<'a> {
    db: Arc<Db>,
    client: &'a dyn TaskClient,
    sink: &'a dyn ResultSink,
    dispatch_config: DispatchConfig,
    config: RunConfig,
}

impl<'a> RunCoordinator<'a> {
    pub fn new(
        db: Arc<Db>,
        client: &'a dyn TaskClient,
        sink: &'a dyn ResultSink,
        dispatch_config: DispatchConfig,
        config: RunConfig,
    ) -> Self {
        Self {
            db,
            client,
            sink,
            dispatch_config,
            config,
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        // Resolve the checkpoint before creating the output directory:
        // a checkpoint whose output is gone must read as corruption.
        let mut checkpoint = self
            .config
            .checkpoint_path
            .as_deref()
            .and_then(|path| resolve_checkpoint(path, &self.config.output_dir))
            .unwrap_or_else(Checkpoint::empty);
        if let Some(last_id) = checkpoint.last_id {
            info!(%last_id, total = checkpoint.total, "resuming from checkpoint");
        }

        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let index = ArtifactIndex::build(&self.config.input_dir);
        if index.is_empty() {
            error!(dir = %self.config.input_dir.display(), "no artifacts found, nothing to do");
            return Ok(RunSummary::default());
        }

        let mut reader = CatalogReader::new(
            Arc::clone(&self.db),
            index,
            &self.config.output_dir,
            self.config.page_size,
            checkpoint.last_id,
        );
        let mut dispatcher =
            Dispatcher::new(self.client, self.sink, self.dispatch_config.clone());
        let failure_log = FailureLog::new(&self.config.failure_log);
        let mut summary = RunSummary::default();

        loop {
            let mut batch = Vec::with_capacity(self.config.batch_size);
            while batch.len() < self.config.batch_size {
                match reader.next().await? {
                    Some(item) => batch.push(item),
                    None => break,
                }
            }
            if batch.is_empty() {
                break;
            }

            let batch_len = batch.len();
            let last_id = batch.last().map(|item| item.id);
            info!(size = batch_len, "dispatching batch");

            let report = dispatcher.run_batch(batch).await;
            summary.dispatched += batch_len as u64;
            summary.successes += report.successes;
            summary.failures += report.failures.len() as u64;
            summary.db_failures += report.db_failures.len() as u64;

            for record in report.failures.iter().chain(report.db_failures.iter()) {
                if let Err(e) = failure_log.append(record) {
                    error!(id = %record.id, error = %e, "failed to append failure record");
                }
            }

            if let Some(path) = self.config.checkpoint_path.as_deref() {
                checkpoint.last_id = last_id.or(checkpoint.last_id);
                checkpoint.total += batch_len as u64;
                checkpoint::save(path, &checkpoint)?;
            }

            if batch_len == self.config.batch_size {
                tokio::time::sleep(self.config.batch_interval).await;
            }
        }

        summary.skipped = reader.skip_stats();
        info!(
            dispatched = summary.dispatched,
            successes = summary.successes,
            failures = summary.failures,
            db_failures = summary.db_failures,
            skipped_missing_artifact = summary.skipped.missing_artifact,
            "run finished"
        );
        Ok(summary)
    }
}

/// Startup rule: an existing checkpoint whose expected output directory is
/// absent is discarded (corruption, not resume).
pub fn resolve_checkpoint(path: &Path, output_dir: &Path) -> Option<Checkpoint> {
    let loaded = checkpoint::load(path)?;
    if loaded.last_id.is_some() && !output_dir.is_dir() {
        warn!(
            checkpoint = %path.display(),
            output_dir = %output_dir.display(),
            "checkpoint present but output directory missing, starting from scratch"
        );
        return None;
    }
    Some(loaded)
}
