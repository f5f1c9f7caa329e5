//! Work catalog reader: a lazy, restartable stream of ready work items.
//!
//! Pages through unprocessed catalog rows in id order, joins each against
//! the artifact index, and yields `WorkItem`s. Rows that cannot be joined
//! (missing DOI, no artifact on disk, payload already written) are logged
//! and skipped, never yielded.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::artifact::ArtifactIndex;
use crate::db::Db;
use crate::db::catalog::DocumentRow;
use crate::error::Result;
use crate::model::WorkItem;
use crate::sink::payload_path;
use crate::telemetry::metrics;
use opentelemetry::KeyValue;

/// Counts of rows the reader skipped, reported at end of stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipStats {
    pub missing_doi: u64,
    pub missing_artifact: u64,
    pub already_persisted: u64,
}

pub struct CatalogReader {
    db: Arc<Db>,
    index: ArtifactIndex,
    output_dir: PathBuf,
    page_size: i64,
    /// Pagination position: id of the last row scanned, yielded or not.
    cursor: Option<Uuid>,
    page: VecDeque<DocumentRow>,
    exhausted: bool,
    skips: SkipStats,
}

impl CatalogReader {
    /// Create a reader over rows strictly after `resume_after` (None means
    /// the whole backlog).
    pub fn new(
        db: Arc<Db>,
        index: ArtifactIndex,
        output_dir: impl Into<PathBuf>,
        page_size: i64,
        resume_after: Option<Uuid>,
    ) -> Self {
        Self {
            db,
            index,
            output_dir: output_dir.into(),
            page_size,
            cursor: resume_after,
            page: VecDeque::new(),
            exhausted: false,
            skips: SkipStats::default(),
        }
    }

    /// Pull the next ready work item, or None at end of stream.
    pub async fn next(&mut self) -> Result<Option<WorkItem>> {
        loop {
            if self.page.is_empty() && !self.refill().await? {
                return Ok(None);
            }
            let Some(row) = self.page.pop_front() else {
                return Ok(None);
            };

            let Some(doi) = row.doi.as_deref().filter(|d| !d.is_empty()) else {
                warn!(id = %row.id, "missing DOI, skipping");
                self.skip(|s| s.missing_doi += 1, "missing_doi");
                continue;
            };
            let Some(artifact_path) = self.index.resolve(doi) else {
                info!(id = %row.id, doi, "artifact not found, skipping");
                self.skip(|s| s.missing_artifact += 1, "missing_artifact");
                continue;
            };
            if payload_path(&self.output_dir, row.id).exists() {
                info!(id = %row.id, "payload already written, skipping");
                self.skip(|s| s.already_persisted += 1, "already_persisted");
                continue;
            }

            return Ok(Some(WorkItem::new(row.id, doi, artifact_path)));
        }
    }

    /// Fetch the next page. Returns false once the backlog is exhausted.
    async fn refill(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        let rows = self
            .db
            .fetch_unprocessed(self.cursor, self.page_size)
            .await?;
        if rows.is_empty() {
            self.exhausted = true;
            return Ok(false);
        }
        self.cursor = rows.last().map(|r| r.id);
        self.page.extend(rows);
        Ok(true)
    }

    fn skip(&mut self, bump: impl FnOnce(&mut SkipStats), reason: &'static str) {
        bump(&mut self.skips);
        metrics::catalog_skips().add(1, &[KeyValue::new("reason", reason)]);
    }

    pub fn skip_stats(&self) -> SkipStats {
        self.skips
    }
}
