//! Result sink: persist payloads locally, then mark completion in the
//! catalog.
//!
//! Ordering is fixed: a payload is written before its completion marker
//! is attempted, and a marker failure never undoes the persisted payload
//! (the expensive remote work already succeeded).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::Db;
use crate::error::{Error, Result};

/// Where a document's payload lives under the output directory.
pub fn payload_path(output_dir: &Path, id: Uuid) -> PathBuf {
    output_dir.join(format!("{id}.json"))
}

/// Filesystem store for result payloads, one JSON file per identifier.
pub struct PayloadStore {
    output_dir: PathBuf,
}

impl PayloadStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Create the output directory. Failure here is fatal to the run.
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }

    pub fn path_for(&self, id: Uuid) -> PathBuf {
        payload_path(&self.output_dir, id)
    }

    /// Write one payload. The payload is opaque; it is stored as-is.
    pub async fn write(&self, id: Uuid, payload: &serde_json::Value) -> Result<PathBuf> {
        let path = self.path_for(id);
        let bytes = serde_json::to_vec_pretty(payload)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| Error::Persist { id, source })?;
        debug!(id = %id, path = %path.display(), "payload written");
        Ok(path)
    }

    /// Identifiers of every payload already on disk. Used by the repair
    /// pass to reconcile markers after a partial run.
    pub fn persisted_ids(&self) -> Result<Vec<Uuid>> {
        let mut ids = Vec::new();
        if !self.output_dir.is_dir() {
            warn!(dir = %self.output_dir.display(), "output directory does not exist");
            return Ok(ids);
        }
        for entry in std::fs::read_dir(&self.output_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && let Ok(id) = Uuid::parse_str(stem)
            {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

/// Persists a successful payload and issues the completion marker.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Write the payload for `id`. Must succeed before `mark_complete` is
    /// attempted for the same identifier.
    async fn persist(&self, id: Uuid, payload: &serde_json::Value) -> Result<()>;

    /// Idempotent completion-marker write. Returns whether a row was
    /// affected; false is a data-integrity signal, not a failure.
    async fn mark_complete(&self, id: Uuid) -> Result<bool>;
}

/// Production sink: payload files on disk, markers in the catalog.
pub struct FsResultSink {
    store: PayloadStore,
    db: Arc<Db>,
}

impl FsResultSink {
    pub fn new(store: PayloadStore, db: Arc<Db>) -> Self {
        Self { store, db }
    }
}

#[async_trait]
impl ResultSink for FsResultSink {
    async fn persist(&self, id: Uuid, payload: &serde_json::Value) -> Result<()> {
        self.store.write(id, payload).await?;
        Ok(())
    }

    async fn mark_complete(&self, id: Uuid) -> Result<bool> {
        self.db
            .mark_processed(id)
            .await
            .map_err(|e| Error::MarkComplete {
                id,
                reason: e.to_string(),
            })
    }
}
