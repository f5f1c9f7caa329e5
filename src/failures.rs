//! Durable failure log: append-only JSONL keyed by identifier.
//!
//! Every terminal failure lands here so a follow-up campaign can target
//! exactly the failed subset without rescanning the catalog.

use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::model::WorkItem;

/// One terminal failure: no further automatic retry will occur.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub id: Uuid,
    pub doi: String,
    pub reason: String,
    pub attempts: u32,
    pub recorded_at: DateTime<Utc>,
}

impl FailureRecord {
    pub fn new(item: &WorkItem, reason: impl Into<String>, attempts: u32) -> Self {
        Self {
            id: item.id,
            doi: item.doi.clone(),
            reason: reason.into(),
            attempts,
            recorded_at: Utc::now(),
        }
    }
}

/// Append-only JSONL file, one record per line.
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, record: &FailureRecord) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}
