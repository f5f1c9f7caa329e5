//! Core value types shared across the pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One document ready for remote processing: a catalog row joined against
/// its on-disk artifact. Immutable; consumed once by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Catalog identifier of the document.
    pub id: Uuid,
    /// Locator key (DOI) the artifact was resolved by.
    pub doi: String,
    /// Path of the artifact to upload.
    pub artifact_path: PathBuf,
}

impl WorkItem {
    pub fn new(id: Uuid, doi: impl Into<String>, artifact_path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            doi: doi.into(),
            artifact_path: artifact_path.into(),
        }
    }
}
