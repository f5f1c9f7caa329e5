//! Error types for paperflow-rs.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    /// Remote submit failed before a task identifier was obtained.
    #[error("submission failed: {0}")]
    Submission(String),

    /// Remote status poll failed or returned an unusable response.
    #[error("status poll failed: {0}")]
    Poll(String),

    /// Local result write failed for an already-completed task.
    #[error("persist failed for {id}: {source}")]
    Persist {
        id: Uuid,
        #[source]
        source: std::io::Error,
    },

    /// Completion-marker update failed after the payload was persisted.
    #[error("completion update failed for {id}: {reason}")]
    MarkComplete { id: Uuid, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
