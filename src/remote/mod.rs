//! Remote task service interface.
//!
//! The service is an opaque asynchronous executor: submit an artifact, get
//! a task handle back, poll the handle until it resolves. Retry lives in
//! the dispatcher, never here.

pub mod http;

pub use http::HttpTaskClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::WorkItem;

/// Opaque reference to one in-flight remote submission. Scoped to exactly
/// one work item at a time; a retry replaces it with a fresh handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskHandle(pub String);

impl std::fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// State reported by one status poll. The dispatcher never invents one of
/// these; it only bounds how long it tolerates the non-terminal states.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    /// Queued, not yet picked up.
    Pending,
    /// Picked up and executing.
    Running,
    /// Finished with a payload.
    Succeeded(serde_json::Value),
    /// Finished without a payload (FAILURE or REVOKED upstream).
    Failed(String),
    /// Unrecognized state string; tolerated as non-terminal.
    Unknown(String),
}

/// Client for the remote processing service.
#[async_trait]
pub trait TaskClient: Send + Sync {
    /// Submit one work item. Fails with [`crate::error::Error::Submission`]
    /// when no task identifier could be obtained. No retry inside.
    async fn submit(&self, item: &WorkItem) -> Result<TaskHandle>;

    /// Poll one task. Fails with [`crate::error::Error::Poll`] on transport
    /// failure or an unusable response; success requires both a recognized
    /// state and, for `SUCCESS`, a payload.
    async fn poll(&self, handle: &TaskHandle) -> Result<TaskState>;
}
