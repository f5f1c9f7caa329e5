//! HTTP client for the two-stage processing endpoints.
//!
//! Submit is a multipart POST of the artifact plus routing form fields;
//! status is a GET by task id. Both carry bearer auth and per-request
//! timeouts. Responses are validated strictly: a submit without `task_id`
//! or a poll without `state` is an error, and `SUCCESS` without a usable
//! `result` is a poll error, not a success.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use super::{TaskClient, TaskHandle, TaskState};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::WorkItem;

/// Form fields sent with every submission.
#[derive(Debug, Clone)]
pub struct SubmitForm {
    pub priority: String,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub chunk_type: bool,
    pub return_txt: bool,
}

/// HTTP client for a single task service instance.
pub struct HttpTaskClient {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
    submit_timeout: Duration,
    status_timeout: Duration,
    form: SubmitForm,
}

/// Response returned by the submit endpoint after queuing a task.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    task_id: Option<String>,
}

/// Response returned by the status endpoint.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    result: Option<serde_json::Value>,
    /// Some service builds capitalize the result field.
    #[serde(default, rename = "Result")]
    result_alt: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpTaskClient {
    /// Build a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.api_base.clone(),
            SecretString::from(config.api_token.expose_secret().to_owned()),
            config.submit_timeout,
            config.status_timeout,
            SubmitForm {
                priority: config.priority.clone(),
                provider: config.provider.clone(),
                model: config.model.clone(),
                prompt: config.prompt.clone(),
                chunk_type: config.chunk_type,
                return_txt: config.return_txt,
            },
        )
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn new(
        base_url: String,
        token: SecretString,
        submit_timeout: Duration,
        status_timeout: Duration,
        form: SubmitForm,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            submit_timeout,
            status_timeout,
            form,
        })
    }

    fn build_form(&self, file_name: String, bytes: Vec<u8>) -> multipart::Form {
        let part = multipart::Part::bytes(bytes).file_name(file_name);
        let mut form = multipart::Form::new()
            .part("file", part)
            .text("priority", self.form.priority.clone());
        if let Some(ref provider) = self.form.provider {
            form = form.text("provider", provider.clone());
        }
        if let Some(ref model) = self.form.model {
            form = form.text("model", model.clone());
        }
        if let Some(ref prompt) = self.form.prompt {
            form = form.text("prompt", prompt.clone());
        }
        if self.form.chunk_type {
            form = form.text("chunk_type", "true");
        }
        if self.form.return_txt {
            form = form.text("return_txt", "true");
        }
        form
    }
}

#[async_trait]
impl TaskClient for HttpTaskClient {
    async fn submit(&self, item: &WorkItem) -> Result<TaskHandle> {
        let bytes = tokio::fs::read(&item.artifact_path).await.map_err(|e| {
            Error::Submission(format!("read {}: {e}", item.artifact_path.display()))
        })?;
        let file_name = item
            .artifact_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("artifact.pdf")
            .to_string();

        let response = self
            .client
            .post(format!("{}/two_stage/task", self.base_url))
            .bearer_auth(self.token.expose_secret())
            .multipart(self.build_form(file_name, bytes))
            .timeout(self.submit_timeout)
            .send()
            .await
            .map_err(|e| Error::Submission(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(Error::Submission(format!("status {status}: {body}")));
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| Error::Submission(format!("bad response body: {e}")))?;
        match body.task_id.filter(|t| !t.is_empty()) {
            Some(task_id) => {
                debug!(id = %item.id, task_id, "submitted");
                Ok(TaskHandle(task_id))
            }
            None => Err(Error::Submission(format!(
                "response missing task_id for {}",
                item.id
            ))),
        }
    }

    async fn poll(&self, handle: &TaskHandle) -> Result<TaskState> {
        let response = self
            .client
            .get(format!("{}/two_stage/task/{}", self.base_url, handle))
            .bearer_auth(self.token.expose_secret())
            .timeout(self.status_timeout)
            .send()
            .await
            .map_err(|e| Error::Poll(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(Error::Poll(format!("status {status}: {body}")));
        }

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| Error::Poll(format!("bad response body: {e}")))?;

        let Some(state) = body.state.filter(|s| !s.is_empty()) else {
            return Err(Error::Poll(format!("response missing state for {handle}")));
        };

        match state.as_str() {
            "PENDING" => Ok(TaskState::Pending),
            "STARTED" | "RUNNING" => Ok(TaskState::Running),
            "SUCCESS" => {
                let payload = body
                    .result
                    .or(body.result_alt)
                    .filter(|v| !v.is_null())
                    .ok_or_else(|| Error::Poll(format!("task {handle} succeeded without result")))?;
                Ok(TaskState::Succeeded(payload))
            }
            "FAILURE" | "REVOKED" => Ok(TaskState::Failed(match body.error {
                Some(reason) => format!("{state}: {reason}"),
                None => format!("remote state {state}"),
            })),
            other => Ok(TaskState::Unknown(other.to_string())),
        }
    }
}
