//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing.
//! Sensitive values wrapped in secrecy::SecretString to prevent log leaks.

pub mod secrets;

use std::time::Duration;

use secrecy::SecretString;

use crate::error::{Error, Result};

#[derive(Debug)]
pub struct Config {
    pub database_url: SecretString,
    /// Bearer token for the remote task service.
    pub api_token: SecretString,
    /// Base URL of the remote task service, no trailing slash.
    pub api_base: String,

    /// Sleep between polling rounds.
    pub poll_interval: Duration,
    /// Deadline for a task that never leaves the queue, measured from
    /// submission.
    pub pending_timeout: Duration,
    /// Deadline for a task stuck mid-execution, measured from the first
    /// observed started state.
    pub running_timeout: Duration,
    /// Hard ceiling on submissions per document, submit failures included.
    pub max_attempts: u32,

    /// Documents dispatched per batch; also caps outstanding remote tasks.
    pub batch_size: usize,
    /// Rows fetched per catalog page.
    pub page_size: i64,
    /// Pause between batches.
    pub batch_interval: Duration,
    pub max_db_connections: u32,

    /// Per-request timeout for the multipart submit call.
    pub submit_timeout: Duration,
    /// Per-request timeout for the status poll call.
    pub status_timeout: Duration,

    /// Task priority form field.
    pub priority: String,
    /// Optional routing hints forwarded to the remote service.
    pub provider: Option<String>,
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub chunk_type: bool,
    pub return_txt: bool,

    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    /// In production, systemd EnvironmentFile provides the vars.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: SecretString::from(required_var("DATABASE_URL")?),
            api_token: SecretString::from(required_var("TASK_API_TOKEN")?),
            api_base: std::env::var("TASK_API_BASE")
                .unwrap_or_else(|_| "http://localhost:7770".to_string())
                .trim_end_matches('/')
                .to_string(),

            poll_interval: secs_var("POLL_INTERVAL_SECS", 3)?,
            pending_timeout: secs_var("PENDING_TIMEOUT_SECS", 5000)?,
            running_timeout: secs_var("RUNNING_TIMEOUT_SECS", 800)?,
            max_attempts: parsed_var("MAX_ATTEMPTS", 3)?,

            batch_size: parsed_var("BATCH_SIZE", 1000)?,
            page_size: parsed_var("PAGE_SIZE", 1000)?,
            batch_interval: secs_var("BATCH_INTERVAL_SECS", 10)?,
            max_db_connections: parsed_var("MAX_DB_CONNECTIONS", 4)?,

            submit_timeout: secs_var("SUBMIT_TIMEOUT_SECS", 120)?,
            status_timeout: secs_var("STATUS_TIMEOUT_SECS", 30)?,

            priority: nonempty_var("TASK_PRIORITY").unwrap_or_else(|| "normal".to_string()),
            provider: nonempty_var("TASK_PROVIDER"),
            model: nonempty_var("TASK_MODEL"),
            prompt: nonempty_var("TASK_PROMPT"),
            chunk_type: bool_var("TASK_CHUNK_TYPE", true),
            return_txt: bool_var("TASK_RETURN_TXT", false),

            otel_endpoint: std::env::var("OTEL_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::Config(format!("required environment variable {name} is not set")))
}

/// Read a var that must parse as `T`, falling back to `default` when unset.
fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{name} has invalid value {raw:?}"))),
        Err(_) => Ok(default),
    }
}

fn secs_var(name: &str, default: u64) -> Result<Duration> {
    Ok(Duration::from_secs(parsed_var(name, default)?))
}

/// Read an optional var, treating empty/whitespace values as unset.
fn nonempty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Truthy strings: "1", "true", "yes", "on" (case-insensitive).
pub fn bool_var(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}
