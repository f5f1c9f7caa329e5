//! Durable run checkpoint: a catalog cursor plus a running total.
//!
//! Written via temp-file + fsync + atomic rename, so a crash mid-write
//! leaves the previous checkpoint intact. An absent file means "start
//! from the beginning"; so does an unreadable or malformed one.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Id of the last item yielded and fully dispatched. Resuming queries
    /// strictly after this key.
    pub last_id: Option<Uuid>,
    /// Items emitted so far across the whole run history.
    pub total: u64,
}

impl Checkpoint {
    pub fn empty() -> Self {
        Self {
            last_id: None,
            total: 0,
        }
    }
}

/// Load a checkpoint, treating any unreadable content as absent.
pub fn load(path: &Path) -> Option<Checkpoint> {
    if !path.exists() {
        return None;
    }
    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(checkpoint) => Some(checkpoint),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed checkpoint, ignoring");
                None
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable checkpoint, ignoring");
            None
        }
    }
}

/// Persist a checkpoint atomically.
pub fn save(path: &Path, checkpoint: &Checkpoint) -> Result<()> {
    let tmp = tmp_path(path);
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(&serde_json::to_vec(checkpoint)?)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}
