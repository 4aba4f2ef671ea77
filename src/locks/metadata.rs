use crate::error::{FlowError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Contents of a lock file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockMetadata {
    /// `user@host` of the holder.
    pub owner: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    pub created_at: DateTime<Utc>,

    /// The command that took the lock (`run`, `send`, `reset`, ...).
    pub action: String,
}

impl LockMetadata {
    pub fn new(action: &str) -> Self {
        Self {
            owner: owner_string(),
            pid: Some(std::process::id()),
            created_at: Utc::now(),
            action: action.to_string(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FlowError::LockError(format!("failed to read lock file '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            FlowError::LockError(format!(
                "failed to parse lock file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FlowError::LockError(format!("failed to serialize lock metadata: {}", e)))
    }

    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Age as `3m`, `2h 5m` or `1d 4h`.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let minutes = age.num_minutes().max(0);
        let hours = age.num_hours().max(0);
        let days = age.num_days().max(0);

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else {
            format!("{}m", minutes)
        }
    }

    pub fn is_stale(&self, stale_minutes: u32) -> bool {
        self.age().num_minutes() > i64::from(stale_minutes)
    }
}

/// `user@host` for lock files and the event log.
pub(crate) fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
