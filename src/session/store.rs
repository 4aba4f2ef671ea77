//! On-disk session storage: one JSON document per session.

use super::{SESSION_VERSION, SessionState};
use crate::context::FlowContext;
use crate::error::{FlowError, Result};
use crate::fs::atomic_write_json;
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::LazyLock;
use tracing::debug;

/// Session ids double as file names.
static SESSION_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$").expect("Invalid session ID regex")
});

/// Check that a session id is safe to use as a file name.
pub fn validate_session_id(id: &str) -> Result<()> {
    if SESSION_ID_REGEX.is_match(id) {
        Ok(())
    } else {
        Err(FlowError::UserError(format!(
            "invalid session id '{}': use 1-64 letters, digits, '_' or '-', starting with a letter or digit",
            id
        )))
    }
}

/// Loads and saves sessions under `.sdgflow/sessions/`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    ctx: FlowContext,
}

impl SessionStore {
    pub fn new(ctx: &FlowContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    fn path(&self, id: &str) -> Result<PathBuf> {
        validate_session_id(id)?;
        Ok(self.ctx.session_path(id))
    }

    /// Load a session. `Ok(None)` when it was never saved.
    pub fn load(&self, id: &str) -> Result<Option<SessionState>> {
        let path = self.path(id)?;

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(FlowError::Persistence(format!(
                    "failed to read '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        let state: SessionState = serde_json::from_str(&content).map_err(|e| {
            FlowError::Persistence(format!(
                "'{}' is not a valid session file: {} (use --fresh to start over)",
                path.display(),
                e
            ))
        })?;

        if state.version > SESSION_VERSION {
            return Err(FlowError::Persistence(format!(
                "'{}' has session version {}, newer than supported version {}",
                path.display(),
                state.version,
                SESSION_VERSION
            )));
        }
        if state.session_id != id {
            return Err(FlowError::Persistence(format!(
                "'{}' belongs to session '{}', not '{}'",
                path.display(),
                state.session_id,
                id
            )));
        }

        debug!(session = id, state = %state.current_state, "loaded session");
        Ok(Some(state))
    }

    /// Persist a session with a single atomic write.
    pub fn save(&self, state: &SessionState) -> Result<()> {
        let path = self.path(&state.session_id)?;
        atomic_write_json(&path, state)?;
        debug!(session = %state.session_id, state = %state.current_state, "saved session");
        Ok(())
    }

    /// Delete a saved session. Returns whether anything was removed.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let path = self.path(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FlowError::Persistence(format!(
                "failed to remove '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    /// Ids of every saved session, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let dir = &self.ctx.sessions_dir;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(dir).map_err(|e| {
            FlowError::Persistence(format!("failed to read '{}': {}", dir.display(), e))
        })?;

        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.strip_suffix(".json").map(str::to_string)
            })
            .filter(|id| SESSION_ID_REGEX.is_match(id))
            .collect();
        ids.sort();
        Ok(ids)
    }
}
