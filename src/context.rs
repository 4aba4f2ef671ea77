//! Workspace context resolution for sdgflow.
//!
//! All persistent state lives under a single `.sdgflow/` directory inside the
//! workspace root:
//!
//! ```text
//! .sdgflow/
//!   config.yaml          workflow configuration
//!   agents.yaml          agent profiles
//!   sessions/<id>.json   persisted session state
//!   locks/<id>.lock      per-session lock files
//!   events/events.ndjson append-only audit log
//!   agents/<id>/         agent request files and output logs
//! ```
//!
//! Commands resolve a [`FlowContext`] first and derive every path from it,
//! so nothing else in the crate hardcodes a location.

use crate::error::{FlowError, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the state directory inside the workspace root.
pub const STATE_DIR_NAME: &str = ".sdgflow";

/// Resolved paths for one sdgflow workspace. All paths are absolute.
#[derive(Debug, Clone)]
pub struct FlowContext {
    /// The workspace root (the directory containing `.sdgflow/`).
    pub root: PathBuf,

    /// `{root}/.sdgflow`
    pub state_dir: PathBuf,

    /// `{root}/.sdgflow/sessions`
    pub sessions_dir: PathBuf,

    /// `{root}/.sdgflow/locks`
    pub locks_dir: PathBuf,
}

impl FlowContext {
    /// Resolve the context from an explicit directory, or the current
    /// working directory when `dir` is `None`.
    pub fn resolve(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(dir) => Self::resolve_from(dir),
            None => {
                let cwd = env::current_dir().map_err(|e| {
                    FlowError::UserError(format!(
                        "failed to get current working directory: {}",
                        e
                    ))
                })?;
                Self::resolve_from(cwd)
            }
        }
    }

    /// Resolve the context rooted at `root`.
    ///
    /// The root must exist; the `.sdgflow/` directory does not have to.
    pub fn resolve_from<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let root = root.canonicalize().map_err(|e| {
            FlowError::UserError(format!(
                "workspace directory '{}' is not accessible: {}",
                root.display(),
                e
            ))
        })?;

        let state_dir = root.join(STATE_DIR_NAME);
        Ok(Self {
            sessions_dir: state_dir.join("sessions"),
            locks_dir: state_dir.join("locks"),
            state_dir,
            root,
        })
    }

    /// Path to `config.yaml`.
    pub fn config_path(&self) -> PathBuf {
        self.state_dir.join("config.yaml")
    }

    /// Path to `agents.yaml`.
    pub fn agents_config_path(&self) -> PathBuf {
        self.state_dir.join("agents.yaml")
    }

    /// Directory holding the audit log.
    pub fn events_dir(&self) -> PathBuf {
        self.state_dir.join("events")
    }

    /// Path of the persisted state for a session.
    pub fn session_path(&self, session_id: &str) -> PathBuf {
        self.sessions_dir.join(format!("{}.json", session_id))
    }

    /// Path of the lock file for a session.
    pub fn session_lock_path(&self, session_id: &str) -> PathBuf {
        self.locks_dir.join(format!("{}.lock", session_id))
    }

    /// Working directory for a command agent's request and output files.
    pub fn agent_work_dir(&self, agent_id: &str) -> PathBuf {
        self.state_dir.join("agents").join(agent_id)
    }

    /// Whether `sdgflow init` has been run here.
    pub fn is_initialized(&self) -> bool {
        self.config_path().exists()
    }
}
