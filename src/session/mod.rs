//! Session state.
//!
//! A [`SessionState`] is a plain value. The controller takes one by value and
//! hands back either an updated copy or, when a turn fails, the value it was
//! given. Persistence is an explicit load/store through [`SessionStore`].

mod artifact;
mod store;

#[cfg(test)]
mod tests;

use crate::error::{FlowError, Result};
use crate::workflow::{StateId, WorkflowTable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use artifact::{Artifact, ArtifactContent};
pub use store::{SessionStore, validate_session_id};

/// Schema version of the persisted session document.
pub const SESSION_VERSION: u32 = 1;

/// How a state was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    /// Completion rule satisfied.
    Completed,
    /// Iteration cap exhausted.
    Forced,
    /// Agent-requested route.
    Routed,
    /// Restart command.
    Restarted,
    /// Close command.
    Closed,
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransitionKind::Completed => "completed",
            TransitionKind::Forced => "forced",
            TransitionKind::Routed => "routed",
            TransitionKind::Restarted => "restarted",
            TransitionKind::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// One entry of the session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The state that was left.
    pub state: StateId,
    /// The state entered, if any (closing enters nothing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<StateId>,
    pub outcome: TransitionKind,
    pub timestamp: DateTime<Utc>,
    /// Iterations spent in `state` before leaving it.
    #[serde(default)]
    pub iterations: u32,
}

/// The persisted state of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub version: u32,
    pub session_id: String,
    pub current_state: StateId,
    #[serde(default)]
    pub iteration_counts: BTreeMap<StateId, u32>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub artifacts: BTreeMap<String, Artifact>,
    #[serde(default)]
    pub ended: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    /// A fresh session positioned at `initial`.
    pub fn new(session_id: impl Into<String>, initial: StateId) -> Self {
        let now = Utc::now();
        let mut iteration_counts = BTreeMap::new();
        iteration_counts.insert(initial.clone(), 0);
        Self {
            version: SESSION_VERSION,
            session_id: session_id.into(),
            current_state: initial,
            iteration_counts,
            history: Vec::new(),
            artifacts: BTreeMap::new(),
            ended: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Iterations spent in the current state.
    pub fn iteration_count(&self) -> u32 {
        self.iteration_counts
            .get(&self.current_state)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn set_iteration_count(&mut self, count: u32) {
        self.iteration_counts
            .insert(self.current_state.clone(), count);
    }

    /// Move to `to`, recording how the current state was left.
    ///
    /// The counter of the entered state starts again at zero.
    pub(crate) fn enter(&mut self, to: StateId, outcome: TransitionKind) {
        let now = Utc::now();
        self.history.push(HistoryEntry {
            state: self.current_state.clone(),
            to: Some(to.clone()),
            outcome,
            timestamp: now,
            iterations: self.iteration_count(),
        });
        self.iteration_counts.insert(to.clone(), 0);
        self.current_state = to;
        self.updated_at = now;
    }

    /// Back to `initial` with artifacts and counters cleared.
    pub(crate) fn restart(&mut self, initial: StateId) {
        self.enter(initial, TransitionKind::Restarted);
        let initial = self.current_state.clone();
        self.artifacts.clear();
        self.iteration_counts.clear();
        self.iteration_counts.insert(initial, 0);
        self.ended = false;
    }

    /// Mark the session ended. No transitions are accepted afterwards.
    pub(crate) fn close(&mut self) {
        let now = Utc::now();
        self.history.push(HistoryEntry {
            state: self.current_state.clone(),
            to: None,
            outcome: TransitionKind::Closed,
            timestamp: now,
            iterations: self.iteration_count(),
        });
        self.ended = true;
        self.updated_at = now;
    }

    /// Fail when the session refers to states the workflow does not declare.
    pub fn check_against(&self, workflow: &WorkflowTable) -> Result<()> {
        if !workflow.contains(&self.current_state) {
            return Err(FlowError::Persistence(format!(
                "session '{}' is in state '{}', which the current workflow does not declare \
                 (use --fresh to start over)",
                self.session_id, self.current_state
            )));
        }
        Ok(())
    }
}
