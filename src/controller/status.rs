//! Read-only views of a session: status reports and help text.

use super::Controller;
use crate::session::{HistoryEntry, SessionState};
use crate::workflow::StateId;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactStatus {
    pub name: String,
    pub owner: StateId,
    pub summary: String,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot of a session for `status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub session_id: String,
    pub current_state: StateId,
    pub description: String,
    pub completion_criteria: String,
    pub rule: String,
    pub iteration_count: u32,
    pub max_iterations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<StateId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<StateId>,
    pub terminal: bool,
    pub ended: bool,
    pub artifacts: Vec<ArtifactStatus>,
    pub transitions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition: Option<HistoryEntry>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session:   {}", self.session_id)?;
        let mut state = self.current_state.to_string();
        if self.ended {
            state.push_str(" (closed)");
        } else if self.terminal {
            state.push_str(" (terminal)");
        }
        writeln!(f, "State:     {}", state)?;
        if !self.description.is_empty() {
            writeln!(f, "           {}", self.description)?;
        }
        if !self.terminal {
            writeln!(f, "Iteration: {}/{}", self.iteration_count, self.max_iterations)?;
        }
        if !self.completion_criteria.is_empty() {
            writeln!(f, "Criteria:  {}", self.completion_criteria)?;
        }
        writeln!(f, "Rule:      {}", self.rule)?;
        if let Some(next) = &self.next {
            writeln!(f, "Next:      {}", next)?;
        }
        if !self.routes.is_empty() {
            let routes: Vec<&str> = self.routes.iter().map(StateId::as_str).collect();
            writeln!(f, "Routes:    {}", routes.join(", "))?;
        }

        if self.artifacts.is_empty() {
            writeln!(f, "Artifacts: none")?;
        } else {
            writeln!(f, "Artifacts:")?;
            for a in &self.artifacts {
                writeln!(f, "  {} ({}, from {})", a.name, a.summary, a.owner)?;
            }
        }

        write!(f, "History:   {} transition(s)", self.transitions)?;
        if let Some(last) = &self.last_transition {
            let to = last
                .to
                .as_ref()
                .map(|s| format!(" -> {}", s))
                .unwrap_or_default();
            write!(f, ", last {}{} ({})", last.state, to, last.outcome)?;
        }
        Ok(())
    }
}

impl Controller {
    /// Build a status report. Never mutates the session.
    pub fn status(&self, session: &SessionState) -> StatusReport {
        let def = self.workflow.get(&session.current_state);

        StatusReport {
            session_id: session.session_id.clone(),
            current_state: session.current_state.clone(),
            description: def.map(|d| d.description.clone()).unwrap_or_default(),
            completion_criteria: def
                .map(|d| d.completion_criteria.clone())
                .unwrap_or_default(),
            rule: def.map(|d| d.rule.describe()).unwrap_or_default(),
            iteration_count: session.iteration_count(),
            max_iterations: def.map(|d| d.max_iterations).unwrap_or(0),
            next: def.and_then(|d| d.next.clone()),
            routes: def.map(|d| d.routes.clone()).unwrap_or_default(),
            terminal: def.is_some_and(|d| d.terminal),
            ended: session.ended,
            artifacts: session
                .artifacts
                .iter()
                .map(|(name, a)| ArtifactStatus {
                    name: name.clone(),
                    owner: a.owner.clone(),
                    summary: a.summary(),
                    updated_at: a.updated_at,
                })
                .collect(),
            transitions: session.history.len(),
            last_transition: session.history.last().cloned(),
        }
    }

    /// Help text for the session's current position.
    pub fn help(&self, session: &SessionState) -> String {
        let mut out = String::from("Commands:\n");
        out.push_str("  status              show where the session stands\n");
        out.push_str("  help                show this text\n");
        out.push_str(&format!(
            "  {:<19} back to the first state, clearing all artifacts\n",
            self.commands.restart_aliases().join(" | ")
        ));
        out.push_str(&format!(
            "  {:<19} end the session\n",
            self.commands.close_aliases().join(" | ")
        ));
        out.push_str("  Prefix with '/' to force a command, e.g. /status\n");

        if session.ended {
            out.push_str("\nThis session is closed. Only status and help are available.");
            return out;
        }

        let Some(def) = self.workflow.get(&session.current_state) else {
            return out;
        };

        out.push_str(&format!("\nCurrent state: {}\n", def.id));
        if !def.description.is_empty() {
            out.push_str(&format!("  {}\n", def.description));
        }
        if def.terminal {
            out.push_str("  Say 'restart' to begin again or 'close' to finish.");
        } else {
            if !def.completion_criteria.is_empty() {
                out.push_str(&format!("  To move on: {}\n", def.completion_criteria));
            }
            out.push_str(&format!(
                "  After {} unsuccessful attempt(s) the session moves on regardless.",
                def.max_iterations
            ));
            if !def.routes.is_empty() {
                let routes: Vec<&str> = def.routes.iter().map(StateId::as_str).collect();
                out.push_str(&format!("\n  You can also switch to: {}", routes.join(", ")));
            }
        }
        out
    }
}
