//! Append-only audit log.
//!
//! Every turn and every administrative action appends one JSON object to
//! `.sdgflow/events/events.ndjson`:
//!
//! - `id`: unique event id (UUID v4)
//! - `ts`: RFC3339 timestamp
//! - `action`: what happened (`transition`, `stay`, `rollback`, `lock_clear`, ...)
//! - `actor`: `user@host`
//! - `session`: the session id, when the event concerns one
//! - `details`: freeform object
//!
//! The session file is the source of truth; the log is for audit. A failed
//! append is logged and otherwise ignored by [`record`].

use crate::context::FlowContext;
use crate::controller::TurnOutcome;
use crate::error::{FlowError, Result};
use crate::locks::owner_string;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    Init,
    SessionStart,
    SessionResume,
    /// A status or help command.
    Command,
    Stay,
    Transition,
    ForcedTransition,
    Route,
    Rollback,
    Restart,
    Close,
    Prompt,
    Rejected,
    /// `sdgflow reset` deleted a session.
    Reset,
    LockClear,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::Init => "init",
            EventAction::SessionStart => "session_start",
            EventAction::SessionResume => "session_resume",
            EventAction::Command => "command",
            EventAction::Stay => "stay",
            EventAction::Transition => "transition",
            EventAction::ForcedTransition => "forced_transition",
            EventAction::Route => "route",
            EventAction::Rollback => "rollback",
            EventAction::Restart => "restart",
            EventAction::Close => "close",
            EventAction::Prompt => "prompt",
            EventAction::Rejected => "rejected",
            EventAction::Reset => "reset",
            EventAction::LockClear => "lock_clear",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&TurnOutcome> for EventAction {
    fn from(outcome: &TurnOutcome) -> Self {
        match outcome {
            TurnOutcome::Command => EventAction::Command,
            TurnOutcome::Stayed => EventAction::Stay,
            TurnOutcome::Advanced { .. } => EventAction::Transition,
            TurnOutcome::Forced { .. } => EventAction::ForcedTransition,
            TurnOutcome::Routed { .. } => EventAction::Route,
            TurnOutcome::RolledBack => EventAction::Rollback,
            TurnOutcome::Restarted => EventAction::Restart,
            TurnOutcome::Closed => EventAction::Close,
            TurnOutcome::Prompted => EventAction::Prompt,
            TurnOutcome::Rejected => EventAction::Rejected,
        }
    }
}

/// One line of the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub ts: DateTime<Utc>,
    pub action: EventAction,
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    pub details: Value,
}

impl Event {
    pub fn new(action: EventAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            ts: Utc::now(),
            action,
            actor: owner_string(),
            session: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session = Some(session_id.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| FlowError::Persistence(format!("failed to serialize event: {}", e)))
    }
}

pub fn events_file_path(ctx: &FlowContext) -> PathBuf {
    ctx.events_dir().join("events.ndjson")
}

/// Append one event as a line of `events.ndjson`, creating the file and
/// directory as needed.
pub fn append_event(ctx: &FlowContext, event: &Event) -> Result<()> {
    let events_file = events_file_path(ctx);
    let line = event.to_ndjson_line()?;

    let events_dir = ctx.events_dir();
    fs::create_dir_all(&events_dir).map_err(|e| {
        FlowError::Persistence(format!(
            "failed to create events directory '{}': {}",
            events_dir.display(),
            e
        ))
    })?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&events_file)
        .map_err(|e| {
            FlowError::Persistence(format!(
                "failed to open events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    writeln!(file, "{}", line)
        .and_then(|()| file.sync_all())
        .map_err(|e| {
            FlowError::Persistence(format!(
                "failed to write event to '{}': {}",
                events_file.display(),
                e
            ))
        })
}

/// Append an event, logging instead of failing.
pub fn record(ctx: &FlowContext, event: &Event) {
    if let Err(e) = append_event(ctx, event) {
        warn!(action = %event.action, error = %e, "failed to append event");
    }
}

/// Read the log back, optionally only one session's events. Lines that do
/// not parse are skipped.
#[cfg(test)]
pub fn read_events(ctx: &FlowContext, session: Option<&str>) -> Result<Vec<Event>> {
    let path = events_file_path(ctx);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(&path).map_err(|e| {
        FlowError::Persistence(format!(
            "failed to read events file '{}': {}",
            path.display(),
            e
        ))
    })?;

    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str::<Event>(line).ok())
        .filter(|event| session.is_none() || event.session.as_deref() == session)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::StateId;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_context() -> (TempDir, FlowContext) {
        let temp_dir = TempDir::new().unwrap();
        let ctx = FlowContext::resolve_from(temp_dir.path()).unwrap();
        (temp_dir, ctx)
    }

    #[test]
    fn test_event_creation() {
        let event = Event::new(EventAction::SessionStart).with_session("alpha");

        assert_eq!(event.action, EventAction::SessionStart);
        assert!(event.actor.contains('@'));
        assert_eq!(event.session.as_deref(), Some("alpha"));
        assert!(Utc::now().signed_duration_since(event.ts).num_minutes() < 1);
        assert_ne!(event.id, Event::new(EventAction::SessionStart).id);
    }

    #[test]
    fn test_ndjson_line_shape() {
        let event = Event::new(EventAction::ForcedTransition)
            .with_session("alpha")
            .with_details(json!({"from": "seed_data_iteration", "to": "data_generation"}));

        let line = event.to_ndjson_line().unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("\"forced_transition\""));

        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["details"]["to"], "data_generation");
        assert_eq!(parsed["session"], "alpha");
    }

    #[test]
    fn test_session_field_omitted_when_absent() {
        let line = Event::new(EventAction::Init).to_ndjson_line().unwrap();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert!(parsed.get("session").is_none());
    }

    #[test]
    fn test_actions_from_outcomes() {
        let to = StateId::from("b");
        assert_eq!(EventAction::from(&TurnOutcome::Stayed), EventAction::Stay);
        assert_eq!(
            EventAction::from(&TurnOutcome::Advanced { to: to.clone() }),
            EventAction::Transition
        );
        assert_eq!(
            EventAction::from(&TurnOutcome::Forced { to: to.clone() }),
            EventAction::ForcedTransition
        );
        assert_eq!(EventAction::from(&TurnOutcome::Routed { to }), EventAction::Route);
        assert_eq!(EventAction::from(&TurnOutcome::RolledBack), EventAction::Rollback);

        // The action names line up with the outcome names.
        for outcome in [TurnOutcome::Command, TurnOutcome::Restarted, TurnOutcome::Closed] {
            assert_eq!(EventAction::from(&outcome).as_str(), outcome.name());
        }
    }

    #[test]
    fn test_append_creates_file_and_directory() {
        let (_temp, ctx) = create_test_context();
        assert!(!ctx.events_dir().exists());

        append_event(&ctx, &Event::new(EventAction::Init)).unwrap();
        append_event(&ctx, &Event::new(EventAction::Stay).with_session("alpha")).unwrap();

        let content = fs::read_to_string(events_file_path(&ctx)).unwrap();
        assert!(content.ends_with('\n'));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_read_events_filters_by_session() {
        let (_temp, ctx) = create_test_context();
        record(&ctx, &Event::new(EventAction::SessionStart).with_session("alpha"));
        record(&ctx, &Event::new(EventAction::SessionStart).with_session("beta"));
        record(&ctx, &Event::new(EventAction::Transition).with_session("alpha"));

        let mut file = OpenOptions::new()
            .append(true)
            .open(events_file_path(&ctx))
            .unwrap();
        writeln!(file, "not json").unwrap();

        assert_eq!(read_events(&ctx, None).unwrap().len(), 3);
        let alpha: Vec<EventAction> = read_events(&ctx, Some("alpha"))
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(alpha, vec![EventAction::SessionStart, EventAction::Transition]);
    }

    #[test]
    fn test_read_events_without_log() {
        let (_temp, ctx) = create_test_context();
        assert!(read_events(&ctx, None).unwrap().is_empty());
    }

    #[test]
    fn test_record_swallows_failures() {
        let (temp, ctx) = create_test_context();
        // A file where the events directory should be.
        fs::create_dir_all(&ctx.state_dir).unwrap();
        fs::write(ctx.events_dir(), "in the way").unwrap();

        record(&ctx, &Event::new(EventAction::Init));
        assert!(append_event(&ctx, &Event::new(EventAction::Init)).is_err());
        drop(temp);
    }
}
