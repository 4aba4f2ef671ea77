//! One workspace, one session at a time.
//!
//! [`Workspace`] loads `config.yaml` and `agents.yaml` once and assembles the
//! controller. [`SessionHandle`] owns a single session for the life of a
//! command: it holds the session lock, persists the session after every turn
//! that changes it, and appends each turn to the event log.

use crate::agent::{AgentRegistry, AgentsConfig};
use crate::config::Config;
use crate::context::FlowContext;
use crate::controller::{Controller, Response};
use crate::error::Result;
use crate::events::{self, Event, EventAction};
use crate::locks::{LockGuard, acquire_session_lock};
use crate::session::{SessionState, SessionStore};
use crate::workflow::WorkflowTable;
use serde_json::json;
use tracing::{debug, info};

/// Configuration and controller for one `.sdgflow/` workspace.
#[derive(Debug)]
pub struct Workspace {
    pub ctx: FlowContext,
    pub config: Config,
    pub controller: Controller,
}

impl Workspace {
    /// Load configuration and bind agents. A missing `config.yaml` means
    /// defaults; a missing `agents.yaml` means inline agents everywhere.
    pub fn load(ctx: FlowContext) -> Result<Self> {
        let config = Config::load_or_default(ctx.config_path())?;
        let workflow = WorkflowTable::from_config(&config)?;
        let agents_config = AgentsConfig::load(ctx.agents_config_path())?;
        let agents = AgentRegistry::from_config(&ctx, &workflow, agents_config.as_ref())?;
        let controller = Controller::new(&config, workflow, agents, ctx.root.clone())?;
        Ok(Self {
            ctx,
            config,
            controller,
        })
    }

    pub fn store(&self) -> SessionStore {
        SessionStore::new(&self.ctx)
    }

    /// Take a session's lock for `action`.
    pub fn lock(&self, session_id: &str, action: &str) -> Result<LockGuard> {
        acquire_session_lock(&self.ctx, session_id, action, self.config.lock_stale_minutes)
    }
}

/// An open, locked session.
#[derive(Debug)]
pub struct SessionHandle<'w> {
    workspace: &'w Workspace,
    store: SessionStore,
    session: SessionState,
    _lock: LockGuard,
}

impl<'w> SessionHandle<'w> {
    /// Lock the session and load it, or create it when it does not exist.
    ///
    /// With `fresh`, any saved state is discarded first. A saved session
    /// whose state the workflow no longer declares is a persistence error.
    pub fn open(
        workspace: &'w Workspace,
        session_id: &str,
        action: &str,
        fresh: bool,
    ) -> Result<Self> {
        let lock = workspace.lock(session_id, action)?;
        let store = workspace.store();
        let controller = &workspace.controller;

        if fresh && store.remove(session_id)? {
            info!(session = session_id, "discarded saved session");
        }

        let (session, event) = match store.load(session_id)? {
            Some(session) => {
                session.check_against(controller.workflow())?;
                debug!(session = session_id, state = %session.current_state, "resumed session");
                (session, EventAction::SessionResume)
            }
            None => {
                let session = controller.new_session(session_id);
                store.save(&session)?;
                info!(session = session_id, state = %session.current_state, "started session");
                (session, EventAction::SessionStart)
            }
        };

        events::record(
            &workspace.ctx,
            &Event::new(event)
                .with_session(session_id)
                .with_details(json!({
                    "state": session.current_state,
                    "fresh": fresh,
                })),
        );

        Ok(Self {
            workspace,
            store,
            session,
            _lock: lock,
        })
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Run one turn.
    ///
    /// The new session state is saved before it replaces the in-memory one,
    /// so a failed save leaves both at the previous turn. An error the
    /// controller cannot recover from is returned as `Err` and ends the
    /// session; every other error travels inside the response.
    pub fn submit(&mut self, text: &str) -> Result<Response> {
        let from = self.session.current_state.clone();
        let turn = self.workspace.controller.handle_input(self.session.clone(), text);

        if turn.response.outcome.mutates() {
            self.store.save(&turn.session)?;
        }
        self.session = turn.session;

        let response = turn.response;
        let mut details = json!({
            "from": from,
            "state": self.session.current_state,
            "iteration": self.session.iteration_count(),
        });
        if let Some(error) = &response.error {
            details["error"] = json!(error.to_string());
        }
        events::record(
            &self.workspace.ctx,
            &Event::new(EventAction::from(&response.outcome))
                .with_session(&self.session.session_id)
                .with_details(details),
        );

        if let Some(error) = &response.error
            && !error.is_recoverable()
        {
            return Err(error.clone());
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::TurnOutcome;
    use crate::error::FlowError;
    use crate::test_support::{SEED_JSON, create_test_workspace};
    use std::fs;

    fn workspace(preset: &str) -> (tempfile::TempDir, Workspace) {
        let temp = create_test_workspace(preset);
        let ctx = FlowContext::resolve_from(temp.path()).unwrap();
        let ws = Workspace::load(ctx).unwrap();
        (temp, ws)
    }

    #[test]
    fn test_open_creates_and_saves_session() {
        let (_temp, ws) = workspace("skills");
        let handle = SessionHandle::open(&ws, "alpha", "run", false).unwrap();

        assert_eq!(handle.session().current_state.as_str(), "seed_data_creation");
        let saved = ws.store().load("alpha").unwrap().unwrap();
        assert_eq!(&saved, handle.session());
        assert!(ws.ctx.session_lock_path("alpha").exists());

        drop(handle);
        assert!(!ws.ctx.session_lock_path("alpha").exists());
    }

    #[test]
    fn test_turns_persist_and_resume() {
        let (_temp, ws) = workspace("skills");
        {
            let mut handle = SessionHandle::open(&ws, "alpha", "run", false).unwrap();
            let response = handle.submit(SEED_JSON).unwrap();
            assert!(matches!(response.outcome, TurnOutcome::Advanced { .. }));
        }

        let handle = SessionHandle::open(&ws, "alpha", "send", false).unwrap();
        assert_eq!(handle.session().current_state.as_str(), "seed_data_iteration");
        assert!(handle.session().artifacts.contains_key("seed_data"));
    }

    #[test]
    fn test_non_mutating_turns_are_not_saved() {
        let (_temp, ws) = workspace("skills");
        let mut handle = SessionHandle::open(&ws, "alpha", "run", false).unwrap();
        let path = ws.ctx.session_path("alpha");
        let before = fs::read_to_string(&path).unwrap();

        handle.submit("status").unwrap();
        handle.submit("/bogus").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), before);

        handle.submit("I need data about tides").unwrap();
        assert_ne!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_session_is_locked_while_open() {
        let (_temp, ws) = workspace("skills");
        let _handle = SessionHandle::open(&ws, "alpha", "run", false).unwrap();

        let err = SessionHandle::open(&ws, "alpha", "send", false).unwrap_err();
        assert!(matches!(err, FlowError::LockError(_)));

        // Other sessions are unaffected.
        SessionHandle::open(&ws, "beta", "send", false).unwrap();
    }

    #[test]
    fn test_fresh_discards_saved_state() {
        let (_temp, ws) = workspace("skills");
        {
            let mut handle = SessionHandle::open(&ws, "alpha", "run", false).unwrap();
            handle.submit(SEED_JSON).unwrap();
        }

        let handle = SessionHandle::open(&ws, "alpha", "run", true).unwrap();
        assert_eq!(handle.session().current_state.as_str(), "seed_data_creation");
        assert!(handle.session().history.is_empty());
    }

    #[test]
    fn test_session_from_other_workflow_is_rejected() {
        let (_temp, ws) = workspace("skills");
        let mut stray = ws.controller.new_session("alpha");
        stray.current_state = "greeting_intent".into();
        ws.store().save(&stray).unwrap();

        let err = SessionHandle::open(&ws, "alpha", "run", false).unwrap_err();
        assert!(matches!(err, FlowError::Persistence(_)));
        assert!(err.to_string().contains("--fresh"));
        // The lock is released again.
        assert!(!ws.ctx.session_lock_path("alpha").exists());

        SessionHandle::open(&ws, "alpha", "run", true).unwrap();
    }

    #[test]
    fn test_failed_save_keeps_previous_turn() {
        let (_temp, ws) = workspace("skills");
        let mut handle = SessionHandle::open(&ws, "alpha", "run", false).unwrap();
        let before = handle.session().clone();

        fs::remove_dir_all(&ws.ctx.sessions_dir).unwrap();
        fs::write(&ws.ctx.sessions_dir, "in the way").unwrap();

        let err = handle.submit(SEED_JSON).unwrap_err();
        assert!(matches!(err, FlowError::Persistence(_)));
        assert!(!err.is_recoverable());
        assert_eq!(handle.session(), &before);
    }

    #[test]
    fn test_unrecoverable_turn_error_is_returned() {
        let (_temp, ws) = workspace("skills");
        let mut handle = SessionHandle::open(&ws, "alpha", "run", false).unwrap();
        handle.session.current_state = "vanished".into();

        let err = handle.submit("hello").unwrap_err();
        assert!(matches!(err, FlowError::Persistence(_)));
        assert!(err.to_string().contains("'vanished'"));

        // Recoverable errors stay inside the response.
        handle.session.current_state = "seed_data_creation".into();
        let response = handle.submit("/bogus").unwrap();
        assert!(matches!(response.error, Some(FlowError::InvalidCommand(_))));
    }

    #[test]
    fn test_turns_are_logged() {
        let (_temp, ws) = workspace("skills");
        {
            let mut handle = SessionHandle::open(&ws, "alpha", "run", false).unwrap();
            handle.submit(SEED_JSON).unwrap();
            handle.submit("no").unwrap();
        }

        let actions: Vec<EventAction> = events::read_events(&ws.ctx, Some("alpha"))
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec![EventAction::SessionStart, EventAction::Transition, EventAction::Stay]
        );
    }

    #[test]
    fn test_workspace_with_bad_agents_config() {
        let temp = create_test_workspace("skills");
        fs::write(
            temp.path().join(".sdgflow/agents.yaml"),
            "agents:\n  seed_data_creator:\n    kind: inline\n",
        )
        .unwrap();
        let ctx = FlowContext::resolve_from(temp.path()).unwrap();

        let err = Workspace::load(ctx).unwrap_err();
        assert!(err.to_string().contains("which agents.yaml does not declare"));
    }
}
