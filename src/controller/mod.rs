//! The state controller.
//!
//! [`Controller::handle_input`] takes a session by value and returns a
//! [`Turn`]: the session to keep and a response for the user. Each turn is
//! all-or-nothing. When the agent fails, or writes an artifact it does not
//! own, the session handed in comes back untouched.
//!
//! Turn order:
//! 1. session commands (`status`, `help`, restart and close aliases)
//! 2. closed sessions reject everything else
//! 3. the terminal state only understands restart and close keywords
//! 4. otherwise the agent bound to the current state runs, its artifact delta
//!    is applied, and the state's rule decides between advancing, staying,
//!    or a forced advance once the iteration cap is used up

mod commands;
mod status;


use crate::agent::{AgentInput, AgentOutput, AgentRegistry};
use crate::config::Config;
use crate::error::{FlowError, Result};
use crate::session::{Artifact, ArtifactContent, SessionState, TransitionKind};
use crate::validate::{ApprovalRecognizer, ApprovalSignal, RuleContext, RuleOutcome};
use crate::workflow::{StateDef, StateId, WorkflowTable};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use commands::{CommandParser, ParsedInput, SessionCommand, TerminalKeywords};

/// What a turn did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// `status` or `help`; nothing changed.
    Command,
    /// The rule is not met yet; the iteration counter went up.
    Stayed,
    /// The rule was met and the session moved forward.
    Advanced { to: StateId },
    /// The iteration cap was used up and the session moved forward anyway.
    Forced { to: StateId },
    /// The agent chose one of the state's routes.
    Routed { to: StateId },
    /// The agent failed; nothing changed.
    RolledBack,
    Restarted,
    Closed,
    /// The terminal menu was shown again; nothing changed.
    Prompted,
    /// The input was refused; nothing changed.
    Rejected,
}

impl TurnOutcome {
    /// Whether the turn changed the session and it should be persisted.
    pub fn mutates(&self) -> bool {
        !matches!(
            self,
            TurnOutcome::Command
                | TurnOutcome::RolledBack
                | TurnOutcome::Prompted
                | TurnOutcome::Rejected
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            TurnOutcome::Command => "command",
            TurnOutcome::Stayed => "stay",
            TurnOutcome::Advanced { .. } => "transition",
            TurnOutcome::Forced { .. } => "forced_transition",
            TurnOutcome::Routed { .. } => "route",
            TurnOutcome::RolledBack => "rollback",
            TurnOutcome::Restarted => "restart",
            TurnOutcome::Closed => "close",
            TurnOutcome::Prompted => "prompt",
            TurnOutcome::Rejected => "rejected",
        }
    }
}

/// The controller's answer for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub outcome: TurnOutcome,
    pub message: String,
    /// The recovered error behind this outcome, if any.
    pub error: Option<FlowError>,
}

/// Result of [`Controller::handle_input`].
#[derive(Debug, Clone)]
pub struct Turn {
    pub session: SessionState,
    pub response: Response,
}

impl Turn {
    fn new(session: SessionState, outcome: TurnOutcome, message: impl Into<String>) -> Self {
        Self {
            session,
            response: Response {
                outcome,
                message: message.into(),
                error: None,
            },
        }
    }

    fn with_error(mut self, error: FlowError) -> Self {
        self.response.error = Some(error);
        self
    }
}

/// Drives sessions through a workflow table.
#[derive(Debug)]
pub struct Controller {
    workflow: WorkflowTable,
    agents: AgentRegistry,
    recognizer: ApprovalRecognizer,
    commands: CommandParser,
    terminal_keywords: TerminalKeywords,
    base_dir: PathBuf,
}

impl Controller {
    /// Assemble a controller. Every non-terminal state must have an agent.
    ///
    /// `base_dir` is where relative artifact file references resolve.
    pub fn new(
        config: &Config,
        workflow: WorkflowTable,
        agents: AgentRegistry,
        base_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        agents.check_bindings(&workflow)?;
        Ok(Self {
            recognizer: ApprovalRecognizer::new(
                &config.approval.affirmative,
                &config.approval.negative,
            )?,
            commands: CommandParser::new(&config.commands),
            terminal_keywords: TerminalKeywords::new(&config.terminal)?,
            workflow,
            agents,
            base_dir: base_dir.into(),
        })
    }

    pub fn workflow(&self) -> &WorkflowTable {
        &self.workflow
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    /// A new session positioned at the initial state.
    pub fn new_session(&self, session_id: impl Into<String>) -> SessionState {
        SessionState::new(session_id, self.workflow.initial().clone())
    }

    /// Process one piece of user input.
    pub fn handle_input(&self, session: SessionState, text: &str) -> Turn {
        debug!(session = %session.session_id, state = %session.current_state, "handling input");

        match self.commands.parse(text) {
            ParsedInput::Command(cmd) => return self.run_command(session, cmd),
            ParsedInput::Invalid(name) => {
                let err = FlowError::InvalidCommand(name);
                return Turn::new(session, TurnOutcome::Rejected, err.to_string()).with_error(err);
            }
            ParsedInput::Input => {}
        }

        if session.ended {
            return closed(session);
        }

        if text.trim().is_empty() {
            let err = FlowError::UserError("empty input".to_string());
            return Turn::new(
                session,
                TurnOutcome::Rejected,
                "Nothing to do: the input is empty. Type 'help' for options.",
            )
            .with_error(err);
        }

        let Some(state) = self.workflow.get(&session.current_state).cloned() else {
            let err = FlowError::Persistence(format!(
                "session is in undeclared state '{}'",
                session.current_state
            ));
            return Turn::new(session, TurnOutcome::Rejected, err.to_string()).with_error(err);
        };

        if state.terminal {
            return match self.terminal_keywords.classify(text) {
                Some(cmd) => self.run_command(session, cmd),
                None => Turn::new(
                    session,
                    TurnOutcome::Prompted,
                    "This session is complete. Say 'restart' to begin again or 'close' to finish.",
                ),
            };
        }

        self.agent_turn(session, &state, text)
    }

    fn run_command(&self, session: SessionState, cmd: SessionCommand) -> Turn {
        match cmd {
            SessionCommand::Status => {
                let report = self.status(&session).to_string();
                Turn::new(session, TurnOutcome::Command, report)
            }
            SessionCommand::Help => {
                let help = self.help(&session);
                Turn::new(session, TurnOutcome::Command, help)
            }
            _ if session.ended => closed(session),
            SessionCommand::Restart => {
                let mut next = session;
                let from = next.current_state.clone();
                next.restart(self.workflow.initial().clone());
                info!(session = %next.session_id, from = %from, "session restarted");
                let message = format!(
                    "Starting over. Artifacts cleared; back to '{}'.{}",
                    next.current_state,
                    self.describe(&next.current_state)
                );
                Turn::new(next, TurnOutcome::Restarted, message)
            }
            SessionCommand::Close => {
                let mut next = session;
                next.close();
                info!(session = %next.session_id, state = %next.current_state, "session closed");
                Turn::new(next, TurnOutcome::Closed, "Session closed. Goodbye.")
            }
        }
    }

    fn agent_turn(&self, session: SessionState, state: &StateDef, text: &str) -> Turn {
        let label = self.agents.label(&state.id).unwrap_or("(unbound)").to_string();

        let output = match self.agents.get(&state.id) {
            Some(agent) => agent.handle(&AgentInput {
                session_id: &session.session_id,
                state,
                text,
                artifacts: &session.artifacts,
                iteration: session.iteration_count(),
            }),
            None => Err(FlowError::agent(&label, "no agent is bound to this state")),
        };

        let output = match output {
            Ok(output) => output,
            Err(e) => return rollback(session, &label, e),
        };

        let AgentOutput {
            message,
            artifacts,
            approval,
            completed,
            route,
        } = output;

        // A turn that delivers an artifact is a submission, not a verdict on
        // the artifact, whatever words the artifact happens to contain.
        let submitted = !artifacts.is_empty();
        let mut next = session.clone();
        if let Err(e) = self.apply_delta(&mut next, state, &label, artifacts) {
            return rollback(session, &label, e);
        }

        if let Some(target) = route {
            if state.has_route(&target) {
                next.enter(target.clone(), TransitionKind::Routed);
                info!(session = %next.session_id, from = %state.id, to = %target, "routed");
                let message = join(&message, &format!(
                    "Switched to '{}'.{}",
                    target,
                    self.describe(&target)
                ));
                return Turn::new(next, TurnOutcome::Routed { to: target }, message);
            }
            warn!(
                session = %next.session_id,
                state = %state.id,
                route = %target,
                "agent requested a route this state does not allow; ignoring it"
            );
        }

        let approval = approval.unwrap_or_else(|| {
            if submitted {
                ApprovalSignal::Inconclusive
            } else {
                self.recognizer.classify(text)
            }
        });
        debug!(state = %state.id, %approval, completed, "evaluating rule");
        let outcome = state.rule.evaluate(&RuleContext {
            artifacts: &next.artifacts,
            approval,
            completed,
            base_dir: &self.base_dir,
        });

        match outcome {
            RuleOutcome::Satisfied => self.advance(next, state, &message),
            RuleOutcome::Pending(reason) => self.stay_or_force(next, state, &message, &reason, None),
            RuleOutcome::Failed(err) => {
                let reason = err.to_string();
                self.stay_or_force(next, state, &message, &reason, Some(err))
            }
        }
    }

    /// Apply an artifact delta, enforcing ownership.
    fn apply_delta(
        &self,
        session: &mut SessionState,
        state: &StateDef,
        agent: &str,
        delta: BTreeMap<String, ArtifactContent>,
    ) -> Result<()> {
        for (name, content) in delta {
            if !state.may_write(&name) {
                let owner = self
                    .workflow
                    .owner_of(&name)
                    .map(|o| format!(", which belongs to '{}'", o))
                    .unwrap_or_default();
                return Err(FlowError::agent(
                    agent,
                    format!(
                        "wrote artifact '{}'{} from state '{}'",
                        name, owner, state.id
                    ),
                ));
            }

            let owner = match session.artifacts.get(&name) {
                Some(existing) => existing.owner.clone(),
                None => self
                    .workflow
                    .owner_of(&name)
                    .cloned()
                    .unwrap_or_else(|| state.id.clone()),
            };
            session.artifacts.insert(name, Artifact::new(owner, content));
        }
        Ok(())
    }

    fn advance(&self, mut next: SessionState, state: &StateDef, message: &str) -> Turn {
        let Some(to) = state.next.clone() else {
            return Turn::new(next, TurnOutcome::Stayed, message);
        };
        next.enter(to.clone(), TransitionKind::Completed);
        info!(session = %next.session_id, from = %state.id, to = %to, "state complete");
        let note = format!(
            "'{}' complete. Moving on to '{}'.{}",
            state.id,
            to,
            self.describe(&to)
        );
        Turn::new(next, TurnOutcome::Advanced { to }, join(message, &note))
    }

    fn stay_or_force(
        &self,
        mut next: SessionState,
        state: &StateDef,
        message: &str,
        reason: &str,
        failure: Option<FlowError>,
    ) -> Turn {
        let count = next.iteration_count() + 1;

        if count <= state.max_iterations {
            next.set_iteration_count(count);
            next.updated_at = chrono::Utc::now();
            debug!(state = %state.id, count, max = state.max_iterations, reason, "staying");
            let note = format!(
                "Still in '{}' (attempt {}/{}): {}",
                state.id, count, state.max_iterations, reason
            );
            let turn = Turn::new(next, TurnOutcome::Stayed, join(message, &note));
            return match failure {
                Some(err) => turn.with_error(err),
                None => turn,
            };
        }

        let Some(to) = state.next.clone() else {
            return Turn::new(next, TurnOutcome::Stayed, message);
        };

        let error = if state.rule.requires_approval() {
            Some(FlowError::ApprovalTimeout {
                state: state.id.to_string(),
                iterations: state.max_iterations,
            })
        } else {
            failure
        };

        next.set_iteration_count(count);
        next.enter(to.clone(), TransitionKind::Forced);
        warn!(
            session = %next.session_id,
            from = %state.id,
            to = %to,
            max = state.max_iterations,
            "iteration cap reached, forcing transition"
        );

        let note = format!(
            "Reached the limit of {} attempt(s) in '{}' ({}). Moving on to '{}'.{}",
            state.max_iterations,
            state.id,
            reason,
            to,
            self.describe(&to)
        );
        let turn = Turn::new(next, TurnOutcome::Forced { to }, join(message, &note));
        match error {
            Some(err) => turn.with_error(err),
            None => turn,
        }
    }

    fn describe(&self, id: &StateId) -> String {
        match self.workflow.get(id) {
            Some(def) if !def.description.is_empty() => format!(" {}.", def.description),
            _ => String::new(),
        }
    }
}

fn rollback(session: SessionState, agent: &str, error: FlowError) -> Turn {
    let error = match error {
        e @ FlowError::AgentFailure { .. } => e,
        other => FlowError::agent(agent, other.to_string()),
    };
    warn!(
        session = %session.session_id,
        state = %session.current_state,
        agent,
        error = %error,
        "agent failed, rolling back"
    );
    let message = format!(
        "{}. Nothing was changed; you are still in '{}'. Please try again.",
        error, session.current_state
    );
    Turn::new(session, TurnOutcome::RolledBack, message).with_error(error)
}

fn closed(session: SessionState) -> Turn {
    Turn::new(
        session,
        TurnOutcome::Rejected,
        "This session is closed. Only 'status' and 'help' are available.",
    )
}

fn join(message: &str, note: &str) -> String {
    let message = message.trim();
    if message.is_empty() {
        note.to_string()
    } else {
        format!("{}\n\n{}", message, note)
    }
}
