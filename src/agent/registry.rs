//! The dispatch table from state id to agent.

use super::config::{AgentKind, AgentsConfig};
use super::{Agent, CommandAgent, InlineAgent};
use crate::context::FlowContext;
use crate::error::{FlowError, Result};
use crate::workflow::{StateId, WorkflowTable};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Maps every non-terminal state to the agent handling it.
#[derive(Default)]
pub struct AgentRegistry {
    agents: HashMap<StateId, Box<dyn Agent>>,
    labels: HashMap<StateId, String>,
}

impl fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.labels.iter()).finish()
    }
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `agent` to `state`, replacing any previous binding.
    pub fn register(&mut self, state: StateId, label: impl Into<String>, agent: Box<dyn Agent>) {
        self.labels.insert(state.clone(), label.into());
        self.agents.insert(state, agent);
    }

    /// The agent for a state.
    pub fn get(&self, state: &StateId) -> Option<&dyn Agent> {
        self.agents.get(state).map(|a| a.as_ref())
    }

    /// The profile id bound to a state, for messages and logs.
    pub fn label(&self, state: &StateId) -> Option<&str> {
        self.labels.get(state).map(String::as_str)
    }

    /// Every non-terminal state handled by the built-in inline agent.
    pub fn inline(workflow: &WorkflowTable) -> Self {
        let mut registry = Self::new();
        for state in workflow.states() {
            if let Some(agent_id) = &state.agent {
                registry.register(state.id.clone(), agent_id.clone(), Box::new(InlineAgent));
            }
        }
        registry
    }

    /// Build the table from `agents.yaml`.
    ///
    /// Without an agents config every state falls back to the inline agent.
    /// With one, every agent id the workflow uses must be declared.
    pub fn from_config(
        ctx: &FlowContext,
        workflow: &WorkflowTable,
        agents: Option<&AgentsConfig>,
    ) -> Result<Self> {
        let Some(config) = agents else {
            warn!(
                path = %ctx.agents_config_path().display(),
                "no agents config, every state uses the inline agent"
            );
            return Ok(Self::inline(workflow));
        };

        let mut registry = Self::new();
        for state in workflow.states() {
            let Some(agent_id) = &state.agent else {
                continue;
            };
            let profile = config.get(agent_id).ok_or_else(|| {
                FlowError::UserError(format!(
                    "state '{}' uses agent '{}', which agents.yaml does not declare",
                    state.id, agent_id
                ))
            })?;

            let agent: Box<dyn Agent> = match profile.kind {
                AgentKind::Inline => Box::new(InlineAgent),
                AgentKind::Command => {
                    Box::new(CommandAgent::new(agent_id, profile, &config.defaults, ctx, workflow)?)
                }
            };
            registry.register(state.id.clone(), agent_id.clone(), agent);
        }
        Ok(registry)
    }

    /// Fail unless every non-terminal state has an agent.
    pub fn check_bindings(&self, workflow: &WorkflowTable) -> Result<()> {
        let missing: Vec<&str> = workflow
            .states()
            .iter()
            .filter(|s| !s.terminal && !self.agents.contains_key(&s.id))
            .map(|s| s.id.as_str())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(FlowError::UserError(format!(
                "no agent bound to state(s): {}",
                missing.join(", ")
            )))
        }
    }
}
