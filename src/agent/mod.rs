//! Agent collaborators.
//!
//! The controller never looks inside an agent. It hands one an
//! [`AgentInput`] and gets back an [`AgentOutput`]: a message for the user,
//! an artifact delta, and optional approval, completion and route signals.
//!
//! - **Config**: agent profiles (`agents.yaml`)
//! - **Registry**: the dispatch table from state id to agent
//! - **Inline**: the built-in agent that records structured input directly
//! - **Command**: external processes speaking JSON, run with a timeout

mod command;
mod config;
mod inline;
mod registry;
pub mod template;

use crate::error::Result;
use crate::session::{Artifact, ArtifactContent};
use crate::validate::ApprovalSignal;
use crate::workflow::{StateDef, StateId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use command::CommandAgent;
pub use config::AgentsConfig;
pub use inline::InlineAgent;
pub use registry::AgentRegistry;

/// What an agent sees for one turn.
#[derive(Debug, Clone, Copy)]
pub struct AgentInput<'a> {
    pub session_id: &'a str,
    pub state: &'a StateDef,
    pub text: &'a str,
    pub artifacts: &'a BTreeMap<String, Artifact>,
    /// Iterations already spent in this state.
    pub iteration: u32,
}

/// What an agent returns for one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentOutput {
    /// Reply shown to the user.
    pub message: String,

    /// New or updated artifacts.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub artifacts: BTreeMap<String, ArtifactContent>,

    /// Explicit approval signal. When absent the controller classifies the
    /// user's text itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalSignal>,

    /// The agent considers its work for this state done.
    pub completed: bool,

    /// Request to move to one of the state's routes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<StateId>,
}

impl AgentOutput {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// An external collaborator responsible for one or more states.
///
/// A returned error of any kind is treated as an agent failure: the turn is
/// rolled back and the session stays where it was.
pub trait Agent: Send + Sync {
    fn handle(&self, input: &AgentInput<'_>) -> Result<AgentOutput>;
}
