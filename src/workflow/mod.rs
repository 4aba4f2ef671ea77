//! The workflow transition table.
//!
//! A workflow is an ordered set of states. Each non-terminal state has one
//! forward transition (`next`), taken when its completion rule is satisfied
//! or its iteration cap is exhausted, plus optional `routes` an agent may
//! request explicitly. Exactly one state is terminal; it is left only by the
//! restart or close commands.

mod table;


use crate::validate::ValidationRule;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use table::WorkflowTable;

/// Identifier of a workflow state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateId(String);

impl StateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StateId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for StateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A resolved state definition.
#[derive(Debug, Clone, PartialEq)]
pub struct StateDef {
    pub id: StateId,
    pub description: String,
    pub completion_criteria: String,

    /// Agent profile id. `None` only for the terminal state.
    pub agent: Option<String>,

    /// Artifact owned by this state.
    pub produces: Option<String>,

    /// Artifacts owned elsewhere that this state may update.
    pub refines: Vec<String>,

    pub rule: ValidationRule,
    pub next: Option<StateId>,
    pub routes: Vec<StateId>,
    pub max_iterations: u32,
    pub terminal: bool,
}

impl StateDef {
    /// Whether an agent in this state may write `artifact`.
    pub fn may_write(&self, artifact: &str) -> bool {
        self.produces.as_deref() == Some(artifact) || self.refines.iter().any(|a| a == artifact)
    }

    /// Whether `target` is one of this state's explicit routes.
    pub fn has_route(&self, target: &StateId) -> bool {
        self.routes.contains(target)
    }
}
