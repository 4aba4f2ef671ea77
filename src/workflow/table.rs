//! Building and querying the workflow table.

use super::{StateDef, StateId};
use crate::config::{Config, StateConfig};
use crate::error::{FlowError, Result};
use crate::validate::ArtifactFormat;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// The validated transition table.
#[derive(Debug, Clone)]
pub struct WorkflowTable {
    states: Vec<StateDef>,
    index: HashMap<StateId, usize>,
    initial: StateId,
    terminal: StateId,
}

impl WorkflowTable {
    /// Build the table described by a config (inline states or preset).
    pub fn from_config(config: &Config) -> Result<Self> {
        let (initial, rows) = config.workflow_states()?;
        let rows = rows
            .into_iter()
            .map(|row| {
                let max = config.max_iterations_for(&row);
                (row, max)
            })
            .collect();
        Self::build(&initial, rows)
    }

    /// Build and validate a table from rows paired with their iteration caps.
    pub fn build(initial: &str, rows: Vec<(StateConfig, u32)>) -> Result<Self> {
        if rows.is_empty() {
            return Err(invalid("the workflow has no states"));
        }

        let mut states = Vec::with_capacity(rows.len());
        let mut index = HashMap::new();

        for (row, max_iterations) in rows {
            let id = row.id.trim();
            if id.is_empty() || id.chars().any(char::is_whitespace) {
                return Err(invalid(format!(
                    "state id '{}' must be non-empty and contain no whitespace",
                    row.id
                )));
            }
            if max_iterations == 0 {
                return Err(invalid(format!(
                    "state '{}' must allow at least one iteration",
                    id
                )));
            }
            row.rule.check_definition(id)?;

            let id = StateId::from(id);
            if index.insert(id.clone(), states.len()).is_some() {
                return Err(invalid(format!("state '{}' is declared twice", id)));
            }

            let agent = if row.terminal {
                None
            } else {
                Some(row.agent.unwrap_or_else(|| id.to_string()))
            };

            states.push(StateDef {
                description: row.description,
                completion_criteria: row.completion_criteria,
                agent,
                produces: row.produces,
                refines: row.refines,
                rule: row.rule,
                next: row.next.map(StateId::from),
                routes: row.routes.into_iter().map(StateId::from).collect(),
                max_iterations,
                terminal: row.terminal,
                id,
            });
        }

        let initial = StateId::from(initial);
        if !index.contains_key(&initial) {
            return Err(invalid(format!("initial state '{}' is not declared", initial)));
        }

        let terminals: Vec<&StateDef> = states.iter().filter(|s| s.terminal).collect();
        let terminal = match terminals.as_slice() {
            [one] => one.id.clone(),
            [] => return Err(invalid("no state is marked terminal")),
            many => {
                let ids: Vec<&str> = many.iter().map(|s| s.id.as_str()).collect();
                return Err(invalid(format!(
                    "exactly one state may be terminal, found: {}",
                    ids.join(", ")
                )));
            }
        };
        if terminal == initial {
            return Err(invalid(format!(
                "initial state '{}' cannot be the terminal state",
                initial
            )));
        }

        let table = Self {
            states,
            index,
            initial,
            terminal,
        };
        table.check_transitions()?;
        table.check_ownership()?;
        table.check_forward_chain()?;
        Ok(table)
    }

    fn check_transitions(&self) -> Result<()> {
        for state in &self.states {
            if state.terminal {
                if state.next.is_some() || !state.routes.is_empty() {
                    return Err(invalid(format!(
                        "terminal state '{}' cannot have next or routes",
                        state.id
                    )));
                }
                continue;
            }

            let next = state.next.as_ref().ok_or_else(|| {
                invalid(format!("state '{}' has no next state", state.id))
            })?;

            for target in std::iter::once(next).chain(&state.routes) {
                if !self.contains(target) {
                    return Err(invalid(format!(
                        "state '{}' points to undeclared state '{}'",
                        state.id, target
                    )));
                }
                if target == &state.id {
                    return Err(invalid(format!(
                        "state '{}' cannot transition to itself",
                        state.id
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_ownership(&self) -> Result<()> {
        let mut owners: BTreeMap<&str, &StateId> = BTreeMap::new();
        for state in &self.states {
            if let Some(artifact) = &state.produces
                && let Some(previous) = owners.insert(artifact, &state.id)
            {
                return Err(invalid(format!(
                    "artifact '{}' is produced by both '{}' and '{}'",
                    artifact, previous, state.id
                )));
            }
        }

        for state in &self.states {
            for artifact in &state.refines {
                match owners.get(artifact.as_str()) {
                    None => {
                        return Err(invalid(format!(
                            "state '{}' refines '{}', which no state produces",
                            state.id, artifact
                        )));
                    }
                    Some(owner) if *owner == &state.id => {
                        return Err(invalid(format!(
                            "state '{}' both produces and refines '{}'",
                            state.id, artifact
                        )));
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// The `next` chain from the initial state must reach the terminal state.
    fn check_forward_chain(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        let mut current = &self.initial;
        while current != &self.terminal {
            if !seen.insert(current) {
                return Err(invalid(format!(
                    "the next chain from '{}' loops at '{}' and never reaches terminal state '{}'",
                    self.initial, current, self.terminal
                )));
            }
            current = match self.get(current).and_then(|s| s.next.as_ref()) {
                Some(next) => next,
                None => break,
            };
        }
        Ok(())
    }

    pub fn initial(&self) -> &StateId {
        &self.initial
    }

    pub fn terminal(&self) -> &StateId {
        &self.terminal
    }

    pub fn contains(&self, id: &StateId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &StateId) -> Option<&StateDef> {
        self.index.get(id).map(|&i| &self.states[i])
    }

    /// Look up a state, failing with a user error naming it.
    pub fn state(&self, id: &StateId) -> Result<&StateDef> {
        self.get(id)
            .ok_or_else(|| FlowError::UserError(format!("unknown state '{}'", id)))
    }

    /// All states in declaration order.
    pub fn states(&self) -> &[StateDef] {
        &self.states
    }

    /// States visited by following `next` from the initial state, ending
    /// with the terminal state.
    pub fn forward_chain(&self) -> Vec<&StateDef> {
        let mut chain = Vec::new();
        let mut current = Some(&self.initial);
        while let Some(id) = current {
            let Some(state) = self.get(id) else { break };
            chain.push(state);
            current = state.next.as_ref();
        }
        chain
    }

    /// Distinct agent profile ids referenced by the table.
    pub fn agent_ids(&self) -> BTreeSet<&str> {
        self.states
            .iter()
            .filter_map(|s| s.agent.as_deref())
            .collect()
    }

    /// Document formats declared by schema rules, keyed by artifact.
    pub fn artifact_formats(&self) -> BTreeMap<String, ArtifactFormat> {
        let mut formats = BTreeMap::new();
        for state in &self.states {
            for artifact in state.rule.structural_artifacts() {
                if let Some(format) = state.rule.format_of(artifact) {
                    formats.entry(artifact.to_string()).or_insert(format);
                }
            }
        }
        formats
    }

    /// The state owning an artifact, if any state declares it.
    pub fn owner_of(&self, artifact: &str) -> Option<&StateId> {
        self.states
            .iter()
            .find(|s| s.produces.as_deref() == Some(artifact))
            .map(|s| &s.id)
    }
}

fn invalid(msg: impl Into<String>) -> FlowError {
    FlowError::UserError(format!("invalid workflow: {}", msg.into()))
}
