//! Agent configuration schema.
//!
//! This module defines the `agents.yaml` file, which binds the agent ids
//! used by workflow states to concrete collaborators.
//!
//! # File Format
//!
//! ```yaml
//! agents:
//!   seed_data_creator:
//!     kind: command
//!     command: "python agents/seed_creator.py {request_file}"
//!     timeout_seconds: 120
//!     environment:
//!       MODEL: "granite-3.3-8b"
//!
//!   seed_data_iterator:
//!     kind: inline
//!
//! defaults:
//!   timeout_seconds: 600
//! ```
//!
//! # Variable Placeholders
//!
//! Command templates support:
//!
//! - `{request_file}` - Absolute path of the JSON request for this turn
//! - `{session_id}` - Session identifier
//! - `{state}` - Current state id
//! - `{text}` - The raw user input

use crate::error::{FlowError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Default timeout for agent execution in seconds.
const DEFAULT_TIMEOUT_SECONDS: u64 = 600;

/// Placeholders a command template may use.
pub const COMMAND_VARIABLES: &[&str] = &["request_file", "session_id", "state", "text"];

/// Configuration for all agents, loaded from `agents.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// Agent profiles keyed by identifier.
    #[serde(default)]
    pub agents: BTreeMap<String, AgentProfile>,

    /// Default settings applied to all agents.
    #[serde(default)]
    pub defaults: AgentDefaults,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Default settings for agent execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentDefaults {
    /// Default timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            extra: BTreeMap::new(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

/// How an agent is implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// An external process speaking JSON on stdout.
    #[default]
    Command,
    /// The built-in agent that records structured input as the state's artifact.
    Inline,
}

/// Profile for a single agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentProfile {
    #[serde(default)]
    pub kind: AgentKind,

    /// Human-readable name for the agent.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Command template with variable placeholders (command agents only).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command: String,

    /// Timeout in seconds (overrides default if set).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,

    /// Environment variables to set for the agent process.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environment: HashMap<String, String>,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl AgentProfile {
    /// A profile for the built-in inline agent.
    pub fn inline() -> Self {
        Self {
            kind: AgentKind::Inline,
            ..Default::default()
        }
    }

    /// Get the effective timeout for this agent.
    pub fn effective_timeout(&self, defaults: &AgentDefaults) -> u64 {
        self.timeout_seconds.unwrap_or(defaults.timeout_seconds)
    }
}

impl AgentsConfig {
    /// Load agents config from a YAML file.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    /// Returns `Err` if the file exists but cannot be parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            FlowError::UserError(format!(
                "failed to read agents config '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::from_yaml(&content)?;
        Ok(Some(config))
    }

    /// Parse agents config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: AgentsConfig = serde_yaml::from_str(yaml)
            .map_err(|e| FlowError::UserError(format!("failed to parse agents.yaml: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| FlowError::UserError(format!("failed to serialize agents config: {}", e)))
    }

    /// Validate the agents configuration.
    ///
    /// Validation rules:
    /// - Agent identifiers must not be empty
    /// - Command agents need a non-empty command template
    /// - Timeouts must be positive
    pub fn validate(&self) -> Result<()> {
        if self.defaults.timeout_seconds == 0 {
            return Err(FlowError::UserError(
                "agents.yaml validation failed: defaults.timeout_seconds must be greater than 0"
                    .to_string(),
            ));
        }

        for (id, agent) in &self.agents {
            if id.trim().is_empty() {
                return Err(FlowError::UserError(
                    "agents.yaml validation failed: agent identifier cannot be empty".to_string(),
                ));
            }

            if agent.kind == AgentKind::Command && agent.command.trim().is_empty() {
                return Err(FlowError::UserError(format!(
                    "agents.yaml validation failed: command agent '{}' has empty command",
                    id
                )));
            }

            if agent.timeout_seconds == Some(0) {
                return Err(FlowError::UserError(format!(
                    "agents.yaml validation failed: agent '{}' has timeout_seconds of 0",
                    id
                )));
            }
        }

        Ok(())
    }

    /// Get an agent by identifier.
    pub fn get(&self, id: &str) -> Option<&AgentProfile> {
        self.agents.get(id)
    }

    /// A config declaring an inline profile for every id.
    pub fn all_inline<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            agents: ids
                .into_iter()
                .map(|id| (id.to_string(), AgentProfile::inline()))
                .collect(),
            ..Default::default()
        }
    }
}
