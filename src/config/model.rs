//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for an sdgflow workspace.
///
/// This struct represents the contents of `.sdgflow/config.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Workflow settings
    // =========================================================================
    /// Built-in workflow to use when `states` is empty ("skills" or "assistant").
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Override of the initial state. Defaults to the preset's initial state,
    /// or the first entry of `states`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<String>,

    /// Inline workflow table. Replaces the preset when non-empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<StateConfig>,

    /// Iteration cap for states that do not set `max_iterations`.
    #[serde(default = "default_max_iterations")]
    pub default_max_iterations: u32,

    // =========================================================================
    // Input recognition
    // =========================================================================
    /// Approval token lists.
    #[serde(default)]
    pub approval: ApprovalConfig,

    /// Session command aliases.
    #[serde(default)]
    pub commands: CommandsConfig,

    /// Terminal-state keywords.
    #[serde(default)]
    pub terminal: TerminalConfig,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Minutes after which a session lock is considered stale.
    #[serde(default = "default_lock_stale_minutes")]
    pub lock_stale_minutes: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preset: default_preset(),
            initial_state: None,
            states: Vec::new(),
            default_max_iterations: default_max_iterations(),
            approval: ApprovalConfig::default(),
            commands: CommandsConfig::default(),
            terminal: TerminalConfig::default(),
            lock_stale_minutes: default_lock_stale_minutes(),
        }
    }
}
