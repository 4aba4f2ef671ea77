//! Config loading, validation, and utility operations.

use super::model::Config;
use super::presets::{self, PRESET_NAMES};
use super::types::StateConfig;
use crate::error::{FlowError, Result};
use std::path::Path;
use tracing::debug;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(FlowError::UserError)` - Parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            FlowError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from a file if it exists, otherwise return the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // serde_yaml turns an empty document into a unit value, not a mapping.
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml)
                .map_err(|e| FlowError::UserError(format!("failed to parse config YAML: {}", e)))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| FlowError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `preset` must name a built-in preset when `states` is empty
    /// - `default_max_iterations` and `lock_stale_minutes` must be positive
    /// - every state `max_iterations` must be positive
    /// - command aliases must be non-empty
    ///
    /// The shape of the state table itself is checked when the workflow is
    /// built from it.
    pub fn validate(&self) -> Result<()> {
        if self.states.is_empty() && presets::preset(&self.preset).is_none() {
            return Err(FlowError::UserError(format!(
                "config validation failed: unknown preset '{}' (expected one of: {})",
                self.preset,
                PRESET_NAMES.join(", ")
            )));
        }

        if self.default_max_iterations == 0 {
            return Err(FlowError::UserError(
                "config validation failed: default_max_iterations must be greater than 0"
                    .to_string(),
            ));
        }

        if self.lock_stale_minutes == 0 {
            return Err(FlowError::UserError(
                "config validation failed: lock_stale_minutes must be greater than 0".to_string(),
            ));
        }

        for state in &self.states {
            if state.max_iterations == Some(0) {
                return Err(FlowError::UserError(format!(
                    "config validation failed: max_iterations for state '{}' must be greater than 0",
                    state.id
                )));
            }
        }

        let aliases = self.commands.restart.iter().chain(&self.commands.close);
        if aliases.clone().any(|a| a.trim().is_empty()) {
            return Err(FlowError::UserError(
                "config validation failed: command aliases must be non-empty".to_string(),
            ));
        }
        if let Some(alias) = aliases.clone().find(|a| matches_reserved(a)) {
            return Err(FlowError::UserError(format!(
                "config validation failed: '{}' is a reserved command and cannot be an alias",
                alias.trim()
            )));
        }

        Ok(())
    }

    /// The workflow table this config describes: the inline `states` when
    /// present, otherwise the preset. Returns the initial state id and rows.
    pub fn workflow_states(&self) -> Result<(String, Vec<StateConfig>)> {
        if !self.states.is_empty() {
            let initial = match &self.initial_state {
                Some(id) => id.clone(),
                None => self.states[0].id.clone(),
            };
            return Ok((initial, self.states.clone()));
        }

        let preset = presets::preset(&self.preset).ok_or_else(|| {
            FlowError::UserError(format!("unknown preset '{}'", self.preset))
        })?;
        let initial = self
            .initial_state
            .clone()
            .unwrap_or(preset.initial_state);
        Ok((initial, preset.states))
    }

    /// Iteration cap for a state row.
    pub fn max_iterations_for(&self, state: &StateConfig) -> u32 {
        state.max_iterations.unwrap_or(self.default_max_iterations)
    }
}

fn matches_reserved(alias: &str) -> bool {
    let alias = alias.trim();
    alias.eq_ignore_ascii_case("status") || alias.eq_ignore_ascii_case("help")
}
