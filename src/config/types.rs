//! Configuration types and defaults for sdgflow.
//!
//! This module defines the nested config sections and the default value
//! functions used by the Config struct.

use crate::validate::ValidationRule;
use serde::{Deserialize, Serialize};

/// Token lists used to recognize approval in free-form replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// Words or phrases that count as approval.
    pub affirmative: Vec<String>,

    /// Words or phrases that count as a rejection. These win over
    /// affirmative tokens found in the same reply.
    pub negative: Vec<String>,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            affirmative: default_affirmative_tokens(),
            negative: default_negative_tokens(),
        }
    }
}

/// Session-level command aliases, matched against the whole input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub restart: Vec<String>,
    pub close: Vec<String>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            restart: strings(&["restart", "reset", "start over", "fresh start"]),
            close: strings(&["close", "exit", "quit"]),
        }
    }
}

/// Keywords recognized anywhere in the input while in the terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub restart_keywords: Vec<String>,
    pub close_keywords: Vec<String>,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            restart_keywords: strings(&["restart", "start over", "new", "begin"]),
            close_keywords: strings(&["close", "exit", "quit", "done"]),
        }
    }
}

/// One row of the workflow table as written in `config.yaml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Unique state identifier.
    pub id: String,

    /// What happens in this state.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Human-readable completion criteria.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub completion_criteria: String,

    /// Agent profile handling input here (defaults to the state id).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    /// Artifact this state owns and produces.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub produces: Option<String>,

    /// Artifacts owned by earlier states that this state may update in place.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub refines: Vec<String>,

    /// Completion rule.
    pub rule: ValidationRule,

    /// Forward transition target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,

    /// Extra targets an agent may route to.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<String>,

    /// Iteration cap (falls back to `default_max_iterations`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,

    /// Whether this is the designated terminal state.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub terminal: bool,
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn default_affirmative_tokens() -> Vec<String> {
    strings(&[
        "yes",
        "yep",
        "approve",
        "approved",
        "lgtm",
        "looks good",
        "sounds good",
        "ok",
        "okay",
        "proceed",
        "accept",
        "go ahead",
        "confirm",
    ])
}

pub fn default_negative_tokens() -> Vec<String> {
    strings(&[
        "no", "nope", "not", "reject", "but", "change", "changes", "revise", "instead", "don't",
    ])
}

// Default value functions for serde
pub(crate) fn default_preset() -> String {
    "skills".to_string()
}
pub(crate) fn default_max_iterations() -> u32 {
    5
}
pub(crate) fn default_lock_stale_minutes() -> u32 {
    120
}
