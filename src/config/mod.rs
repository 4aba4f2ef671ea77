//! Configuration model for sdgflow.
//!
//! This module defines the Config struct that represents `.sdgflow/config.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, validation of config values, and the
//! built-in workflow presets.

mod model;
mod operations;
pub mod presets;
pub mod types;


// Re-export public API
pub use model::Config;
pub use types::{CommandsConfig, StateConfig, TerminalConfig};
