//! Error types for sdgflow.
//!
//! Uses thiserror for derive macros. Every variant carries enough context to
//! be shown to the user as-is.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for sdgflow operations.
///
/// The Controller recovers every variant except `Persistence` and
/// `LockError` at its boundary and turns it into a user-facing response.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlowError {
    /// User provided invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),

    /// An artifact is missing a required field or does not parse.
    #[error("schema error in artifact '{artifact}': field '{field}' {reason}")]
    Schema {
        artifact: String,
        field: String,
        reason: String,
    },

    /// A numeric parameter is outside its allowed bounds.
    #[error("range error in artifact '{artifact}': '{field}' = {value} is outside [{min}, {max}]")]
    Range {
        artifact: String,
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The iteration cap was reached without explicit approval.
    #[error("no approval in state '{state}' after {iterations} iteration(s)")]
    ApprovalTimeout { state: String, iterations: u32 },

    /// The external collaborator failed, timed out, or returned malformed output.
    #[error("agent '{agent}' failed: {reason}")]
    AgentFailure { agent: String, reason: String },

    /// An unrecognized session directive.
    #[error("unrecognized command '{0}' (type 'help' for the list of commands)")]
    InvalidCommand(String),

    /// Session state could not be read or written.
    #[error("session persistence failed: {0}")]
    Persistence(String),

    /// The session lock is held by another process.
    #[error("lock acquisition failed: {0}")]
    LockError(String),
}

impl FlowError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            FlowError::UserError(_) | FlowError::InvalidCommand(_) => exit_codes::USER_ERROR,
            FlowError::Schema { .. } | FlowError::Range { .. } | FlowError::ApprovalTimeout { .. } => {
                exit_codes::VALIDATION_FAILURE
            }
            FlowError::AgentFailure { .. } => exit_codes::AGENT_FAILURE,
            FlowError::LockError(_) => exit_codes::LOCK_FAILURE,
            FlowError::Persistence(_) => exit_codes::PERSISTENCE_FAILURE,
        }
    }

    /// Whether a session can keep going after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, FlowError::Persistence(_) | FlowError::LockError(_))
    }

    pub(crate) fn schema(
        artifact: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        FlowError::Schema {
            artifact: artifact.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn agent(agent: impl Into<String>, reason: impl Into<String>) -> Self {
        FlowError::AgentFailure {
            agent: agent.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for sdgflow operations.
pub type Result<T> = std::result::Result<T, FlowError>;
