//! Validation rules for state completion.
//!
//! Each workflow state owns exactly one [`ValidationRule`]. Rules are pure:
//! they look at the session's artifacts and the signals of the current turn
//! and decide whether the state is complete, still pending, or failed.
//!
//! - [`schema`]: structural checks on JSON / JSONL artifacts
//! - [`approval`]: the configurable approve / reject / inconclusive recognizer
//! - rules: the rule table entries and their evaluation

pub mod approval;
mod rules;
pub mod schema;

pub use approval::{ApprovalRecognizer, ApprovalSignal};
pub use rules::{ArtifactFormat, RuleContext, RuleOutcome, ValidationRule};
