//! Approval recognition.
//!
//! Free-form replies such as "looks good, approve" or "no, change the
//! question" are reduced to a tri-state [`ApprovalSignal`]. Matching is
//! whole-word and case-insensitive; negative tokens win over affirmative
//! ones so that "looks good, but shorten it" is not taken as approval.

use crate::error::{FlowError, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Normalized approval signal for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalSignal {
    Approve,
    Reject,
    #[default]
    Inconclusive,
}

impl std::fmt::Display for ApprovalSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApprovalSignal::Approve => write!(f, "approve"),
            ApprovalSignal::Reject => write!(f, "reject"),
            ApprovalSignal::Inconclusive => write!(f, "inconclusive"),
        }
    }
}

/// Token-based recognizer built from configured word lists.
#[derive(Debug, Clone)]
pub struct ApprovalRecognizer {
    affirmative: Option<Regex>,
    negative: Option<Regex>,
}

impl ApprovalRecognizer {
    /// Build a recognizer from token lists.
    ///
    /// Tokens may contain spaces ("looks good"). Empty tokens are ignored.
    pub fn new(affirmative: &[String], negative: &[String]) -> Result<Self> {
        Ok(Self {
            affirmative: build_token_regex(affirmative)?,
            negative: build_token_regex(negative)?,
        })
    }

    /// Classify a piece of user text.
    pub fn classify(&self, text: &str) -> ApprovalSignal {
        if self.negative.as_ref().is_some_and(|re| re.is_match(text)) {
            ApprovalSignal::Reject
        } else if self.affirmative.as_ref().is_some_and(|re| re.is_match(text)) {
            ApprovalSignal::Approve
        } else {
            ApprovalSignal::Inconclusive
        }
    }
}

/// Case-insensitive whole-token matcher for any of `tokens`; `None` when empty.
///
/// A token must sit between the ends of the text or non-word characters.
/// `\b` would need a word character on one side, which `+1` or an emoji
/// never has.
pub(crate) fn build_token_regex(tokens: &[String]) -> Result<Option<Regex>> {
    let alternatives: Vec<String> = tokens
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| {
            // Collapse inner whitespace so "looks  good" still matches.
            t.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect();

    if alternatives.is_empty() {
        return Ok(None);
    }

    let pattern = format!(r"(?:^|\W)(?:{})(?:\W|$)", alternatives.join("|"));
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|e| FlowError::UserError(format!("invalid token list: {}", e)))
}
