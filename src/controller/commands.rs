//! Session command recognition.

use crate::config::{CommandsConfig, TerminalConfig};
use crate::error::Result;
use crate::validate::approval::build_token_regex;
use regex::Regex;

/// Session-level directives handled by the controller itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Status,
    Help,
    Restart,
    Close,
}

/// How a piece of input was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput {
    Command(SessionCommand),
    /// A `/directive` that is not a known command.
    Invalid(String),
    /// Domain input for the active agent.
    Input,
}

/// Matches whole inputs against the command names and aliases.
#[derive(Debug, Clone)]
pub struct CommandParser {
    restart: Vec<String>,
    close: Vec<String>,
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl CommandParser {
    pub fn new(config: &CommandsConfig) -> Self {
        Self {
            restart: config.restart.iter().map(|a| normalize(a)).collect(),
            close: config.close.iter().map(|a| normalize(a)).collect(),
        }
    }

    /// Classify input. Commands must match the whole input (case and
    /// spacing are ignored); a leading `/` marks an explicit directive.
    pub fn parse(&self, text: &str) -> ParsedInput {
        let trimmed = text.trim();
        let (explicit, body) = match trimmed.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let word = normalize(body);

        let command = match word.as_str() {
            "status" => Some(SessionCommand::Status),
            "help" => Some(SessionCommand::Help),
            w if self.restart.iter().any(|a| a == w) => Some(SessionCommand::Restart),
            w if self.close.iter().any(|a| a == w) => Some(SessionCommand::Close),
            _ => None,
        };

        match command {
            Some(cmd) => ParsedInput::Command(cmd),
            None if explicit => ParsedInput::Invalid(trimmed.to_string()),
            None => ParsedInput::Input,
        }
    }

    /// Aliases for display in help output.
    pub fn restart_aliases(&self) -> &[String] {
        &self.restart
    }

    pub fn close_aliases(&self) -> &[String] {
        &self.close
    }
}

/// Keyword search used while the session sits in the terminal state.
#[derive(Debug, Clone)]
pub struct TerminalKeywords {
    restart: Option<Regex>,
    close: Option<Regex>,
}

impl TerminalKeywords {
    pub fn new(config: &TerminalConfig) -> Result<Self> {
        Ok(Self {
            restart: build_token_regex(&config.restart_keywords)?,
            close: build_token_regex(&config.close_keywords)?,
        })
    }

    /// Restart wins when both kinds of keyword appear.
    pub fn classify(&self, text: &str) -> Option<SessionCommand> {
        if self.restart.as_ref().is_some_and(|re| re.is_match(text)) {
            Some(SessionCommand::Restart)
        } else if self.close.as_ref().is_some_and(|re| re.is_match(text)) {
            Some(SessionCommand::Close)
        } else {
            None
        }
    }
}
