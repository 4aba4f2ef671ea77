//! The built-in inline agent.
//!
//! Structured input (text starting with `{` or `[`) is recorded verbatim as
//! the state's artifact. Input naming one of the state's routes requests that
//! route. Anything else is acknowledged with the state's completion criteria.
//! Approval is left to the controller's recognizer.

use super::{Agent, AgentInput, AgentOutput};
use crate::error::Result;
use crate::session::ArtifactContent;
use crate::workflow::StateId;

#[derive(Debug, Clone, Copy, Default)]
pub struct InlineAgent;

impl InlineAgent {
    fn route_for(input: &AgentInput<'_>) -> Option<StateId> {
        let wanted = input.text.trim().to_lowercase().replace(' ', "_");
        input
            .state
            .routes
            .iter()
            .find(|route| route.as_str().eq_ignore_ascii_case(&wanted))
            .cloned()
    }
}

impl Agent for InlineAgent {
    fn handle(&self, input: &AgentInput<'_>) -> Result<AgentOutput> {
        let text = input.text.trim();
        let target = input
            .state
            .produces
            .as_deref()
            .or_else(|| input.state.refines.first().map(String::as_str));

        if text.starts_with('{') || text.starts_with('[') {
            let mut output = AgentOutput {
                completed: true,
                ..AgentOutput::default()
            };
            match target {
                Some(name) => {
                    output
                        .artifacts
                        .insert(name.to_string(), ArtifactContent::Inline(text.to_string()));
                    output.message = format!("Recorded {}.", name);
                }
                None => output.message = "Noted.".to_string(),
            }
            return Ok(output);
        }

        if let Some(route) = Self::route_for(input) {
            return Ok(AgentOutput {
                message: format!("Switching to {}.", route),
                route: Some(route),
                ..AgentOutput::default()
            });
        }

        let mut output = AgentOutput::message(match target {
            Some(name) if !input.artifacts.contains_key(name) => format!(
                "Please provide {} as JSON. Needed: {}",
                name, input.state.completion_criteria
            ),
            _ => format!("Noted. Needed: {}", input.state.completion_criteria),
        });
        // States without an artifact of their own are done once the user
        // has said something.
        output.completed = target.is_none() && !text.is_empty();
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::workflow::WorkflowTable;
    use std::collections::BTreeMap;

    fn run(table: &WorkflowTable, state: &str, text: &str) -> AgentOutput {
        let artifacts = BTreeMap::new();
        let state = table.get(&StateId::from(state)).unwrap();
        InlineAgent
            .handle(&AgentInput {
                session_id: "t",
                state,
                text,
                artifacts: &artifacts,
                iteration: 0,
            })
            .unwrap()
    }

    #[test]
    fn test_structured_input_becomes_artifact() {
        let table = WorkflowTable::from_config(&Config::default()).unwrap();
        let out = run(&table, "seed_data_creation", r#"  {"task_description":"x"}  "#);
        assert!(out.completed);
        assert_eq!(
            out.artifacts.get("seed_data"),
            Some(&ArtifactContent::Inline(r#"{"task_description":"x"}"#.to_string()))
        );
        assert_eq!(out.message, "Recorded seed_data.");
    }

    #[test]
    fn test_refining_state_writes_refined_artifact() {
        let table = WorkflowTable::from_config(&Config::default()).unwrap();
        let out = run(&table, "seed_data_iteration", r#"{"seed_question":"q"}"#);
        assert!(out.artifacts.contains_key("seed_data"));
    }

    #[test]
    fn test_free_text_asks_for_artifact() {
        let table = WorkflowTable::from_config(&Config::default()).unwrap();
        let out = run(&table, "seed_data_creation", "I want customer support data");
        assert!(!out.completed);
        assert!(out.artifacts.is_empty());
        assert!(out.message.starts_with("Please provide seed_data as JSON"));
        assert_eq!(out.approval, None);
    }

    #[test]
    fn test_routes_and_completion_without_artifact() {
        let config = Config {
            preset: "assistant".to_string(),
            ..Config::default()
        };
        let table = WorkflowTable::from_config(&config).unwrap();

        let out = run(&table, "greeting_intent", "General QA");
        assert_eq!(out.route, Some(StateId::from("general_qa")));

        let out = run(&table, "greeting_intent", "hello there");
        assert_eq!(out.route, None);
        assert!(out.completed);

        let out = run(&table, "greeting_intent", "   ");
        assert!(!out.completed);
    }
}
