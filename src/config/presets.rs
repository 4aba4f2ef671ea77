//! Built-in workflow tables.
//!
//! `skills` is the four-state seed-data workflow; `assistant` is the
//! seven-state variant with a greeting router in front of it.

use super::types::StateConfig;
use crate::validate::{ArtifactFormat, ValidationRule};

/// Names accepted by `preset:` and `sdgflow init --preset`.
pub const PRESET_NAMES: &[&str] = &["skills", "assistant"];

/// A named workflow table.
#[derive(Debug, Clone)]
pub struct Preset {
    pub initial_state: String,
    pub states: Vec<StateConfig>,
}

/// Look up a preset by name.
pub fn preset(name: &str) -> Option<Preset> {
    match name {
        "skills" => Some(skills()),
        "assistant" => Some(assistant()),
        _ => None,
    }
}

fn seed_schema() -> ValidationRule {
    ValidationRule::Schema {
        artifact: "seed_data".to_string(),
        format: ArtifactFormat::Jsonl,
        required_fields: vec![
            "task_description".to_string(),
            "seed_question".to_string(),
            "seed_response".to_string(),
        ],
    }
}

fn generation_count() -> ValidationRule {
    ValidationRule::Range {
        artifact: "generation_params".to_string(),
        field: "count".to_string(),
        min: 1.0,
        max: 1000.0,
    }
}

fn state(id: &str, description: &str, criteria: &str, rule: ValidationRule) -> StateConfig {
    StateConfig {
        id: id.to_string(),
        description: description.to_string(),
        completion_criteria: criteria.to_string(),
        rule,
        ..StateConfig::default()
    }
}

fn skills() -> Preset {
    let creation = StateConfig {
        agent: Some("seed_data_creator".to_string()),
        produces: Some("seed_data".to_string()),
        next: Some("seed_data_iteration".to_string()),
        ..state(
            "seed_data_creation",
            "Create structured seed data from the task requirements",
            "Valid seed data with task_description, seed_question and seed_response",
            seed_schema(),
        )
    };

    let iteration = StateConfig {
        agent: Some("seed_data_iterator".to_string()),
        refines: vec!["seed_data".to_string()],
        next: Some("data_generation".to_string()),
        max_iterations: Some(3),
        ..state(
            "seed_data_iteration",
            "Refine the seed data based on feedback",
            "User approval received or 3 iterations reached",
            ValidationRule::Approval {
                artifact: Some("seed_data".to_string()),
            },
        )
    };

    let generation = StateConfig {
        agent: Some("data_generator".to_string()),
        produces: Some("generation_params".to_string()),
        next: Some("close_restart".to_string()),
        ..state(
            "data_generation",
            "Generate synthetic training data from the approved seed data",
            "Generation parameters valid (count in 1..=1000) and data generated",
            ValidationRule::AllOf {
                rules: vec![generation_count(), ValidationRule::Completed],
            },
        )
    };

    let close = StateConfig {
        terminal: true,
        ..state(
            "close_restart",
            "Session complete, restart or close",
            "User chooses to restart or close the session",
            ValidationRule::Manual,
        )
    };

    Preset {
        initial_state: "seed_data_creation".to_string(),
        states: vec![creation, iteration, generation, close],
    }
}

fn assistant() -> Preset {
    let greeting = StateConfig {
        agent: Some("greeting_agent".to_string()),
        next: Some("skills_greeting".to_string()),
        routes: vec![
            "general_qa".to_string(),
            "knowledge_flow".to_string(),
            "skills_greeting".to_string(),
        ],
        ..state(
            "greeting_intent",
            "Greet the user and work out what they want to do",
            "Intent identified",
            ValidationRule::Completed,
        )
    };

    let general_qa = StateConfig {
        agent: Some("general_qa_agent".to_string()),
        next: Some("greeting_intent".to_string()),
        ..state(
            "general_qa",
            "Answer general questions about synthetic data generation",
            "Question answered",
            ValidationRule::Completed,
        )
    };

    let knowledge = StateConfig {
        agent: Some("knowledge_flow_agent".to_string()),
        next: Some("greeting_intent".to_string()),
        ..state(
            "knowledge_flow",
            "Guide knowledge-based data generation",
            "Knowledge flow finished",
            ValidationRule::Completed,
        )
    };

    let skills_greeting = StateConfig {
        agent: Some("skills_greeting_agent".to_string()),
        next: Some("seed_data_creation".to_string()),
        routes: vec!["seed_data_creation".to_string(), "data_generation".to_string()],
        ..state(
            "skills_greeting",
            "Explain the skills flow and choose a starting point",
            "User chose to create seed data or generate directly",
            ValidationRule::Completed,
        )
    };

    let creation = StateConfig {
        agent: Some("seed_data_creator".to_string()),
        produces: Some("seed_data".to_string()),
        next: Some("data_generation".to_string()),
        routes: vec!["greeting_intent".to_string()],
        max_iterations: Some(3),
        ..state(
            "seed_data_creation",
            "Create and refine seed data",
            "Valid seed data approved by the user",
            ValidationRule::AllOf {
                rules: vec![
                    seed_schema(),
                    ValidationRule::Approval {
                        artifact: Some("seed_data".to_string()),
                    },
                ],
            },
        )
    };

    let generation = StateConfig {
        agent: Some("data_generator".to_string()),
        produces: Some("generation_params".to_string()),
        next: Some("review_exit".to_string()),
        routes: vec!["greeting_intent".to_string()],
        ..state(
            "data_generation",
            "Generate synthetic training data",
            "Generation parameters valid (count in 1..=1000) and data generated",
            ValidationRule::AllOf {
                rules: vec![generation_count(), ValidationRule::Completed],
            },
        )
    };

    let review = StateConfig {
        terminal: true,
        ..state(
            "review_exit",
            "Review the results, then restart or close",
            "User chooses to restart or close the session",
            ValidationRule::Manual,
        )
    };

    Preset {
        initial_state: "greeting_intent".to_string(),
        states: vec![
            greeting,
            general_qa,
            knowledge,
            skills_greeting,
            creation,
            generation,
            review,
        ],
    }
}
