//! `sdgflow demo`: a scripted conversation through the `skills` workflow.
//!
//! Runs entirely in memory with inline agents; nothing under `.sdgflow/` is
//! read or written.

use super::format_response;
use crate::agent::AgentRegistry;
use crate::config::Config;
use crate::controller::Controller;
use crate::error::{FlowError, Result};
use crate::session::SessionState;
use crate::workflow::WorkflowTable;
use std::io::{self, Write};

const SEED_DRAFT: &str = r#"{"task_description": "Customer service chatbot for order inquiries", "seed_question": "Where is my order?", "seed_response": "I can help with that. Could you share your order number?"}"#;

const SEED_REVISED: &str = r#"{"task_description": "Customer service chatbot for order inquiries", "seed_question": "How can I track the shipping status of order 12345?", "seed_response": "Your order 12345 shipped yesterday. You can follow it with the tracking link in your confirmation email."}"#;

const GENERATION_PARAMS: &str = r#"{"count": 5, "variation": "medium", "format": "json"}"#;

fn script() -> [&'static str; 7] {
    [
        "I need to generate training data for a customer service chatbot. The chatbot should help customers with order inquiries.",
        SEED_DRAFT,
        "That looks good, but can you make the seed question more specific about tracking order status?",
        SEED_REVISED,
        "Yes, I approve this seed data.",
        GENERATION_PARAMS,
        "restart",
    ]
}

pub fn cmd_demo() -> Result<()> {
    let stdout = io::stdout();
    run_demo(stdout.lock()).map(|_| ())
}

/// Play the script, writing the transcript to `out`. Returns the final session.
pub(crate) fn run_demo<W: Write>(mut out: W) -> Result<SessionState> {
    let io_err = |e: io::Error| FlowError::UserError(format!("failed to write output: {}", e));

    let config = Config::default();
    let workflow = WorkflowTable::from_config(&config)?;
    let agents = AgentRegistry::inline(&workflow);
    let controller = Controller::new(&config, workflow, agents, std::env::temp_dir())?;

    let mut session = controller.new_session("demo");
    writeln!(out, "Demo session: skills workflow with inline agents\n").map_err(io_err)?;
    writeln!(out, "{}\n", controller.status(&session)).map_err(io_err)?;

    for (step, input) in script().iter().enumerate() {
        writeln!(out, "--- step {} [{}]", step + 1, session.current_state).map_err(io_err)?;
        writeln!(out, "user:  {}", input).map_err(io_err)?;

        let turn = controller.handle_input(session, input);
        session = turn.session;

        writeln!(out, "agent: {}", format_response(&turn.response)).map_err(io_err)?;
        writeln!(out, "({})\n", turn.response.outcome.name()).map_err(io_err)?;
    }

    writeln!(out, "Demo complete.").map_err(io_err)?;
    Ok(session)
}
