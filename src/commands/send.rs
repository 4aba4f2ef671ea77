//! `sdgflow send`: one turn without a terminal loop.
//!
//! Exits non-zero only when the turn changed nothing because of an error
//! (rollback or rejected input). A stay with a validation message is a
//! normal turn.

use super::{format_response, open_workspace};
use crate::cli::SendArgs;
use crate::error::{FlowError, Result};
use crate::shell::SessionHandle;
use serde_json::json;
use std::path::Path;

pub fn cmd_send(dir: Option<&Path>, args: SendArgs) -> Result<()> {
    let workspace = open_workspace(dir)?;
    let mut handle = SessionHandle::open(&workspace, &args.session, "send", args.fresh)?;

    let text = args.text.join(" ");
    let response = handle.submit(&text)?;

    if args.json {
        let session = handle.session();
        let body = json!({
            "session": session.session_id,
            "state": session.current_state,
            "iteration": session.iteration_count(),
            "ended": session.ended,
            "response": {
                "outcome": response.outcome,
                "message": response.message,
                "error": response.error.as_ref().map(|e| e.to_string()),
            },
        });
        let rendered = serde_json::to_string_pretty(&body)
            .map_err(|e| FlowError::UserError(format!("failed to render JSON: {}", e)))?;
        println!("{}", rendered);
    } else {
        println!("{}", format_response(&response));
    }

    match response.error {
        Some(err) if !response.outcome.mutates() => Err(err),
        _ => Ok(()),
    }
}
