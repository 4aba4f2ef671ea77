//! `sdgflow status`: one session in detail, or every saved session.
//!
//! Read-only: no lock is taken and nothing is written.

use super::open_workspace;
use crate::cli::StatusArgs;
use crate::error::{FlowError, Result};
use crate::locks;
use crate::shell::Workspace;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

/// One row of the session listing.
#[derive(Debug, Serialize)]
struct SessionSummary {
    session_id: String,
    current_state: String,
    iteration_count: u32,
    ended: bool,
    updated_at: String,
    locked: bool,
}

pub fn cmd_status(dir: Option<&Path>, args: StatusArgs) -> Result<()> {
    let workspace = open_workspace(dir)?;
    match &args.session {
        Some(id) => show_session(&workspace, id, args.json),
        None => list_sessions(&workspace, args.json),
    }
}

fn show_session(workspace: &Workspace, id: &str, json: bool) -> Result<()> {
    let session = workspace.store().load(id)?.ok_or_else(|| {
        FlowError::UserError(format!(
            "no saved session '{}' (start one with: sdgflow run --session {})",
            id, id
        ))
    })?;
    session.check_against(workspace.controller.workflow())?;

    let report = workspace.controller.status(&session);
    if json {
        println!("{}", to_json(&report)?);
    } else {
        println!("{}", report);
    }
    Ok(())
}

fn list_sessions(workspace: &Workspace, json: bool) -> Result<()> {
    let summaries = summarize(workspace)?;

    if json {
        println!("{}", to_json(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No sessions yet. Start one with: sdgflow run");
        return Ok(());
    }

    println!("Sessions ({}):", summaries.len());
    println!();
    for s in &summaries {
        let mut flags = Vec::new();
        if s.ended {
            flags.push("closed");
        }
        if s.locked {
            flags.push("locked");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!(
            "  {:<20} {:<22} iter {:<3} updated {}{}",
            s.session_id, s.current_state, s.iteration_count, s.updated_at, flags
        );
    }
    Ok(())
}

fn summarize(workspace: &Workspace) -> Result<Vec<SessionSummary>> {
    let store = workspace.store();
    let locked: Vec<String> = locks::list_locks(&workspace.ctx, workspace.config.lock_stale_minutes)?
        .into_iter()
        .map(|l| l.session)
        .collect();

    let mut summaries = Vec::new();
    for id in store.list()? {
        // A corrupt session file should not hide the others.
        let session = match store.load(&id) {
            Ok(Some(session)) => session,
            Ok(None) => continue,
            Err(e) => {
                warn!(session = %id, error = %e, "skipping unreadable session");
                continue;
            }
        };
        summaries.push(SessionSummary {
            locked: locked.contains(&id),
            session_id: id,
            current_state: session.current_state.to_string(),
            iteration_count: session.iteration_count(),
            ended: session.ended,
            updated_at: session.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        });
    }
    Ok(summaries)
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| FlowError::UserError(format!("failed to render JSON: {}", e)))
}
