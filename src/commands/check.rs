//! `sdgflow check`: load everything a session would need and print the
//! resulting state table.

use super::open_workspace;
use crate::error::Result;
use crate::shell::Workspace;
use std::fmt::Write as _;
use std::path::Path;

pub fn cmd_check(dir: Option<&Path>) -> Result<()> {
    let workspace = open_workspace(dir)?;
    print!("{}", render(&workspace));
    Ok(())
}

fn render(workspace: &Workspace) -> String {
    let ctx = &workspace.ctx;
    let controller = &workspace.controller;
    let workflow = controller.workflow();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "config.yaml: {}",
        if ctx.is_initialized() {
            "found"
        } else {
            "missing, using defaults"
        }
    );
    let _ = writeln!(
        out,
        "agents.yaml: {}",
        if ctx.agents_config_path().exists() {
            "found"
        } else {
            "missing, every state uses the inline agent"
        }
    );
    if workspace.config.states.is_empty() {
        let _ = writeln!(out, "workflow:    preset '{}'", workspace.config.preset);
    } else {
        let _ = writeln!(out, "workflow:    {} inline state(s)", workflow.states().len());
    }
    let _ = writeln!(out);

    for state in workflow.states() {
        let mut marks = Vec::new();
        if &state.id == workflow.initial() {
            marks.push("initial");
        }
        if &state.id == workflow.terminal() {
            marks.push("terminal");
        }
        let marks = if marks.is_empty() {
            String::new()
        } else {
            format!(" ({})", marks.join(", "))
        };
        let _ = writeln!(out, "{}{}", state.id, marks);

        if let Some(label) = controller.agents().label(&state.id) {
            let _ = writeln!(out, "  agent:     {}", label);
        }
        let _ = writeln!(out, "  rule:      {}", state.rule.describe());
        if let Some(artifact) = &state.produces {
            let _ = writeln!(out, "  produces:  {}", artifact);
        }
        if !state.refines.is_empty() {
            let _ = writeln!(out, "  refines:   {}", state.refines.join(", "));
        }
        if !state.terminal {
            let _ = writeln!(out, "  max iter:  {}", state.max_iterations);
        }
        if let Some(next) = &state.next {
            let _ = writeln!(out, "  next:      {}", next);
        }
        if !state.routes.is_empty() {
            let routes: Vec<&str> = state.routes.iter().map(|r| r.as_str()).collect();
            let _ = writeln!(out, "  routes:    {}", routes.join(", "));
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "OK: {} states, all agents bound.", workflow.states().len());
    out
}
