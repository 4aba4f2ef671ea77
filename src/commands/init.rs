//! `sdgflow init`: scaffold `.sdgflow/`.
//!
//! Writes `config.yaml` for the chosen preset and an `agents.yaml` declaring
//! an inline profile for every agent id the workflow uses. Existing files are
//! kept unless `--force` is given, so running it twice is harmless.

use crate::agent::AgentsConfig;
use crate::cli::InitArgs;
use crate::config::Config;
use crate::context::FlowContext;
use crate::error::{FlowError, Result};
use crate::events::{self, Event, EventAction};
use crate::fs::atomic_write;
use crate::workflow::WorkflowTable;
use serde_json::json;
use std::fs;
use std::path::Path;

const CONFIG_HEADER: &str = "\
# sdgflow workflow configuration.
#
# `preset` picks a built-in workflow (skills, assistant). Define `states`
# to replace it with your own table.
";

const AGENTS_HEADER: &str = "\
# sdgflow agent profiles, keyed by the agent id each state names.
#
# kind: inline   built-in agent that records JSON input as the artifact
# kind: command  external program; `command` may use {request_file},
#                {session_id}, {state} and {text}
";

pub fn cmd_init(dir: Option<&Path>, args: InitArgs) -> Result<()> {
    let ctx = FlowContext::resolve(dir)?;

    let config = Config {
        preset: args.preset.clone(),
        ..Config::default()
    };
    config.validate()?;
    let workflow = WorkflowTable::from_config(&config)?;

    for path in [&ctx.state_dir, &ctx.sessions_dir, &ctx.locks_dir] {
        fs::create_dir_all(path).map_err(|e| {
            FlowError::UserError(format!("failed to create '{}': {}", path.display(), e))
        })?;
    }

    let config_written = write_unless_present(
        &ctx.config_path(),
        &format!("{}\n{}", CONFIG_HEADER, config.to_yaml()?),
        args.force,
    )?;

    let agents = AgentsConfig::all_inline(workflow.agent_ids());
    let agents_written = write_unless_present(
        &ctx.agents_config_path(),
        &format!("{}\n{}", AGENTS_HEADER, agents.to_yaml()?),
        args.force,
    )?;

    events::record(
        &ctx,
        &Event::new(EventAction::Init).with_details(json!({
            "preset": args.preset,
            "force": args.force,
        })),
    );

    println!("Initialized sdgflow workspace in {}", ctx.state_dir.display());
    report("config.yaml", config_written);
    report("agents.yaml", agents_written);
    println!();
    println!(
        "Workflow '{}': {}",
        args.preset,
        workflow
            .forward_chain()
            .iter()
            .map(|s| s.id.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    );
    println!("Start a session with: sdgflow run");
    Ok(())
}

/// Write `content` to `path` unless it exists and `force` is off.
fn write_unless_present(path: &Path, content: &str, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    atomic_write(path, content.as_bytes())?;
    Ok(true)
}

fn report(name: &str, written: bool) {
    if written {
        println!("  wrote {}", name);
    } else {
        println!("  kept existing {} (use --force to overwrite)", name);
    }
}
