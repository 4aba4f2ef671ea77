//! Command implementations.
//!
//! [`dispatch`] resolves the workspace from `--dir` (or the current directory)
//! and routes to one handler per subcommand. Handlers print to stdout;
//! diagnostics go through `tracing` to stderr.

mod check;
mod demo;
mod init;
mod lock;
mod reset;
mod run;
mod send;
mod status;
mod validate;

use crate::cli::{Cli, Command, LockAction};
use crate::context::FlowContext;
use crate::controller::Response;
use crate::error::Result;
use crate::shell::Workspace;
use std::path::Path;

pub fn dispatch(cli: Cli) -> Result<()> {
    let dir = cli.dir.as_deref();
    match cli.command {
        Command::Init(args) => init::cmd_init(dir, args),
        Command::Run(args) => run::cmd_run(dir, args),
        Command::Send(args) => send::cmd_send(dir, args),
        Command::Demo => demo::cmd_demo(),
        Command::Status(args) => status::cmd_status(dir, args),
        Command::Reset(args) => reset::cmd_reset(dir, args),
        Command::Check => check::cmd_check(dir),
        Command::Validate(args) => validate::cmd_validate(dir, args),
        Command::Lock(lock_cmd) => match lock_cmd.action {
            LockAction::List => lock::cmd_lock_list(dir),
            LockAction::Clear(args) => lock::cmd_lock_clear(dir, args),
        },
    }
}

/// Resolve the context and load the workspace.
fn open_workspace(dir: Option<&Path>) -> Result<Workspace> {
    Workspace::load(FlowContext::resolve(dir)?)
}

/// Render a response for the terminal.
fn format_response(response: &Response) -> String {
    match &response.error {
        Some(err) if !response.message.contains(&err.to_string()) => {
            format!("{}\n[{}]", response.message, err)
        }
        _ => response.message.clone(),
    }
}
