//! `sdgflow run`: the interactive session loop.

use super::{format_response, open_workspace};
use crate::cli::RunArgs;
use crate::error::{FlowError, Result};
use crate::shell::SessionHandle;
use std::io::{self, BufRead, Write};
use std::path::Path;

pub fn cmd_run(dir: Option<&Path>, args: RunArgs) -> Result<()> {
    let workspace = open_workspace(dir)?;
    let mut handle = SessionHandle::open(&workspace, &args.session, "run", args.fresh)?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    run_loop(&mut handle, stdin.lock(), stdout.lock())
}

/// Read lines until EOF or until the session is closed. Every turn is saved
/// as it happens, so EOF needs no cleanup.
pub(crate) fn run_loop<R: BufRead, W: Write>(
    handle: &mut SessionHandle<'_>,
    input: R,
    mut out: W,
) -> Result<()> {
    let io_err = |e: io::Error| FlowError::UserError(format!("terminal I/O failed: {}", e));

    let session = handle.session();
    writeln!(
        out,
        "Session '{}' in state '{}'. Type 'help' for commands, 'close' to finish.",
        session.session_id, session.current_state
    )
    .map_err(io_err)?;
    if session.ended {
        writeln!(out, "This session is closed. Use --fresh to start a new one.").map_err(io_err)?;
    }

    let mut lines = input.lines();
    loop {
        write!(out, "[{}] > ", handle.session().current_state).map_err(io_err)?;
        out.flush().map_err(io_err)?;

        let Some(line) = lines.next() else {
            writeln!(out).map_err(io_err)?;
            break;
        };
        let line = line.map_err(io_err)?;

        if line.trim().is_empty() {
            writeln!(out, "(empty input ignored; type 'help' for commands)").map_err(io_err)?;
            continue;
        }

        let response = handle.submit(&line)?;
        writeln!(out, "{}\n", format_response(&response)).map_err(io_err)?;

        if handle.session().ended {
            break;
        }
    }
    Ok(())
}
