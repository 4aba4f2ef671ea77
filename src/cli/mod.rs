//! Command line definitions.
//!
//! Argument parsing only; the commands themselves live in `commands`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Session id used when `--session` is not given.
pub const DEFAULT_SESSION: &str = "default";

/// sdgflow: a table-driven state controller for synthetic data generation
/// workflows.
///
/// A session moves through a fixed table of states (seed data creation,
/// iteration, generation, ...). Each state has an agent that answers user
/// input and a rule that decides when the state is done.
#[derive(Parser, Debug)]
#[command(name = "sdgflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Workspace directory (defaults to the current directory).
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create `.sdgflow/` with config.yaml and agents.yaml.
    Init(InitArgs),

    /// Interactive session loop; reads one input per line.
    Run(RunArgs),

    /// Send a single input to a session and print the reply.
    Send(SendArgs),

    /// Play the scripted demo conversation in memory.
    Demo,

    /// Show where a session stands, or list sessions.
    Status(StatusArgs),

    /// Delete a saved session.
    Reset(ResetArgs),

    /// Check configuration, workflow table and agent bindings.
    Check,

    /// Run a state's validation rule against an artifact file.
    Validate(ValidateArgs),

    /// Session lock management.
    Lock(LockCommand),
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Workflow preset to write into config.yaml.
    #[arg(long, default_value = "skills")]
    pub preset: String,

    /// Overwrite existing config.yaml and agents.yaml.
    #[arg(long)]
    pub force: bool,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Session id.
    #[arg(long, default_value = DEFAULT_SESSION)]
    pub session: String,

    /// Discard any saved state and start from the initial state.
    #[arg(long)]
    pub fresh: bool,
}

#[derive(Parser, Debug)]
pub struct SendArgs {
    /// Session id.
    #[arg(long, default_value = DEFAULT_SESSION)]
    pub session: String,

    /// Discard any saved state before sending.
    #[arg(long)]
    pub fresh: bool,

    /// Print the response as JSON.
    #[arg(long)]
    pub json: bool,

    /// The input. Multiple words are joined with spaces.
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Session id. Without it, every saved session is listed.
    #[arg(long)]
    pub session: Option<String>,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct ResetArgs {
    /// Session id.
    #[arg(long, default_value = DEFAULT_SESSION)]
    pub session: String,
}

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// State whose rule to run (e.g. seed_data_creation).
    pub state: String,

    /// Artifact file to check.
    pub file: PathBuf,
}

#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// List session locks with owner and age.
    List,

    /// Remove a session's lock. Requires --force.
    Clear(LockClearArgs),
}

#[derive(Parser, Debug)]
pub struct LockClearArgs {
    /// Session whose lock should be removed.
    pub session: String,

    /// Confirm removing the lock.
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
