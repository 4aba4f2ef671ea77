//! Agents run as external processes.
//!
//! Each turn writes a JSON request file, runs the profile's command with a
//! timeout, and parses the reply from stdout:
//!
//! ```json
//! {
//!   "message": "Here is a first draft.",
//!   "artifacts": {"seed_data": {"task_description": "...", "seed_question": "...", "seed_response": "..."}},
//!   "approval": "approve",
//!   "completed": true,
//!   "route": "data_generation",
//!   "error": null
//! }
//! ```
//!
//! Artifact values may be a string (stored as-is), `{"file": path}` (stored as
//! a reference), or any other JSON document. Arrays are stored one element
//! per line when a schema rule declares the artifact `jsonl`, and as a JSON
//! array otherwise.
//!
//! The command template is split into arguments once, when the agent is
//! built. Variables are substituted inside each argument afterwards, so user
//! text always stays a single argument whatever quotes it contains.
//!
//! Timeouts, non-zero exits, unparsable replies and a non-null `error` are all
//! agent failures.

use super::config::{AgentDefaults, AgentProfile, COMMAND_VARIABLES};
use super::template::{TemplateError, check_template, render_template};
use super::{Agent, AgentInput, AgentOutput};
use crate::context::FlowContext;
use crate::error::{FlowError, Result};
use crate::fs::atomic_write_json;
use crate::session::{Artifact, ArtifactContent};
use crate::validate::{ApprovalSignal, ArtifactFormat};
use crate::workflow::{StateId, WorkflowTable};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A command-backed agent.
#[derive(Debug, Clone)]
pub struct CommandAgent {
    id: String,
    argv: Vec<String>,
    formats: BTreeMap<String, ArtifactFormat>,
    timeout: Duration,
    environment: HashMap<String, String>,
    ctx: FlowContext,
}

#[derive(Serialize)]
struct AgentRequest<'a> {
    session_id: &'a str,
    state: &'a StateId,
    description: &'a str,
    completion_criteria: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    produces: Option<&'a str>,
    text: &'a str,
    iteration: u32,
    routes: &'a [StateId],
    artifacts: &'a BTreeMap<String, Artifact>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AgentReply {
    message: String,
    artifacts: BTreeMap<String, ReplyArtifact>,
    approval: Option<ApprovalSignal>,
    completed: bool,
    route: Option<StateId>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplyArtifact {
    Text(String),
    Content(ArtifactContent),
    Document(Value),
}

impl ReplyArtifact {
    fn into_content(self, format: ArtifactFormat) -> ArtifactContent {
        match self {
            ReplyArtifact::Text(text) => ArtifactContent::Inline(text),
            ReplyArtifact::Content(content) => content,
            ReplyArtifact::Document(Value::Array(items)) if format == ArtifactFormat::Jsonl => {
                ArtifactContent::Inline(
                    items
                        .iter()
                        .map(Value::to_string)
                        .collect::<Vec<_>>()
                        .join("\n"),
                )
            }
            ReplyArtifact::Document(doc) => ArtifactContent::Inline(doc.to_string()),
        }
    }
}

impl CommandAgent {
    /// Build an agent from its profile, rejecting templates that reference
    /// unknown variables or do not split into arguments.
    pub fn new(
        id: &str,
        profile: &AgentProfile,
        defaults: &AgentDefaults,
        ctx: &FlowContext,
        workflow: &WorkflowTable,
    ) -> Result<Self> {
        check_template(&profile.command, COMMAND_VARIABLES).map_err(|e| {
            FlowError::UserError(format!(
                "agent '{}' command template is invalid: {}\n\
                 Available variables: {}",
                id,
                e,
                COMMAND_VARIABLES.join(", ")
            ))
        })?;

        let argv = shell_words::split(&profile.command).map_err(|e| {
            FlowError::UserError(format!(
                "agent '{}' command '{}' cannot be parsed: {}",
                id, profile.command, e
            ))
        })?;
        if argv.is_empty() {
            return Err(FlowError::UserError(format!("agent '{}' has an empty command", id)));
        }

        Ok(Self {
            id: id.to_string(),
            argv,
            formats: workflow.artifact_formats(),
            timeout: Duration::from_secs(profile.effective_timeout(defaults)),
            environment: profile.environment.clone(),
            ctx: ctx.clone(),
        })
    }

    #[cfg(test)]
    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn failure(&self, reason: impl Into<String>) -> FlowError {
        FlowError::agent(&self.id, reason)
    }

    fn write_request(&self, input: &AgentInput<'_>, work_dir: &Path) -> Result<PathBuf> {
        let request = AgentRequest {
            session_id: input.session_id,
            state: &input.state.id,
            description: &input.state.description,
            completion_criteria: &input.state.completion_criteria,
            produces: input.state.produces.as_deref(),
            text: input.text,
            iteration: input.iteration,
            routes: &input.state.routes,
            artifacts: input.artifacts,
        };
        let path = work_dir.join(format!("{}-request.json", input.session_id));
        atomic_write_json(&path, &request)
            .map_err(|e| self.failure(format!("cannot write request file: {}", e)))?;
        Ok(path)
    }

    fn render_command(&self, input: &AgentInput<'_>, request: &Path) -> Result<Vec<String>> {
        let vars: HashMap<String, String> = [
            ("request_file", request.display().to_string()),
            ("session_id", input.session_id.to_string()),
            ("state", input.state.id.to_string()),
            ("text", input.text.to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        self.argv
            .iter()
            .map(|arg| {
                render_template(arg, &vars).map_err(|e| match e {
                    TemplateError::UndefinedVariable { name, .. } => self.failure(format!(
                        "command template references undefined variable '{}'",
                        name
                    )),
                    other => self.failure(format!("command template is invalid: {}", other)),
                })
            })
            .collect()
    }

    fn format_of(&self, artifact: &str) -> ArtifactFormat {
        self.formats.get(artifact).copied().unwrap_or_default()
    }

    fn spawn(&self, args: &[String], stdout: &Path, stderr: &Path) -> Result<Child> {
        let open = |path: &Path| {
            File::create(path).map_err(|e| {
                self.failure(format!("cannot create log '{}': {}", path.display(), e))
            })
        };

        let mut command = Command::new(&args[0]);
        command
            .args(&args[1..])
            .current_dir(&self.ctx.root)
            .stdin(Stdio::null())
            .stdout(Stdio::from(open(stdout)?))
            .stderr(Stdio::from(open(stderr)?))
            .envs(&self.environment);

        command
            .spawn()
            .map_err(|e| self.failure(format!("cannot run '{}': {}", args[0], e)))
    }

    fn parse_reply(&self, stdout: &str) -> Result<AgentReply> {
        if let Ok(reply) = serde_json::from_str::<AgentReply>(stdout) {
            return Ok(reply);
        }
        // Agents may log before the reply; the reply is then the last line.
        let last = stdout.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
        serde_json::from_str::<AgentReply>(last).map_err(|e| {
            self.failure(format!("reply is not valid JSON: {}", e))
        })
    }
}

impl Agent for CommandAgent {
    fn handle(&self, input: &AgentInput<'_>) -> Result<AgentOutput> {
        let work_dir = self.ctx.agent_work_dir(&self.id);
        fs::create_dir_all(&work_dir).map_err(|e| {
            self.failure(format!("cannot create '{}': {}", work_dir.display(), e))
        })?;

        let request = self.write_request(input, &work_dir)?;
        let args = self.render_command(input, &request)?;
        let stdout_path = work_dir.join(format!("{}-stdout.log", input.session_id));
        let stderr_path = work_dir.join(format!("{}-stderr.log", input.session_id));

        debug!(agent = %self.id, state = %input.state.id, command = ?args, "running agent");
        let started = Instant::now();
        let mut child = self.spawn(&args, &stdout_path, &stderr_path)?;

        let status = match wait_with_timeout(&mut child, self.timeout)
            .map_err(|e| self.failure(format!("cannot wait for process: {}", e)))?
        {
            Some(status) => status,
            None => {
                warn!(agent = %self.id, timeout = ?self.timeout, "agent timed out");
                return Err(self.failure(format!(
                    "timed out after {}s",
                    self.timeout.as_secs_f64()
                )));
            }
        };
        debug!(agent = %self.id, elapsed = ?started.elapsed(), ?status, "agent finished");

        if !status.success() {
            let stderr = fs::read_to_string(&stderr_path).unwrap_or_default();
            let hint = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .map(|l| format!(": {}", l.trim()))
                .unwrap_or_default();
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(self.failure(format!("exited with status {}{}", code, hint)));
        }

        let stdout = fs::read_to_string(&stdout_path).map_err(|e| {
            self.failure(format!("cannot read '{}': {}", stdout_path.display(), e))
        })?;
        let reply = self.parse_reply(&stdout)?;

        if let Some(error) = reply.error {
            return Err(self.failure(error));
        }

        Ok(AgentOutput {
            message: reply.message,
            artifacts: reply
                .artifacts
                .into_iter()
                .map(|(name, artifact)| {
                    let content = artifact.into_content(self.format_of(&name));
                    (name, content)
                })
                .collect(),
            approval: reply.approval,
            completed: reply.completed,
            route: reply.route,
        })
    }
}

/// Poll a child until it exits or the timeout passes. `None` means the
/// process was killed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    let poll_interval = Duration::from_millis(50);

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        std::thread::sleep(poll_interval);
    }
}
