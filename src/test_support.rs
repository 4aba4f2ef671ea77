use crate::agent::{Agent, AgentInput, AgentOutput, AgentRegistry};
use crate::config::Config;
use crate::controller::Controller;
use crate::error::{FlowError, Result};
use crate::session::ArtifactContent;
use crate::workflow::{StateId, WorkflowTable};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // The working directory is process-global.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

pub(crate) const SEED_JSON: &str =
    r#"{"task_description":"x","seed_question":"y","seed_response":"z"}"#;

/// A workspace with `.sdgflow/config.yaml` written for `preset`.
pub(crate) fn create_test_workspace(preset: &str) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let state_dir = temp_dir.path().join(".sdgflow");
    std::fs::create_dir_all(&state_dir).unwrap();
    std::fs::write(
        state_dir.join("config.yaml"),
        format!("preset: {}\n", preset),
    )
    .unwrap();
    temp_dir
}

/// An agent that plays back queued replies and records what it was sent.
#[derive(Clone, Default)]
pub(crate) struct ScriptedAgent {
    replies: Arc<Mutex<VecDeque<Result<AgentOutput>>>>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl ScriptedAgent {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, output: AgentOutput) -> Self {
        self.replies.lock().unwrap().push_back(Ok(output));
        self
    }

    pub(crate) fn artifact(self, name: &str, text: &str) -> Self {
        let mut output = AgentOutput::message(format!("wrote {}", name));
        output
            .artifacts
            .insert(name.to_string(), ArtifactContent::Inline(text.to_string()));
        self.reply(output)
    }

    pub(crate) fn fail(self, reason: &str) -> Self {
        self.fail_with(FlowError::agent("scripted", reason))
    }

    pub(crate) fn fail_with(self, error: FlowError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub(crate) fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl Agent for ScriptedAgent {
    fn handle(&self, input: &AgentInput<'_>) -> Result<AgentOutput> {
        self.seen.lock().unwrap().push(input.text.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(AgentOutput::message("ok")))
    }
}

/// A controller over `config` with inline agents, except for the given
/// per-state overrides.
pub(crate) fn controller_with(
    config: &Config,
    overrides: Vec<(&str, ScriptedAgent)>,
) -> Controller {
    let workflow = WorkflowTable::from_config(config).unwrap();
    let mut agents = AgentRegistry::inline(&workflow);
    for (state, agent) in overrides {
        agents.register(StateId::from(state), "scripted", Box::new(agent));
    }
    Controller::new(config, workflow, agents, std::env::temp_dir()).unwrap()
}
