//! Shared fixtures for the pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agentry_core::synthesis::prompts::CREATOR_SYSTEM_PROMPT;
use agentry_core::{AgentryConfig, ModelBackend, ModelRequest, Pipeline, WorkflowError};
use async_trait::async_trait;

/// How the backend answers a worker whose behavior prompt matches.
#[derive(Clone)]
pub enum Script {
    /// `"<behavior prompt> <- <input>"`
    Echo,
    Reply(String),
    Stall,
    Fail(String),
}

/// In-memory backend: answers generation requests with the template it was
/// given, and worker requests according to per-prompt scripts.
pub struct ScriptedBackend {
    generations: AtomicUsize,
    worker_calls: Mutex<Vec<(String, String)>>,
    scripts: Mutex<HashMap<String, Script>>,
    generation_override: Mutex<Option<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            generations: AtomicUsize::new(0),
            worker_calls: Mutex::new(Vec::new()),
            scripts: Mutex::new(HashMap::new()),
            generation_override: Mutex::new(None),
        })
    }

    pub fn script(&self, behavior_prompt: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(behavior_prompt.to_string(), script);
    }

    /// Answer every generation request with `reply` instead of the template.
    pub fn generate_with(&self, reply: &str) {
        *self.generation_override.lock().unwrap() = Some(reply.to_string());
    }

    pub fn generations(&self) -> usize {
        self.generations.load(Ordering::SeqCst)
    }

    /// `(system_prompt, prompt)` of every worker request, in order.
    pub fn worker_calls(&self) -> Vec<(String, String)> {
        self.worker_calls.lock().unwrap().clone()
    }

    fn definition_from(prompt: &str) -> String {
        let template = prompt
            .split_once("Here is the template:\n\n")
            .map(|(_, t)| t)
            .unwrap_or(prompt);
        let filled = template.replace(
            "<one sentence describing what this agent does>",
            "Scripted test agent",
        );
        format!("```yaml\n{}\n```\nTERMINATE", filled)
    }

    fn script_for(&self, system_prompt: &str) -> Script {
        self.scripts
            .lock()
            .unwrap()
            .iter()
            .find(|(prompt, _)| system_prompt.starts_with(prompt.as_str()))
            .map(|(_, s)| s.clone())
            .unwrap_or(Script::Echo)
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn generate(&self, request: ModelRequest) -> Result<String, WorkflowError> {
        if request.system_prompt == CREATOR_SYSTEM_PROMPT {
            self.generations.fetch_add(1, Ordering::SeqCst);
            if let Some(reply) = self.generation_override.lock().unwrap().clone() {
                return Ok(reply);
            }
            return Ok(Self::definition_from(&request.prompt));
        }

        let system = request.effective_system_prompt();
        self.worker_calls
            .lock()
            .unwrap()
            .push((system.clone(), request.prompt.clone()));

        match self.script_for(&request.system_prompt) {
            Script::Echo => Ok(format!("{} <- {}", request.system_prompt, request.prompt)),
            Script::Reply(text) => Ok(text),
            Script::Stall => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("too late".to_string())
            }
            Script::Fail(message) => Err(WorkflowError::Backend(message)),
        }
    }
}

/// Config rooted in `root` with short timeouts.
pub fn config(root: &Path) -> AgentryConfig {
    AgentryConfig::default()
        .with_workspace_root(root)
        .with_run_timeout(10)
        .with_worker_timeout(5)
}

pub fn pipeline(root: &Path, backend: Arc<ScriptedBackend>) -> Pipeline {
    Pipeline::new(config(root), backend)
}

/// Every file under `dir`, recursively.
pub fn files_under(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                out.extend(files_under(&path));
            } else {
                out.push(path);
            }
        }
    }
    out
}
