//! Generated modules — persisted worker definitions and their loader.
//!
//! A generated module is a small YAML document produced from a template. It
//! is never executed; the fixed worker executor reads it to decide how the
//! worker behaves. The loader keeps one parsed copy per `module_path` and
//! re-reads the file only when its modification time moves forward.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// Constructor shape every generated module must declare.
pub const CONSTRUCTOR_SHAPE: [&str; 3] = ["name", "behavior_prompt", "spec"];

/// The single message-handling entry point.
pub const HANDLER: &str = "on_message";

/// Executor variant selected by a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Worker,
    WorkerWithTools,
}

impl ModuleKind {
    pub fn accepts_tools(&self) -> bool {
        matches!(self, ModuleKind::WorkerWithTools)
    }
}

/// A parsed worker definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedModule {
    #[serde(default)]
    pub template_version: Option<String>,
    pub kind: ModuleKind,
    pub constructor: Vec<String>,
    pub handler: String,
    #[serde(default)]
    pub persona: Option<String>,
    /// Must stay empty: the behavior prompt is bound at construction.
    #[serde(default)]
    pub behavior_prompt: Option<String>,
    #[serde(default)]
    pub reflect_on_tool_use: bool,
}

impl GeneratedModule {
    /// Parse and check the module contract.
    ///
    /// Anything that does not parse, or that breaks the fixed constructor /
    /// handler contract, is a [`WorkflowError::Syntax`] for `agent`.
    pub fn parse(agent: &str, source: &str) -> Result<Self, WorkflowError> {
        let syntax = |message: String| WorkflowError::Syntax {
            agent: agent.to_string(),
            message,
        };

        let module: GeneratedModule =
            serde_yaml::from_str(source).map_err(|e| syntax(e.to_string()))?;

        if module.constructor != CONSTRUCTOR_SHAPE {
            return Err(syntax(format!(
                "constructor must be [{}], found [{}]",
                CONSTRUCTOR_SHAPE.join(", "),
                module.constructor.join(", ")
            )));
        }
        if module.handler != HANDLER {
            return Err(syntax(format!(
                "handler must be '{}', found '{}'",
                HANDLER, module.handler
            )));
        }
        if module
            .behavior_prompt
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
        {
            return Err(syntax(
                "behavior_prompt must be left empty; it is supplied at construction".to_string(),
            ));
        }
        Ok(module)
    }
}

/// Dotted identity under which a module is cached.
pub fn module_path(agent_name: &str) -> String {
    format!("generated.{}", agent_name)
}

struct CachedModule {
    file: PathBuf,
    modified: Option<SystemTime>,
    module: Arc<GeneratedModule>,
}

/// Process-wide module cache keyed by `module_path`.
#[derive(Default)]
pub struct ModuleLoader {
    modules: Mutex<HashMap<String, CachedModule>>,
}

impl ModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `file` for `agent_name`, reloading only when the file on disk is
    /// newer than the cached copy (or lives at a different path).
    pub fn load(&self, agent_name: &str, file: &Path) -> Result<Arc<GeneratedModule>, WorkflowError> {
        let load_err = |message: String| WorkflowError::Load {
            agent: agent_name.to_string(),
            message,
        };
        let key = module_path(agent_name);
        let modified = std::fs::metadata(file)
            .map_err(|e| load_err(format!("{}: {}", file.display(), e)))?
            .modified()
            .ok();

        let mut modules = self
            .modules
            .lock()
            .map_err(|_| load_err("module cache poisoned".to_string()))?;

        if let Some(cached) = modules.get(&key) {
            let newer = match (modified, cached.modified) {
                (Some(on_disk), Some(loaded)) => on_disk > loaded,
                _ => true,
            };
            if cached.file == file && !newer {
                tracing::debug!("[ModuleLoader] Module {} is up to date, skipping reload", key);
                return Ok(cached.module.clone());
            }
            tracing::info!("[ModuleLoader] File {} modified, reloading module {}", file.display(), key);
        }

        let source = std::fs::read_to_string(file)
            .map_err(|e| load_err(format!("{}: {}", file.display(), e)))?;
        let module = Arc::new(
            GeneratedModule::parse(agent_name, &source).map_err(|e| load_err(e.to_string()))?,
        );

        modules.insert(
            key,
            CachedModule {
                file: file.to_path_buf(),
                modified,
                module: module.clone(),
            },
        );
        Ok(module)
    }

    pub fn is_loaded(&self, agent_name: &str) -> bool {
        self.modules
            .lock()
            .map(|m| m.contains_key(&module_path(agent_name)))
            .unwrap_or(false)
    }
}
