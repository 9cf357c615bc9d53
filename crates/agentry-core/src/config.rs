//! Runtime configuration with defaults and environment overrides.

use std::path::{Path, PathBuf};

/// Default Gemini OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ADAPTER: &str = "openai";
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_WORKER_TIMEOUT_SECS: u64 = 30;

/// Language-model backend settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// `openai` or `anthropic`
    pub adapter: String,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            adapter: DEFAULT_ADAPTER.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl BackendConfig {
    /// Read `AGENTRY_ADAPTER`, `AGENTRY_BASE_URL`, `AGENTRY_API_KEY` (falling
    /// back to `GOOGLE_API_KEY`) and `AGENTRY_MODEL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            adapter: env_non_empty("AGENTRY_ADAPTER").unwrap_or(defaults.adapter),
            base_url: env_non_empty("AGENTRY_BASE_URL").unwrap_or(defaults.base_url),
            api_key: env_non_empty("AGENTRY_API_KEY")
                .or_else(|| env_non_empty("GOOGLE_API_KEY"))
                .unwrap_or_default(),
            model: env_non_empty("AGENTRY_MODEL").unwrap_or(defaults.model),
        }
    }
}

/// Settings for one pipeline.
#[derive(Debug, Clone)]
pub struct AgentryConfig {
    /// Base for relative `filename`s and the generated directory
    pub workspace_root: PathBuf,
    /// Where generated definitions go when a spec has no `filename`
    pub generated_dir: PathBuf,
    /// Optional template override directory
    pub template_dir: Option<PathBuf>,
    pub run_timeout_secs: u64,
    pub default_worker_timeout_secs: u64,
    /// Pass successful results through the backend before recording them
    pub summarize_result: bool,
    pub backend: BackendConfig,
}

impl Default for AgentryConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("."),
            generated_dir: PathBuf::from("generated"),
            template_dir: None,
            run_timeout_secs: DEFAULT_RUN_TIMEOUT_SECS,
            default_worker_timeout_secs: DEFAULT_WORKER_TIMEOUT_SECS,
            summarize_result: false,
            backend: BackendConfig::default(),
        }
    }
}

impl AgentryConfig {
    /// Defaults plus `WORKFLOW_TIMEOUT` and the backend environment.
    pub fn from_env() -> Self {
        let run_timeout_secs = env_non_empty("WORKFLOW_TIMEOUT")
            .and_then(|v| match v.trim().parse::<u64>() {
                Ok(secs) => Some(secs),
                Err(_) => {
                    tracing::warn!("[Config] Ignoring invalid WORKFLOW_TIMEOUT '{}'", v);
                    None
                }
            })
            .unwrap_or(DEFAULT_RUN_TIMEOUT_SECS);
        Self {
            run_timeout_secs,
            backend: BackendConfig::from_env(),
            ..Self::default()
        }
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    pub fn with_generated_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.generated_dir = dir.into();
        self
    }

    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = Some(dir.into());
        self
    }

    pub fn with_run_timeout(mut self, secs: u64) -> Self {
        self.run_timeout_secs = secs;
        self
    }

    pub fn with_worker_timeout(mut self, secs: u64) -> Self {
        self.default_worker_timeout_secs = secs;
        self
    }

    pub fn with_summarize_result(mut self, enabled: bool) -> Self {
        self.summarize_result = enabled;
        self
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    /// Resolve a path against the workspace root (absolute paths pass through).
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }

    /// Where the definition for `agent_name` is persisted.
    pub fn module_file(&self, agent_name: &str, filename: Option<&str>) -> PathBuf {
        match filename.filter(|f| !f.trim().is_empty()) {
            Some(f) => self.resolve(f),
            None => self
                .resolve(&self.generated_dir)
                .join(format!("{}.yaml", agent_name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentryConfig::default();
        assert_eq!(config.run_timeout_secs, 300);
        assert_eq!(config.default_worker_timeout_secs, 30);
        assert!(!config.summarize_result);
        assert_eq!(config.backend.model, "gemini-2.5-flash");
        assert_eq!(config.backend.adapter, "openai");
    }

    #[test]
    fn test_module_file_resolution() {
        let config = AgentryConfig::default().with_workspace_root("/work");
        assert_eq!(
            config.module_file("calc", None),
            PathBuf::from("/work/generated/calc.yaml")
        );
        assert_eq!(
            config.module_file("calc", Some("agents/calc.yaml")),
            PathBuf::from("/work/agents/calc.yaml")
        );
        assert_eq!(
            config.module_file("calc", Some("/abs/calc.yaml")),
            PathBuf::from("/abs/calc.yaml")
        );
    }

    #[test]
    fn test_builders() {
        let config = AgentryConfig::default()
            .with_run_timeout(5)
            .with_worker_timeout(2)
            .with_summarize_result(true)
            .with_template_dir("tpl");
        assert_eq!(config.run_timeout_secs, 5);
        assert_eq!(config.default_worker_timeout_secs, 2);
        assert!(config.summarize_result);
        assert_eq!(config.template_dir, Some(PathBuf::from("tpl")));
    }
}
