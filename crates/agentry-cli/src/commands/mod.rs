//! CLI command implementations.
//!
//! Each command returns `Result<(), String>`; `main` prints the error and
//! exits non-zero.

pub mod screen;
pub mod workflow;

use std::path::PathBuf;

use agentry_core::AgentryConfig;

/// Options shared by the commands that run a pipeline.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub timeout_secs: Option<u64>,
    pub generated_dir: Option<PathBuf>,
    pub template_dir: Option<PathBuf>,
    pub workspace_root: Option<PathBuf>,
    pub summarize: bool,
    pub adapter: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

impl RunOptions {
    /// Environment defaults with the command-line overrides applied.
    pub fn to_config(&self) -> AgentryConfig {
        let mut config = AgentryConfig::from_env();
        if let Some(secs) = self.timeout_secs {
            config = config.with_run_timeout(secs);
        }
        if let Some(dir) = &self.generated_dir {
            config = config.with_generated_dir(dir);
        }
        if let Some(dir) = &self.template_dir {
            config = config.with_template_dir(dir);
        }
        if let Some(root) = &self.workspace_root {
            config = config.with_workspace_root(root);
        }
        if self.summarize {
            config = config.with_summarize_result(true);
        }
        if let Some(adapter) = &self.adapter {
            config.backend.adapter = adapter.clone();
        }
        if let Some(url) = &self.base_url {
            config.backend.base_url = url.clone();
        }
        if let Some(model) = &self.model {
            config.backend.model = model.clone();
        }
        if let Some(key) = &self.api_key {
            config.backend.api_key = key.clone();
        }
        config
    }
}

/// Load `.env.local` then `.env`; variables already set keep their value.
///
/// Runs before logging is configured (it can set `DEBUG` / `RUST_LOG`), so
/// the loaded paths are returned for the caller to log.
pub fn load_dotenv() -> Vec<PathBuf> {
    [".env.local", ".env"]
        .into_iter()
        .filter_map(|filename| dotenv::from_filename(filename).ok())
        .collect()
}

/// Whether an environment flag is set to a truthy value.
pub fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", head)
    }
}
