//! YAML schema types for workflow documents.
//!
//! A workflow document declares a chain of agents:
//!
//! ```yaml
//! agents:
//!   - agent_name: "fetcher"
//!     description: "Fetches a web page and extracts the article text"
//!     system_message: |
//!       You fetch the URL you are given and return the main article text.
//!     filename: "generated/fetcher.yaml"
//!     output_to: "summarizer"
//!     test_message: "https://example.com/post"
//!     timeout: 60
//!     tools:
//!       - name: "fetch"
//!         params:
//!           command: "uvx"
//!           args: ["mcp-server-fetch"]
//!           env:
//!             API_TOKEN: "${FETCH_TOKEN}"
//!
//!   - agent_name: "summarizer"
//!     description: "Summarizes text in three bullet points"
//!     system_message: "Summarize the input in three bullet points."
//!
//! workflow_config:
//!   input_mode: test_message      # test_message | interactive
//!   input_prompt: "What should I fetch?"
//!   input_timeout: 30
//! ```
//!
//! Required agent fields are deserialized leniently (missing = empty) so that
//! the validator can report every missing field at once instead of failing on
//! the first one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// Top-level workflow document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDocument {
    /// Ordered agent declarations; the first one is the head of the chain.
    pub agents: Vec<AgentSpec>,

    /// How the run's first message is produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_config: Option<WorkflowConfig>,
}

/// One agent declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Unique key; also the routing address of the registered worker
    #[serde(default)]
    pub agent_name: String,

    /// What the agent is for (fed to the generator)
    #[serde(default)]
    pub description: String,

    /// Behavior prompt, used verbatim as the worker's system prompt
    #[serde(default, alias = "system_message")]
    pub behavior_prompt: String,

    /// Where the generated definition is persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Next agent in the chain; absent means the Completion Sink
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_to: Option<String>,

    /// Tool bindings resolved lazily by the worker
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolBinding>,

    /// Start message, required on the head agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_message: Option<String>,

    /// Per-call backend timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl AgentSpec {
    pub fn new(
        agent_name: impl Into<String>,
        description: impl Into<String>,
        behavior_prompt: impl Into<String>,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            description: description.into(),
            behavior_prompt: behavior_prompt.into(),
            filename: None,
            output_to: None,
            tools: Vec::new(),
            test_message: None,
            timeout: None,
        }
    }

    pub fn with_output_to(mut self, target: impl Into<String>) -> Self {
        self.output_to = Some(target.into());
        self
    }

    pub fn with_test_message(mut self, message: impl Into<String>) -> Self {
        self.test_message = Some(message.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    pub fn with_tool(mut self, tool: ToolBinding) -> Self {
        self.tools.push(tool);
        self
    }

    /// The routing target, treating an empty string like an absent one.
    pub fn next_hop(&self) -> Option<&str> {
        self.output_to.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// The start message, treating a blank one like an absent one.
    pub fn start_message(&self) -> Option<&str> {
        self.test_message.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn has_tools(&self) -> bool {
        !self.tools.is_empty()
    }
}

/// A tool-binding descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolBinding {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub params: ToolParams,
}

impl ToolBinding {
    pub fn new(name: impl Into<String>, params: ToolParams) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Display name, `unknown` when the descriptor has none.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "unknown"
        } else {
            &self.name
        }
    }
}

/// Parameters handed to the tool-binding collaborator.
///
/// `env` values of the exact form `${NAME}` are resolved from the process
/// environment before binding; everything else passes through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, serde_json::Value>,

    /// Any other binder-specific keys
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// How the run's start message is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Use the head agent's `test_message` (default)
    #[default]
    TestMessage,
    /// Ask the operator, with a bounded wait
    Interactive,
}

/// Run-level input configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub input_mode: InputMode,

    #[serde(default = "default_input_prompt")]
    pub input_prompt: String,

    /// Seconds to wait for interactive input
    #[serde(default = "default_input_timeout")]
    pub input_timeout: f64,
}

fn default_input_prompt() -> String {
    "What would you like me to help you with?".to_string()
}

fn default_input_timeout() -> f64 {
    30.0
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            input_mode: InputMode::default(),
            input_prompt: default_input_prompt(),
            input_timeout: default_input_timeout(),
        }
    }
}

impl WorkflowDocument {
    /// Parse a workflow document from a YAML string.
    ///
    /// Structural problems (unparsable YAML, no top-level `agents` list, an
    /// empty list) short-circuit with a single [`WorkflowError::Document`].
    pub fn from_yaml(yaml: &str) -> Result<Self, WorkflowError> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml)
            .map_err(|e| WorkflowError::Document(format!("YAML parse error: {}", e)))?;

        let agents = value
            .as_mapping()
            .and_then(|m| m.get("agents"))
            .and_then(|a| a.as_sequence());

        match agents {
            None => {
                return Err(WorkflowError::Document(
                    "YAML must have a top-level 'agents' list.".to_string(),
                ))
            }
            Some(list) if list.is_empty() => {
                return Err(WorkflowError::Document(
                    "No agents specified in the configuration".to_string(),
                ))
            }
            Some(_) => {}
        }

        serde_yaml::from_value(value)
            .map_err(|e| WorkflowError::Document(format!("Invalid workflow document: {}", e)))
    }

    /// Load a workflow document from a file path.
    pub fn from_file(path: &str) -> Result<Self, WorkflowError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WorkflowError::Document(format!("Failed to read workflow file '{}': {}", path, e))
        })?;
        Self::from_yaml(&content)
    }

    /// Serialize back to YAML (the form handed to the Creator).
    pub fn to_yaml(&self) -> Result<String, WorkflowError> {
        serde_yaml::to_string(self)
            .map_err(|e| WorkflowError::Document(format!("Failed to serialize workflow: {}", e)))
    }

    /// The head of the chain: first agent in document order.
    pub fn head(&self) -> Option<&AgentSpec> {
        self.agents.first()
    }

    pub fn agent(&self, name: &str) -> Option<&AgentSpec> {
        self.agents.iter().find(|a| a.agent_name == name)
    }

    /// Input configuration with defaults applied.
    pub fn config(&self) -> WorkflowConfig {
        self.workflow_config.clone().unwrap_or_default()
    }
}
