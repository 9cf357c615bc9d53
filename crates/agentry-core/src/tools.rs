//! Tool binding — turns `tools:` descriptors into tools a delegate can use.
//!
//! Launching tool servers is the binder's concern. The built-in
//! [`DescriptorBinder`] only resolves environment references and checks the
//! descriptor is usable, which is all the HTTP backend needs to describe the
//! tools to the model.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::WorkflowError;
use crate::workflow::env::resolve_env_map;
use crate::workflow::schema::ToolBinding;

/// A resolved tool, ready to hand to a backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundTool {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl BoundTool {
    /// One-line description used in prompts and logs.
    pub fn summary(&self) -> String {
        match &self.command {
            Some(cmd) if self.args.is_empty() => format!("{} ({})", self.name, cmd),
            Some(cmd) => format!("{} ({} {})", self.name, cmd, self.args.join(" ")),
            None => self.name.clone(),
        }
    }
}

#[async_trait]
pub trait ToolBinder: Send + Sync {
    async fn bind(&self, binding: &ToolBinding) -> Result<BoundTool, WorkflowError>;
}

/// Binds descriptors as-is after `${ENV}` resolution.
#[derive(Debug, Default, Clone)]
pub struct DescriptorBinder;

#[async_trait]
impl ToolBinder for DescriptorBinder {
    async fn bind(&self, binding: &ToolBinding) -> Result<BoundTool, WorkflowError> {
        if binding.name.trim().is_empty() {
            return Err(WorkflowError::Execution {
                agent: "tools".to_string(),
                message: "Tool descriptor has no name".to_string(),
            });
        }
        let params = &binding.params;
        if params.command.is_none() && params.extra.is_empty() {
            return Err(WorkflowError::Execution {
                agent: "tools".to_string(),
                message: format!("Tool '{}' has no command", binding.name),
            });
        }
        Ok(BoundTool {
            name: binding.name.clone(),
            command: params.command.clone(),
            args: params.args.clone(),
            env: resolve_env_map(&params.env),
            extra: params.extra.clone(),
        })
    }
}

/// Bind every descriptor, dropping the ones that fail.
pub async fn bind_all(
    binder: &dyn ToolBinder,
    owner: &str,
    bindings: &[ToolBinding],
) -> Vec<BoundTool> {
    let mut tools = Vec::with_capacity(bindings.len());
    for binding in bindings {
        match binder.bind(binding).await {
            Ok(tool) => {
                tracing::debug!("[Worker:{}] Bound tool {}", owner, tool.summary());
                tools.push(tool);
            }
            Err(e) => {
                tracing::error!(
                    "[Worker:{}] Failed to bind tool '{}': {}",
                    owner,
                    binding.display_name(),
                    e
                );
            }
        }
    }
    tools
}
