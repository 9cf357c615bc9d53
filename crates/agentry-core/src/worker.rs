//! Worker Runtime Shell — the fixed executor behind every generated worker.
//!
//! A `GeneratedWorker` is built by the factory registered by the Creator. It
//! holds the behavior prompt and spec baked in at registration plus the
//! loaded module definition. On the first message it binds the agent spec's tools
//! and builds its delegate, then for every message:
//!
//! 1. sends the payload to the backend as a single-turn exchange under the
//!    worker timeout
//! 2. on timeout or failure substitutes a diagnostic payload
//! 3. forwards the result to `output_to`, or to `End` when there is none

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::backend::{ModelBackend, ModelRequest};
use crate::error::WorkflowError;
use crate::runtime::{Envelope, MessageContext, Worker, END};
use crate::synthesis::module::GeneratedModule;
use crate::tools::{bind_all, BoundTool, ToolBinder};
use crate::workflow::schema::AgentSpec;

/// Resolved tools plus the system prompt they are used with.
#[derive(Debug, Clone)]
struct Delegate {
    system_prompt: String,
    tools: Vec<BoundTool>,
}

pub struct GeneratedWorker {
    name: String,
    behavior_prompt: String,
    spec: AgentSpec,
    module: Arc<GeneratedModule>,
    backend: Arc<dyn ModelBackend>,
    binder: Arc<dyn ToolBinder>,
    timeout: Duration,
    delegate: OnceCell<Delegate>,
    last_activity: Mutex<Instant>,
}

impl GeneratedWorker {
    /// Construct from the fixed `(name, behavior_prompt, spec)` shape.
    pub fn new(
        name: impl Into<String>,
        behavior_prompt: impl Into<String>,
        spec: AgentSpec,
        module: Arc<GeneratedModule>,
        backend: Arc<dyn ModelBackend>,
        binder: Arc<dyn ToolBinder>,
        default_timeout_secs: u64,
    ) -> Self {
        let timeout = Duration::from_secs(spec.timeout.unwrap_or(default_timeout_secs));
        Self {
            name: name.into(),
            behavior_prompt: behavior_prompt.into(),
            spec,
            module,
            backend,
            binder,
            timeout,
            delegate: OnceCell::new(),
            last_activity: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        if let Ok(mut last) = self.last_activity.lock() {
            *last = Instant::now();
        }
    }

    fn idle_secs(&self) -> f64 {
        self.last_activity
            .lock()
            .map(|last| last.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    async fn delegate(&self) -> &Delegate {
        self.delegate
            .get_or_init(|| async {
                let tools = if self.spec.has_tools() && self.module.kind.accepts_tools() {
                    bind_all(self.binder.as_ref(), &self.name, &self.spec.tools).await
                } else {
                    Vec::new()
                };
                if self.spec.has_tools() && tools.is_empty() {
                    tracing::warn!(
                        "[Worker:{}] No tools could be bound, continuing without tools",
                        self.name
                    );
                }
                tracing::debug!(
                    "[Worker:{}] Delegate ready with {} tool(s) (persona: {}, reflect_on_tool_use: {})",
                    self.name,
                    tools.len(),
                    self.module.persona.as_deref().unwrap_or("-"),
                    self.module.reflect_on_tool_use && !tools.is_empty()
                );
                Delegate {
                    system_prompt: self.behavior_prompt.clone(),
                    tools,
                }
            })
            .await
    }

    /// Diagnostic text substituted for a reply that never came.
    fn diagnostic(&self, cause: &str) -> String {
        let mut lines = vec![
            format!("Agent '{}' could not complete its task.", self.name),
            format!("Cause: {}", cause),
        ];
        if self.spec.has_tools() {
            lines.push(format!("Tools configured: {}", self.spec.tools.len()));
            let names: Vec<&str> = self.spec.tools.iter().map(|t| t.display_name()).collect();
            lines.push(format!("Tool names: {}", names.join(", ")));
        }
        lines.push(
            if self.delegate.initialized() {
                "Delegate initialized"
            } else {
                "Delegate not initialized"
            }
            .to_string(),
        );
        lines.push(format!("Last activity: {:.1}s ago", self.idle_secs()));
        lines.join("\n")
    }

    /// Ask the backend, substituting a diagnostic on timeout or failure.
    async fn respond(&self, content: String) -> Envelope {
        self.touch();
        let delegate = self.delegate().await;
        let request = ModelRequest::new(delegate.system_prompt.clone(), content)
            .with_tools(delegate.tools.clone());

        match tokio::time::timeout(self.timeout, self.backend.generate(request)).await {
            Ok(Ok(reply)) => {
                self.touch();
                Envelope::new(&self.name, reply)
            }
            Ok(Err(e)) => {
                let err = WorkflowError::Execution {
                    agent: self.name.clone(),
                    message: e.to_string(),
                };
                tracing::error!("[Worker:{}] {}", self.name, err);
                Envelope::diagnostic(&self.name, self.diagnostic(&err.to_string()))
            }
            Err(_) => {
                let err = WorkflowError::ExecutionTimeout {
                    agent: self.name.clone(),
                    secs: self.timeout.as_secs(),
                };
                tracing::warn!("[Worker:{}] {}", self.name, err);
                Envelope::diagnostic(&self.name, self.diagnostic(&err.to_string()))
            }
        }
    }
}

#[async_trait]
impl Worker for GeneratedWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_message(
        &self,
        envelope: Envelope,
        ctx: &MessageContext,
    ) -> Result<Envelope, WorkflowError> {
        tracing::info!("[Worker:{}] Received message from {}", self.name, envelope.sender);

        let result = self.respond(envelope.content).await;
        let target = self.spec.next_hop().unwrap_or(END);
        tracing::debug!("[Worker:{}] --> {}", self.name, target);

        match ctx.send(result.clone(), target).await {
            Ok(_) => Ok(result),
            Err(e @ WorkflowError::Routing { .. }) => {
                tracing::error!("[Worker:{}] {}", self.name, e);
                ctx.report_error(&self.name, e.to_string()).await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}
