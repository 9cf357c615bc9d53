//! Workflow Launcher ("Start") — resolves the start message and kicks off
//! the head worker.
//!
//! The Creator forwards a JSON routing manifest:
//!
//! ```json
//! {
//!   "agents": { "calc": { "agent_name": "calc", ... } },
//!   "head_agent": { "agent_name": "calc", "test_message": "Add 3 + 5", ... },
//!   "workflow_config": { "input_mode": "test_message", "input_prompt": "...", "input_timeout": 30 }
//! }
//! ```

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;
use crate::runtime::{Envelope, MessageContext, Worker, START};
use crate::workflow::schema::{AgentSpec, InputMode, WorkflowConfig};

pub const NO_INPUT_FALLBACK: &str = "No input provided - proceeding with default workflow";
pub const TIMEOUT_FALLBACK: &str = "Input timeout - proceeding with default workflow";
pub const ERROR_FALLBACK: &str = "Error collecting input - proceeding with default workflow";

/// What the Creator hands to the launcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingManifest {
    /// Successfully registered agents, by name
    #[serde(default)]
    pub agents: BTreeMap<String, AgentSpec>,
    #[serde(default)]
    pub head_agent: Option<AgentSpec>,
    #[serde(default)]
    pub workflow_config: WorkflowConfig,
}

impl RoutingManifest {
    pub fn to_json(&self) -> Result<String, WorkflowError> {
        serde_json::to_string(self)
            .map_err(|e| WorkflowError::Document(format!("Failed to encode manifest: {}", e)))
    }
}

/// Source of interactive start messages.
#[async_trait]
pub trait InputCollector: Send + Sync {
    async fn collect(&self, prompt: &str) -> Result<String, WorkflowError>;
}

/// Prompts on stdout and reads one line from stdin.
#[derive(Debug, Default, Clone)]
pub struct StdinCollector;

#[async_trait]
impl InputCollector for StdinCollector {
    async fn collect(&self, prompt: &str) -> Result<String, WorkflowError> {
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || {
            let mut stdout = std::io::stdout();
            writeln!(stdout, "\n🤖 {}", prompt)?;
            write!(stdout, "💬 Your input: ")?;
            stdout.flush()?;
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok::<_, std::io::Error>(line)
        })
        .await
        .map_err(|e| WorkflowError::Input(e.to_string()))?
        .map_err(|e| WorkflowError::Input(e.to_string()))
    }
}

pub struct Launcher {
    collector: Arc<dyn InputCollector>,
}

impl Launcher {
    pub fn new(collector: Arc<dyn InputCollector>) -> Self {
        Self { collector }
    }

    /// Bounded interactive wait; never fails, falls back to fixed messages.
    async fn interactive_input(&self, config: &WorkflowConfig) -> String {
        let wait = Duration::try_from_secs_f64(config.input_timeout)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or(Duration::from_secs(30));
        tracing::info!("[Start] Interactive mode: {}", config.input_prompt);

        match tokio::time::timeout(wait, self.collector.collect(&config.input_prompt)).await {
            Ok(Ok(input)) if !input.trim().is_empty() => {
                let input = input.trim().to_string();
                tracing::info!("[Start] User input received: {}", preview(&input, 100));
                input
            }
            Ok(Ok(_)) => {
                tracing::warn!("[Start] No user input received, using fallback message");
                NO_INPUT_FALLBACK.to_string()
            }
            Ok(Err(e)) => {
                tracing::error!("[Start] Error collecting input: {}", e);
                ERROR_FALLBACK.to_string()
            }
            Err(_) => {
                tracing::warn!("[Start] Input timeout after {:?}, using fallback message", wait);
                TIMEOUT_FALLBACK.to_string()
            }
        }
    }

    async fn fail(&self, ctx: &MessageContext, message: String) -> Result<Envelope, WorkflowError> {
        tracing::error!("[Start] {}", message);
        ctx.report_error(START, message.clone()).await;
        Err(WorkflowError::Document(message))
    }
}

fn preview(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}

#[async_trait]
impl Worker for Launcher {
    fn name(&self) -> &str {
        START
    }

    async fn on_message(
        &self,
        envelope: Envelope,
        ctx: &MessageContext,
    ) -> Result<Envelope, WorkflowError> {
        tracing::debug!("[Start] Received workflow manifest from {}", envelope.sender);

        let manifest: RoutingManifest = match serde_json::from_str(&envelope.content) {
            Ok(m) => m,
            Err(e) => {
                return self
                    .fail(ctx, format!("Failed to parse workflow manifest: {}", e))
                    .await
            }
        };

        let head = match manifest.head_agent.as_ref() {
            Some(head) if !manifest.agents.is_empty() => head,
            _ => {
                return self
                    .fail(ctx, "Invalid workflow spec - missing agents or head_agent".to_string())
                    .await
            }
        };

        if !manifest.agents.contains_key(&head.agent_name)
            || !ctx.runtime.is_registered(&head.agent_name)
        {
            return self
                .fail(
                    ctx,
                    format!(
                        "Head agent '{}' not found in registered agents",
                        head.agent_name
                    ),
                )
                .await;
        }

        let start_message = match manifest.workflow_config.input_mode {
            InputMode::Interactive => self.interactive_input(&manifest.workflow_config).await,
            InputMode::TestMessage => head.start_message().unwrap_or_default().to_string(),
        };
        if start_message.trim().is_empty() {
            return self.fail(ctx, "No start message available".to_string()).await;
        }

        tracing::info!("[Start] Starting workflow with agent: {}", head.agent_name);
        tracing::debug!("[Start] Start message: {}", start_message);

        if let Err(e) = ctx
            .send(Envelope::new(START, start_message), &head.agent_name)
            .await
        {
            return self
                .fail(ctx, format!("Failed to start workflow: {}", e))
                .await;
        }
        Ok(Envelope::ack(START))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_state::RunHandle;
    use crate::runtime::{AgentRuntime, LocalRuntime, END};

    struct Record;

    #[async_trait]
    impl Worker for Record {
        fn name(&self) -> &str {
            "head"
        }

        async fn on_message(
            &self,
            envelope: Envelope,
            ctx: &MessageContext,
        ) -> Result<Envelope, WorkflowError> {
            ctx.run.set_result(format!("{}:{}", envelope.sender, envelope.content));
            Ok(Envelope::ack("head"))
        }
    }

    struct Failing;

    #[async_trait]
    impl Worker for Failing {
        fn name(&self) -> &str {
            END
        }

        async fn on_message(
            &self,
            envelope: Envelope,
            ctx: &MessageContext,
        ) -> Result<Envelope, WorkflowError> {
            ctx.run.set_error(envelope.content);
            Ok(Envelope::ack(END))
        }
    }

    struct Scripted(Result<&'static str, ()>);

    #[async_trait]
    impl InputCollector for Scripted {
        async fn collect(&self, _prompt: &str) -> Result<String, WorkflowError> {
            self.0
                .map(str::to_string)
                .map_err(|_| WorkflowError::Input("stdin closed".to_string()))
        }
    }

    struct Never;

    #[async_trait]
    impl InputCollector for Never {
        async fn collect(&self, _prompt: &str) -> Result<String, WorkflowError> {
            std::future::pending::<()>().await;
            Ok(String::new())
        }
    }

    fn manifest(head: AgentSpec, config: WorkflowConfig) -> String {
        let mut agents = BTreeMap::new();
        agents.insert(head.agent_name.clone(), head.clone());
        RoutingManifest {
            agents,
            head_agent: Some(head),
            workflow_config: config,
        }
        .to_json()
        .unwrap()
    }

    async fn launch(collector: Arc<dyn InputCollector>, content: String) -> (RunHandle, bool) {
        let runtime = LocalRuntime::new();
        let launcher = Arc::new(Launcher::new(collector));
        runtime
            .register(START, Box::new(move || Ok(launcher.clone() as Arc<dyn Worker>)))
            .unwrap();
        runtime
            .register("head", Box::new(|| Ok(Arc::new(Record) as Arc<dyn Worker>)))
            .unwrap();
        runtime
            .register(END, Box::new(|| Ok(Arc::new(Failing) as Arc<dyn Worker>)))
            .unwrap();
        let run = RunHandle::new();
        let ok = runtime
            .send(Envelope::new("Creator", content), START, &run)
            .await
            .is_ok();
        (run, ok)
    }

    #[tokio::test]
    async fn test_test_message_mode_dispatches_to_head() {
        let head = AgentSpec::new("head", "d", "p").with_test_message("Add 3 + 5");
        let (run, ok) = launch(Arc::new(Never), manifest(head, WorkflowConfig::default())).await;
        assert!(ok);
        assert_eq!(
            run.outcome(),
            Some(crate::run_state::RunOutcome::Completed("Start:Add 3 + 5".to_string()))
        );
    }

    #[tokio::test]
    async fn test_interactive_input_used() {
        let head = AgentSpec::new("head", "d", "p");
        let config = WorkflowConfig {
            input_mode: InputMode::Interactive,
            ..Default::default()
        };
        let (run, _) = launch(Arc::new(Scripted(Ok("  hello  "))), manifest(head, config)).await;
        let done = run.await_completion(Duration::from_millis(100)).await;
        assert_eq!(done.text, "Start:hello");
    }

    #[tokio::test]
    async fn test_interactive_fallbacks() {
        let config = WorkflowConfig {
            input_mode: InputMode::Interactive,
            input_timeout: 0.05,
            ..Default::default()
        };
        let head = AgentSpec::new("head", "d", "p");

        let (run, _) = launch(Arc::new(Never), manifest(head.clone(), config.clone())).await;
        assert_eq!(
            run.await_completion(Duration::from_millis(100)).await.text,
            format!("Start:{}", TIMEOUT_FALLBACK)
        );

        let (run, _) = launch(Arc::new(Scripted(Ok("   "))), manifest(head.clone(), config.clone())).await;
        assert_eq!(
            run.await_completion(Duration::from_millis(100)).await.text,
            format!("Start:{}", NO_INPUT_FALLBACK)
        );

        let (run, _) = launch(Arc::new(Scripted(Err(()))), manifest(head, config)).await;
        assert_eq!(
            run.await_completion(Duration::from_millis(100)).await.text,
            format!("Start:{}", ERROR_FALLBACK)
        );
    }

    #[tokio::test]
    async fn test_missing_start_message_is_fatal() {
        let head = AgentSpec::new("head", "d", "p");
        let (run, ok) = launch(Arc::new(Never), manifest(head, WorkflowConfig::default())).await;
        assert!(!ok);
        let done = run.await_completion(Duration::from_millis(100)).await;
        assert!(!done.success);
        assert_eq!(done.text, "No start message available");
    }

    #[tokio::test]
    async fn test_missing_head_is_fatal() {
        let (run, ok) = launch(Arc::new(Never), "{\"agents\": {}}".to_string()).await;
        assert!(!ok);
        assert_eq!(
            run.await_completion(Duration::from_millis(100)).await.text,
            "Invalid workflow spec - missing agents or head_agent"
        );
    }

    #[tokio::test]
    async fn test_unregistered_head_is_fatal() {
        let head = AgentSpec::new("head", "d", "p").with_test_message("go");
        let manifest = RoutingManifest {
            agents: BTreeMap::from([("other".to_string(), AgentSpec::new("other", "d", "p"))]),
            head_agent: Some(head),
            workflow_config: WorkflowConfig::default(),
        };
        let (run, ok) = launch(Arc::new(Never), manifest.to_json().unwrap()).await;
        assert!(!ok);
        assert_eq!(
            run.await_completion(Duration::from_millis(100)).await.text,
            "Head agent 'head' not found in registered agents"
        );
    }

    #[tokio::test]
    async fn test_head_missing_from_runtime_is_fatal() {
        let head = AgentSpec::new("ghost", "d", "p").with_test_message("go");
        let (run, ok) = launch(Arc::new(Never), manifest(head, WorkflowConfig::default())).await;
        assert!(!ok);
        assert_eq!(
            run.await_completion(Duration::from_millis(100)).await.text,
            "Head agent 'ghost' not found in registered agents"
        );
    }
}
