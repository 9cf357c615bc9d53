//! Pipeline — the top-level driver for one workflow run.
//!
//! ```text
//! document ──► Creator ──► Start ──► head ──► … ──► End ──► RunHandle
//!                                                              │
//!                      Pipeline::run ◄── await_completion(run_timeout)
//! ```
//!
//! The document is dispatched on a spawned task; the driver only waits on
//! the run handle. Hitting the overall timeout stops the wait, not the task.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::backend::{HttpBackend, ModelBackend};
use crate::completion::CompletionSink;
use crate::config::AgentryConfig;
use crate::error::WorkflowError;
use crate::launcher::{InputCollector, Launcher, StdinCollector};
use crate::run_state::RunHandle;
use crate::runtime::{AgentRuntime, Envelope, LocalRuntime, Worker, CREATOR, END, HOST, START};
use crate::synthesis::{Creator, ModuleLoader, SynthesisReport};
use crate::tools::{DescriptorBinder, ToolBinder};

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub success: bool,
    pub text: String,
    /// Present when synthesis got as far as dispatching the manifest
    pub synthesis: Option<SynthesisReport>,
}

pub struct Pipeline {
    config: AgentryConfig,
    backend: Arc<dyn ModelBackend>,
    binder: Arc<dyn ToolBinder>,
    collector: Arc<dyn InputCollector>,
    loader: Arc<ModuleLoader>,
}

impl Pipeline {
    pub fn new(config: AgentryConfig, backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            config,
            backend,
            binder: Arc::new(DescriptorBinder),
            collector: Arc::new(StdinCollector),
            loader: Arc::new(ModuleLoader::new()),
        }
    }

    /// Pipeline backed by the HTTP model API from `config.backend`.
    pub fn http(config: AgentryConfig) -> Self {
        let backend = Arc::new(HttpBackend::new(config.backend.clone()));
        Self::new(config, backend)
    }

    pub fn with_binder(mut self, binder: Arc<dyn ToolBinder>) -> Self {
        self.binder = binder;
        self
    }

    pub fn with_collector(mut self, collector: Arc<dyn InputCollector>) -> Self {
        self.collector = collector;
        self
    }

    /// Register the fixed Creator / Start / End workers on a fresh runtime.
    fn build_runtime(&self, creator: Arc<Creator>) -> Result<Arc<LocalRuntime>, WorkflowError> {
        let runtime = LocalRuntime::new();

        runtime.register(CREATOR, Box::new(move || Ok(creator.clone() as Arc<dyn Worker>)))?;

        let collector = self.collector.clone();
        runtime.register(
            START,
            Box::new(move || Ok(Arc::new(Launcher::new(collector.clone())) as Arc<dyn Worker>)),
        )?;

        let summarizer = self.config.summarize_result.then(|| self.backend.clone());
        runtime.register(
            END,
            Box::new(move || {
                let sink = match &summarizer {
                    Some(backend) => CompletionSink::with_summarizer(backend.clone()),
                    None => CompletionSink::new(),
                };
                Ok(Arc::new(sink) as Arc<dyn Worker>)
            }),
        )?;

        Ok(runtime)
    }

    /// Run one workflow document to completion or timeout.
    pub async fn run(&self, document: &str) -> Result<RunSummary, WorkflowError> {
        let creator = Arc::new(Creator::new(
            self.config.clone(),
            self.backend.clone(),
            self.binder.clone(),
            self.loader.clone(),
        ));
        let runtime = self.build_runtime(creator.clone())?;

        let run = RunHandle::new();
        run.reset();
        let run_id = run.run_id();
        tracing::info!("[Pipeline] Run {} started", run_id);

        let dispatch_runtime = runtime.clone();
        let dispatch_run = run.clone();
        let envelope = Envelope::new(HOST, document);
        tokio::spawn(async move {
            if let Err(e) = dispatch_runtime.send(envelope, CREATOR, &dispatch_run).await {
                tracing::debug!("[Pipeline] Dispatch ended with error: {}", e);
            }
        });

        let completion = run
            .await_completion(Duration::from_secs(self.config.run_timeout_secs))
            .await;
        if !completion.success && !run.is_completed() {
            tracing::error!(
                "[Pipeline] {}",
                WorkflowError::OverallTimeout {
                    secs: self.config.run_timeout_secs
                }
            );
        }
        tracing::info!(
            "[Pipeline] Run {} finished in {}ms: success={}",
            run_id,
            (chrono::Utc::now() - run.started_at()).num_milliseconds(),
            completion.success
        );

        Ok(RunSummary {
            run_id,
            success: completion.success,
            text: completion.text,
            synthesis: creator.last_report(),
        })
    }

    /// Read a workflow file and run it.
    pub async fn run_file(&self, path: impl AsRef<Path>) -> Result<RunSummary, WorkflowError> {
        let path = path.as_ref();
        let document = tokio::fs::read_to_string(path).await.map_err(|e| {
            WorkflowError::Document(format!(
                "Failed to read workflow file '{}': {}",
                path.display(),
                e
            ))
        })?;
        self.run(&document).await
    }
}
