//! Agent Synthesizer ("Creator") — turns a workflow document into live workers.
//!
//! For one incoming document the Creator:
//!
//! 1. parses it and checks the structure (`agents` list present, non-empty)
//! 2. validates every agent and reference, aggregating all errors
//! 3. per agent, in document order: picks a template, reuses or regenerates
//!    the definition, screens it, checks it, persists it, loads it, and
//!    registers a worker for it
//! 4. requires at least one registered worker and a head with a start message
//! 5. forwards a routing manifest to `Start`
//! 6. reports per-agent registration errors to `End` (non-fatal)
//!
//! Steps 1-2 and any screening, syntax or load failure in step 3 halt the
//! run. Registration failures only drop that worker.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::backend::{ModelBackend, ModelRequest};
use crate::config::AgentryConfig;
use crate::error::WorkflowError;
use crate::launcher::RoutingManifest;
use crate::runtime::{
    AgentRuntime, Envelope, MessageContext, Worker, WorkerFactory, CREATOR, RESERVED_NAMES, START,
};
use crate::synthesis::module::{GeneratedModule, ModuleKind, ModuleLoader};
use crate::synthesis::prompts::CREATOR_SYSTEM_PROMPT;
use crate::synthesis::screener::{screen, strip_markers};
use crate::synthesis::template::{
    extract_version, render, should_regenerate, stamp_version, TemplateKind, TemplateStore,
};
use crate::tools::ToolBinder;
use crate::worker::GeneratedWorker;
use crate::workflow::schema::{AgentSpec, WorkflowDocument};
use crate::workflow::validator::{chain_order, validate};

/// What one synthesis pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisReport {
    /// Agents whose definition was (re)generated through the backend
    pub generated: Vec<String>,
    /// Agents whose existing definition was reused
    pub reused: Vec<String>,
    pub registered: Vec<String>,
    pub registration_errors: Vec<String>,
}

pub struct Creator {
    config: AgentryConfig,
    backend: Arc<dyn ModelBackend>,
    binder: Arc<dyn ToolBinder>,
    templates: TemplateStore,
    loader: Arc<ModuleLoader>,
    last_report: Mutex<Option<SynthesisReport>>,
}

impl Creator {
    pub fn new(
        config: AgentryConfig,
        backend: Arc<dyn ModelBackend>,
        binder: Arc<dyn ToolBinder>,
        loader: Arc<ModuleLoader>,
    ) -> Self {
        let templates = match &config.template_dir {
            Some(dir) => TemplateStore::with_dir(config.resolve(dir)),
            None => TemplateStore::builtin(),
        };
        Self {
            config,
            backend,
            binder,
            templates,
            loader,
            last_report: Mutex::new(None),
        }
    }

    /// Report of the most recent synthesis that got as far as dispatch.
    pub fn last_report(&self) -> Option<SynthesisReport> {
        self.last_report.lock().ok().and_then(|r| r.clone())
    }

    /// Run the whole synthesis for one document and dispatch the manifest.
    ///
    /// Fatal problems come back as `Err`; the caller reports them to `End`.
    pub async fn synthesize(
        &self,
        text: &str,
        ctx: &MessageContext,
    ) -> Result<SynthesisReport, WorkflowError> {
        let doc = WorkflowDocument::from_yaml(text)?;
        validate(&doc)?;

        let mut report = SynthesisReport::default();
        let mut registered: BTreeMap<String, AgentSpec> = BTreeMap::new();

        for spec in &doc.agents {
            let name = spec.agent_name.as_str();
            let file = self
                .config
                .module_file(name, spec.filename.as_deref());

            if self.prepare_module(spec, &file).await? {
                report.generated.push(name.to_string());
            } else {
                report.reused.push(name.to_string());
            }

            let module = self.loader.load(name, &file)?;

            match self.register_worker(ctx.runtime.as_ref(), spec, module) {
                Ok(()) => {
                    tracing::debug!("[Creator] Agent {} registered and live", name);
                    report.registered.push(name.to_string());
                    registered.insert(name.to_string(), spec.clone());
                }
                Err(e) if !e.is_fatal() => {
                    tracing::error!("[Creator] {}", e);
                    report.registration_errors.push(e.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        if registered.is_empty() {
            return Err(WorkflowError::Synthesis(
                "No agents were successfully registered".to_string(),
            ));
        }

        let head = doc
            .head()
            .filter(|h| h.start_message().is_some())
            .ok_or_else(|| {
                WorkflowError::Synthesis("Head agent has no test_message specified".to_string())
            })?;

        tracing::info!(
            "[Creator] Starting workflow:\n{}",
            self.chain_summary(&doc, &registered)
        );

        let manifest = RoutingManifest {
            agents: registered,
            head_agent: Some(head.clone()),
            workflow_config: doc.config(),
        };
        let manifest = manifest.to_json()?;

        if let Ok(mut last) = self.last_report.lock() {
            *last = Some(report.clone());
        }

        tracing::debug!("[Creator] Workflow will start with agent {}", head.agent_name);
        if let Err(e) = ctx.send(Envelope::new(CREATOR, manifest), START).await {
            tracing::error!("[Creator] Failed to send workflow manifest to Start: {}", e);
            ctx.report_error(CREATOR, format!("Failed to start workflow: {}", e))
                .await;
        }

        if !report.registration_errors.is_empty() {
            ctx.report_error(
                CREATOR,
                format!(
                    "Errors encountered:\n{}",
                    report.registration_errors.join("\n")
                ),
            )
            .await;
        }

        Ok(report)
    }

    /// Make sure a valid definition exists at `file`.
    ///
    /// Returns `true` when it was generated, `false` when it was reused.
    async fn prepare_module(&self, spec: &AgentSpec, file: &Path) -> Result<bool, WorkflowError> {
        let name = spec.agent_name.as_str();
        let template = self.templates.load(TemplateKind::for_spec(spec))?;

        if file.exists() && !should_regenerate(file, &template) {
            tracing::debug!(
                "[Creator] Agent file {} already exists, skipping generation",
                file.display()
            );
            return Ok(false);
        }

        tracing::info!(
            "[Creator] Generating {} from {}",
            name,
            template.kind.file_name()
        );
        let prompt = render(&spec.description, &spec.behavior_prompt, &template.source);
        let reply = self
            .backend
            .generate(ModelRequest::new(CREATOR_SYSTEM_PROMPT, prompt))
            .await?;
        let candidate = strip_markers(&reply);

        let issues = screen(&candidate);
        if !issues.is_empty() {
            tracing::error!(
                "[Creator] Generated definition for {} failed security validation: {:?}",
                name,
                issues
            );
            return Err(WorkflowError::SafetyViolation {
                agent: name.to_string(),
                issues,
            });
        }

        let candidate = match template.version.as_deref() {
            Some(version) if extract_version(&candidate).as_deref() != Some(version) => {
                tracing::warn!(
                    "[Creator] Generated definition for {} lacks template_version \"{}\", stamping it",
                    name,
                    version
                );
                stamp_version(&candidate, version)
            }
            _ => candidate,
        };

        GeneratedModule::parse(name, &candidate)?;

        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(file, format!("{}\n", candidate)).await?;
        tracing::debug!("[Creator] Saved generated definition to {}", file.display());
        Ok(true)
    }

    fn register_worker(
        &self,
        runtime: &dyn AgentRuntime,
        spec: &AgentSpec,
        module: Arc<GeneratedModule>,
    ) -> Result<(), WorkflowError> {
        let name = spec.agent_name.clone();
        let refuse = |message: String| WorkflowError::Registration {
            agent: name.clone(),
            message,
        };

        if RESERVED_NAMES.contains(&name.as_str()) {
            return Err(refuse(format!("'{}' is a reserved worker name", name)));
        }
        if spec.has_tools() && module.kind == ModuleKind::Worker {
            return Err(refuse(
                "module kind 'worker' does not accept tool bindings".to_string(),
            ));
        }

        let spec = spec.clone();
        let backend = self.backend.clone();
        let binder = self.binder.clone();
        let default_timeout = self.config.default_worker_timeout_secs;
        let factory: WorkerFactory = Box::new(move || {
            Ok(Arc::new(GeneratedWorker::new(
                spec.agent_name.clone(),
                spec.behavior_prompt.clone(),
                spec.clone(),
                module.clone(),
                backend.clone(),
                binder.clone(),
                default_timeout,
            )) as Arc<dyn Worker>)
        });

        tracing::debug!("[Creator] Registering agent {}", name);
        runtime.register(&name, factory)
    }

    /// `[✓] fetcher (🔧1 tools) (⏱️30s) → [✗] summarizer (⏱️45s) → [⏳] End`
    fn chain_summary(
        &self,
        doc: &WorkflowDocument,
        registered: &BTreeMap<String, AgentSpec>,
    ) -> String {
        let live: HashSet<&str> = registered.keys().map(String::as_str).collect();
        let mut hops: Vec<String> = chain_order(doc)
            .into_iter()
            .map(|agent| {
                let status = if live.contains(agent.agent_name.as_str()) {
                    "✓"
                } else {
                    "✗"
                };
                let mut hop = format!("[{}] {}", status, agent.agent_name);
                if agent.has_tools() {
                    hop.push_str(&format!(" (🔧{} tools)", agent.tools.len()));
                }
                let timeout = agent
                    .timeout
                    .unwrap_or(self.config.default_worker_timeout_secs);
                hop.push_str(&format!(" (⏱️{}s)", timeout));
                hop
            })
            .collect();
        hops.push("[⏳] End".to_string());
        hops.join(" → ")
    }
}

#[async_trait]
impl Worker for Creator {
    fn name(&self) -> &str {
        CREATOR
    }

    async fn on_message(
        &self,
        envelope: Envelope,
        ctx: &MessageContext,
    ) -> Result<Envelope, WorkflowError> {
        tracing::debug!("[Creator] Received workflow document from {}", envelope.sender);

        match self.synthesize(&envelope.content, ctx).await {
            Ok(report) => {
                tracing::debug!(
                    "[Creator] Synthesis done: {} generated, {} reused, {} registered",
                    report.generated.len(),
                    report.reused.len(),
                    report.registered.len()
                );
                Ok(Envelope::ack(CREATOR))
            }
            Err(e) => {
                tracing::error!("[Creator] {}", e);
                ctx.report_error(CREATOR, e.to_string()).await;
                Err(e)
            }
        }
    }
}
