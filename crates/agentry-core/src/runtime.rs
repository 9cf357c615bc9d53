//! Message runtime — envelopes, the `Worker` trait and the name-keyed registry.
//!
//! Workers are registered under a name with a factory; the instance is built
//! on the first message addressed to that name and reused for the rest of
//! the run. Delivery is a direct async call, so a chain of workers runs
//! strictly in sequence.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::error::WorkflowError;
use crate::run_state::RunHandle;

/// Reserved address of the Agent Synthesizer.
pub const CREATOR: &str = "Creator";
/// Reserved address of the Workflow Launcher.
pub const START: &str = "Start";
/// Reserved address of the Completion Sink.
pub const END: &str = "End";
/// Sender name used by the outer driver.
pub const HOST: &str = "Host";

pub const RESERVED_NAMES: &[&str] = &[CREATOR, START, END];

/// What an envelope carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeKind {
    /// Ordinary payload.
    #[default]
    Message,
    /// A worker's substitute payload after a backend timeout or failure.
    Diagnostic,
    /// An error report addressed to the Completion Sink.
    Error,
}

/// The unit passed between workers. Never mutated after send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub content: String,
    pub sender: String,
    pub kind: EnvelopeKind,
}

impl Envelope {
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: sender.into(),
            kind: EnvelopeKind::Message,
        }
    }

    pub fn error(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: EnvelopeKind::Error,
            ..Self::new(sender, content)
        }
    }

    pub fn diagnostic(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: EnvelopeKind::Diagnostic,
            ..Self::new(sender, content)
        }
    }

    /// Empty acknowledgement returned by handlers that route onward.
    pub fn ack(sender: impl Into<String>) -> Self {
        Self::new(sender, "")
    }

    pub fn is_error(&self) -> bool {
        self.kind != EnvelopeKind::Message
    }
}

/// Per-delivery context handed to a worker.
#[derive(Clone)]
pub struct MessageContext {
    pub runtime: Arc<dyn AgentRuntime>,
    pub run: RunHandle,
}

impl MessageContext {
    /// Send an envelope to another worker of the same run.
    pub async fn send(&self, envelope: Envelope, target: &str) -> Result<Envelope, WorkflowError> {
        self.runtime.send(envelope, target, &self.run).await
    }

    /// Report a fatal error to the Completion Sink.
    ///
    /// Delivery failure is only logged; there is nowhere further to report it.
    pub async fn report_error(&self, sender: &str, content: impl Into<String>) {
        let content = content.into();
        if let Err(e) = self.send(Envelope::error(sender, content.clone()), END).await {
            tracing::error!("[{}] Failed to report error to End: {} ({})", sender, e, content);
            self.run.set_error(content);
        }
    }
}

/// A message-handling unit addressable by name.
#[async_trait]
pub trait Worker: Send + Sync {
    fn name(&self) -> &str;

    async fn on_message(
        &self,
        envelope: Envelope,
        ctx: &MessageContext,
    ) -> Result<Envelope, WorkflowError>;
}

/// Builds a worker instance on first use.
pub type WorkerFactory =
    Box<dyn Fn() -> Result<Arc<dyn Worker>, WorkflowError> + Send + Sync>;

/// Name-keyed registry plus delivery.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Register `factory` under `name`. Duplicate names are rejected.
    fn register(&self, name: &str, factory: WorkerFactory) -> Result<(), WorkflowError>;

    fn is_registered(&self, name: &str) -> bool;

    fn registered_names(&self) -> Vec<String>;

    /// Deliver `envelope` to the worker registered as `target`.
    async fn send(
        &self,
        envelope: Envelope,
        target: &str,
        run: &RunHandle,
    ) -> Result<Envelope, WorkflowError>;
}

struct Registration {
    factory: WorkerFactory,
    instance: OnceCell<Arc<dyn Worker>>,
}

/// In-process runtime.
pub struct LocalRuntime {
    this: Weak<LocalRuntime>,
    workers: RwLock<HashMap<String, Arc<Registration>>>,
}

impl LocalRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            workers: RwLock::new(HashMap::new()),
        })
    }

    fn registration(&self, name: &str) -> Option<Arc<Registration>> {
        self.workers.read().ok()?.get(name).cloned()
    }
}

#[async_trait]
impl AgentRuntime for LocalRuntime {
    fn register(&self, name: &str, factory: WorkerFactory) -> Result<(), WorkflowError> {
        let mut workers = self.workers.write().map_err(|_| WorkflowError::Registration {
            agent: name.to_string(),
            message: "registry lock poisoned".to_string(),
        })?;
        if workers.contains_key(name) {
            return Err(WorkflowError::Registration {
                agent: name.to_string(),
                message: format!("a worker named '{}' is already registered", name),
            });
        }
        workers.insert(
            name.to_string(),
            Arc::new(Registration {
                factory,
                instance: OnceCell::new(),
            }),
        );
        tracing::debug!("[Runtime] Registered worker {}", name);
        Ok(())
    }

    fn is_registered(&self, name: &str) -> bool {
        self.workers
            .read()
            .map(|w| w.contains_key(name))
            .unwrap_or(false)
    }

    fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .workers
            .read()
            .map(|w| w.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    async fn send(
        &self,
        envelope: Envelope,
        target: &str,
        run: &RunHandle,
    ) -> Result<Envelope, WorkflowError> {
        let registration = self.registration(target).ok_or_else(|| WorkflowError::Routing {
            target: target.to_string(),
        })?;
        let runtime: Arc<dyn AgentRuntime> = self.this.upgrade().ok_or_else(|| {
            WorkflowError::Routing {
                target: target.to_string(),
            }
        })?;

        let worker = registration
            .instance
            .get_or_try_init(|| async { (registration.factory)() })
            .await?
            .clone();

        tracing::debug!("[Runtime] {} -> {}", envelope.sender, target);
        let ctx = MessageContext {
            runtime,
            run: run.clone(),
        };
        worker.on_message(envelope, &ctx).await
    }
}
