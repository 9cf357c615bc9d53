//! Agentry Core — declarative agent-chain synthesis.
//!
//! A YAML workflow document declares a chain of agents. The Creator turns
//! each declaration into a worker definition (generated through a language
//! model from a versioned template, screened, checked and persisted), loads
//! it, and registers a live worker under the agent's name. The launcher then
//! feeds a start message to the head of the chain and the completion sink
//! records the outcome on the run handle.
//!
//! ```no_run
//! use agentry_core::{AgentryConfig, Pipeline};
//!
//! # async fn demo() -> Result<(), agentry_core::WorkflowError> {
//! let pipeline = Pipeline::http(AgentryConfig::from_env());
//! let summary = pipeline.run_file("config/agents.yaml").await?;
//! println!("{}: {}", summary.success, summary.text);
//! # Ok(())
//! # }
//! ```
//!
//! This crate has no CLI or logging-subscriber dependency; it only emits
//! `tracing` events.

pub mod backend;
pub mod completion;
pub mod config;
pub mod error;
pub mod launcher;
pub mod pipeline;
pub mod run_state;
pub mod runtime;
pub mod synthesis;
pub mod tools;
pub mod worker;
pub mod workflow;

// Convenience re-exports
pub use backend::{HttpBackend, ModelBackend, ModelRequest};
pub use config::{AgentryConfig, BackendConfig};
pub use error::WorkflowError;
pub use launcher::{InputCollector, StdinCollector};
pub use pipeline::{Pipeline, RunSummary};
pub use run_state::{Completion, RunHandle};
pub use runtime::{AgentRuntime, Envelope, EnvelopeKind, LocalRuntime, MessageContext, Worker};
pub use synthesis::SynthesisReport;
pub use tools::{BoundTool, DescriptorBinder, ToolBinder};
pub use workflow::{AgentSpec, WorkflowDocument};
