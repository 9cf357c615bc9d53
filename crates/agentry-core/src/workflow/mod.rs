//! Workflow documents — the YAML that declares an agent chain.
//!
//! ```text
//! agents.yaml ──► WorkflowDocument ──► validate() ──► Creator
//!                      │
//!                 tools[].params.env ──► env::resolve_env_map (at bind time)
//! ```

pub mod env;
pub mod schema;
pub mod validator;

pub use schema::{AgentSpec, InputMode, ToolBinding, ToolParams, WorkflowConfig, WorkflowDocument};
pub use validator::{chain_order, collect_errors, validate};
