//! Synthesis — from agent specs to registered workers.
//!
//! ```text
//! AgentSpec ──► template::render ──► ModelBackend ──► screener::strip_markers
//!                                                         │
//!                         screener::screen ◄──────────────┘
//!                               │
//!                  module::GeneratedModule::parse ──► persist ──► ModuleLoader
//!                                                                   │
//!                                                    AgentRuntime::register
//! ```

pub mod creator;
pub mod module;
pub mod prompts;
pub mod screener;
pub mod template;

pub use creator::{Creator, SynthesisReport};
pub use module::{GeneratedModule, ModuleKind, ModuleLoader};
pub use screener::{screen, strip_markers};
pub use template::{render, stamp_version, Template, TemplateKind, TemplateStore};
