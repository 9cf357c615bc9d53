//! Core error type for Agentry.
//!
//! `WorkflowError` is used throughout the core domain (validation, synthesis,
//! routing, worker execution). Every fatal error ends up as the text of a
//! failed run outcome, so the `Display` output is what the operator sees.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    /// Unparsable or structurally invalid workflow document.
    #[error("Document error: {0}")]
    Document(String),

    /// Missing required fields, dangling `output_to` references, etc.
    #[error("Workflow validation errors:\n{}", .0.join("\n"))]
    Validation(Vec<String>),

    /// Generated source matched the denylist.
    #[error("Security validation failed for agent '{agent}': {}", .issues.join("; "))]
    SafetyViolation { agent: String, issues: Vec<String> },

    /// Generated source does not parse or breaks the module contract.
    #[error("Syntax error in generated code for agent '{agent}': {message}")]
    Syntax { agent: String, message: String },

    /// A persisted module could not be (re)loaded.
    #[error("Error loading module for agent '{agent}': {message}")]
    Load { agent: String, message: String },

    #[error("{agent}: Failed to register -> {message}")]
    Registration { agent: String, message: String },

    /// Run-level synthesis failure (nothing registered, head unusable).
    #[error("{0}")]
    Synthesis(String),

    /// Dispatch to a worker that is not registered.
    #[error("Routing error: no worker registered under '{target}'")]
    Routing { target: String },

    #[error("Agent '{agent}' timed out after {secs}s")]
    ExecutionTimeout { agent: String, secs: u64 },

    #[error("Agent '{agent}' failed: {message}")]
    Execution { agent: String, message: String },

    /// The whole run exceeded its ceiling.
    #[error("Workflow timed out after {secs}s")]
    OverallTimeout { secs: u64 },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl WorkflowError {
    /// Whether this error aborts the whole run.
    ///
    /// Registration errors drop a single worker, and execution timeouts or
    /// failures are replaced by a diagnostic payload inside the worker.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            WorkflowError::Registration { .. }
                | WorkflowError::ExecutionTimeout { .. }
                | WorkflowError::Execution { .. }
        )
    }
}

impl From<std::io::Error> for WorkflowError {
    fn from(e: std::io::Error) -> Self {
        WorkflowError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_joins_all_errors() {
        let err = WorkflowError::Validation(vec![
            "Agent a references non-existent agent: ghost".to_string(),
            "Agent 1 (b): Missing required field: description".to_string(),
        ]);
        let text = err.to_string();
        assert!(text.starts_with("Workflow validation errors:"));
        assert!(text.contains("ghost"));
        assert!(text.contains("Missing required field: description"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(WorkflowError::Document("x".into()).is_fatal());
        assert!(WorkflowError::Routing { target: "B".into() }.is_fatal());
        assert!(!WorkflowError::Registration {
            agent: "a".into(),
            message: "dup".into()
        }
        .is_fatal());
        assert!(!WorkflowError::ExecutionTimeout {
            agent: "a".into(),
            secs: 3
        }
        .is_fatal());
    }
}
