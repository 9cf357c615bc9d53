//! Worker templates and the generation-prompt renderer.
//!
//! Two templates exist: a plain worker and a tool-enabled worker. Both are
//! compiled into the binary and can be overridden by placing `worker.yaml` /
//! `worker_with_tools.yaml` in a template directory.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::WorkflowError;
use crate::synthesis::prompts;
use crate::workflow::schema::AgentSpec;

const BUILTIN_WORKER: &str = include_str!("../../templates/worker.yaml");
const BUILTIN_WORKER_WITH_TOOLS: &str = include_str!("../../templates/worker_with_tools.yaml");

/// Which template a spec selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Worker,
    WorkerWithTools,
}

impl TemplateKind {
    /// Tool-enabled when the agent spec declares at least one tool.
    pub fn for_spec(spec: &AgentSpec) -> Self {
        if spec.has_tools() {
            TemplateKind::WorkerWithTools
        } else {
            TemplateKind::Worker
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateKind::Worker => "worker.yaml",
            TemplateKind::WorkerWithTools => "worker_with_tools.yaml",
        }
    }

    fn builtin(&self) -> &'static str {
        match self {
            TemplateKind::Worker => BUILTIN_WORKER,
            TemplateKind::WorkerWithTools => BUILTIN_WORKER_WITH_TOOLS,
        }
    }
}

/// A loaded template with its version tag.
#[derive(Debug, Clone)]
pub struct Template {
    pub kind: TemplateKind,
    pub source: String,
    pub version: Option<String>,
}

impl Template {
    pub fn new(kind: TemplateKind, source: impl Into<String>) -> Self {
        let source = source.into();
        let version = extract_version(&source);
        Self {
            kind,
            source,
            version,
        }
    }
}

/// Resolves templates, preferring an override directory when configured.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    dir: Option<PathBuf>,
}

impl TemplateStore {
    pub fn builtin() -> Self {
        Self { dir: None }
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Load the template of the given kind.
    ///
    /// A missing override file falls back to the built-in copy; an override
    /// file that exists but cannot be read is an error.
    pub fn load(&self, kind: TemplateKind) -> Result<Template, WorkflowError> {
        if let Some(dir) = &self.dir {
            let path = dir.join(kind.file_name());
            if path.exists() {
                let source = std::fs::read_to_string(&path).map_err(|e| {
                    WorkflowError::Io(format!(
                        "Failed to read template {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                return Ok(Template::new(kind, source));
            }
            tracing::debug!(
                "[Template] {} not found in {}, using built-in",
                kind.file_name(),
                dir.display()
            );
        }
        Ok(Template::new(kind, kind.builtin()))
    }
}

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)template_version\s*[:=]\s*"([^"]+)""#).expect("version pattern is valid")
    })
}

/// Extract the embedded version tag (`template_version: "x"`).
pub fn extract_version(source: &str) -> Option<String> {
    version_regex()
        .captures(source)
        .map(|caps| caps[1].to_string())
}

/// Make `source` carry `version` as its tag.
///
/// An existing tag is rewritten in place; a missing one is added at the top
/// of the document (after a leading `---` marker, if any). Persisted
/// definitions must carry the template's tag for the regeneration gate to
/// reuse them.
pub fn stamp_version(source: &str, version: &str) -> String {
    let tag = format!("template_version: \"{}\"", version);
    if version_regex().is_match(source) {
        return version_regex()
            .replacen(source, 1, regex::NoExpand(&tag))
            .into_owned();
    }
    match source.strip_prefix("---\n") {
        Some(body) => format!("---\n{}\n{}", tag, body),
        None => format!("{}\n{}", tag, source),
    }
}

/// Regeneration gate.
///
/// Reuse only when an existing file carries the same tag as the template; a
/// missing tag on either side forces regeneration.
pub fn should_regenerate(existing_path: &Path, template: &Template) -> bool {
    let existing = match std::fs::read_to_string(existing_path) {
        Ok(text) => text,
        Err(_) => return true,
    };

    let Some(current) = template.version.as_deref() else {
        tracing::warn!(
            "[Template] {} is missing template_version, forcing regeneration",
            template.kind.file_name()
        );
        return true;
    };

    match extract_version(&existing) {
        None => {
            tracing::info!(
                "[Template] Existing file {} missing template_version, regenerating",
                existing_path.display()
            );
            true
        }
        Some(found) if found != current => {
            tracing::info!(
                "[Template] Template version mismatch: {} -> {}, regenerating",
                found,
                current
            );
            true
        }
        Some(_) => false,
    }
}

/// Compose the generation prompt: instruction block, description, verbatim
/// behavior prompt, then the literal template source.
pub fn render(description: &str, behavior_prompt: &str, template_text: &str) -> String {
    let mut prompt = prompts::creator_prompt(description, behavior_prompt);
    prompt.push_str(template_text);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_templates_carry_versions() {
        let store = TemplateStore::builtin();
        let plain = store.load(TemplateKind::Worker).unwrap();
        let tools = store.load(TemplateKind::WorkerWithTools).unwrap();
        assert_eq!(plain.version.as_deref(), Some("1.0.0"));
        assert_eq!(tools.version.as_deref(), Some("1.0.3"));
    }

    #[test]
    fn test_extract_version_forms() {
        assert_eq!(extract_version("template_version: \"2.1\"").as_deref(), Some("2.1"));
        assert_eq!(extract_version("TEMPLATE_VERSION = \"1.0.0\"").as_deref(), Some("1.0.0"));
        assert_eq!(extract_version("kind: worker"), None);
    }

    #[test]
    fn test_template_kind_follows_tools() {
        use crate::workflow::schema::{ToolBinding, ToolParams};
        let plain = AgentSpec::new("a", "d", "p");
        assert_eq!(TemplateKind::for_spec(&plain), TemplateKind::Worker);
        let tooled = plain.with_tool(ToolBinding::new("fetch", ToolParams::default()));
        assert_eq!(TemplateKind::for_spec(&tooled), TemplateKind::WorkerWithTools);
    }

    #[test]
    fn test_render_appends_template_last() {
        let prompt = render("Adds numbers", "You add.", "template_version: \"1\"\n");
        assert!(prompt.contains("Adds numbers"));
        assert!(prompt.contains("You add."));
        assert!(prompt.ends_with("template_version: \"1\"\n"));
    }

    #[test]
    fn test_stamp_version_adds_or_rewrites_tag() {
        let added = stamp_version("kind: worker\n", "1.0.0");
        assert_eq!(added, "template_version: \"1.0.0\"\nkind: worker\n");

        let rewritten = stamp_version("template_version: \"0.1\"\nkind: worker\n", "1.0.0");
        assert_eq!(rewritten, "template_version: \"1.0.0\"\nkind: worker\n");

        let marked = stamp_version("---\nkind: worker\n", "2.0");
        assert_eq!(marked, "---\ntemplate_version: \"2.0\"\nkind: worker\n");
        assert_eq!(extract_version(&marked).as_deref(), Some("2.0"));
    }

    #[test]
    fn test_should_regenerate_gate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calc.yaml");
        let template = Template::new(TemplateKind::Worker, "template_version: \"1.0.0\"\n");

        assert!(should_regenerate(&path, &template), "missing file");

        std::fs::write(&path, "template_version: \"1.0.0\"\nkind: worker\n").unwrap();
        assert!(!should_regenerate(&path, &template), "matching tag");

        std::fs::write(&path, "template_version: \"0.9.0\"\n").unwrap();
        assert!(should_regenerate(&path, &template), "older tag");

        std::fs::write(&path, "kind: worker\n").unwrap();
        assert!(should_regenerate(&path, &template), "untagged file");

        std::fs::write(&path, "template_version: \"1.0.0\"\n").unwrap();
        let untagged = Template::new(TemplateKind::Worker, "kind: worker\n");
        assert!(should_regenerate(&path, &untagged), "untagged template");
    }

    #[test]
    fn test_override_dir_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("worker.yaml"), "template_version: \"9.9.9\"\n").unwrap();
        let store = TemplateStore::with_dir(dir.path());
        assert_eq!(
            store.load(TemplateKind::Worker).unwrap().version.as_deref(),
            Some("9.9.9")
        );
        assert_eq!(
            store.load(TemplateKind::WorkerWithTools).unwrap().version.as_deref(),
            Some("1.0.3")
        );
    }
}
