//! Workflow validation — collects every problem in a document at once.
//!
//! Checks, in order:
//! 1. every agent carries `agent_name`, `description` and `behavior_prompt`
//! 2. agent names are unique
//! 3. every `output_to` names an agent declared in the same document
//! 4. the routing graph has no cycle
//!
//! A dangling reference is reported once per offending edge, and nothing is
//! generated or registered while any error remains.

use std::collections::{HashMap, HashSet};

use crate::error::WorkflowError;
use crate::workflow::schema::{AgentSpec, WorkflowDocument};

const REQUIRED_FIELDS: &[&str] = &["agent_name", "description", "behavior_prompt"];

/// Validate a parsed document, aggregating all errors into one
/// [`WorkflowError::Validation`].
pub fn validate(doc: &WorkflowDocument) -> Result<(), WorkflowError> {
    let errors = collect_errors(&doc.agents);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::Validation(errors))
    }
}

/// The list of human-readable validation errors (empty when valid).
pub fn collect_errors(agents: &[AgentSpec]) -> Vec<String> {
    let mut errors = Vec::new();

    for (i, agent) in agents.iter().enumerate() {
        let label = if agent.agent_name.trim().is_empty() {
            "unnamed"
        } else {
            agent.agent_name.as_str()
        };
        for field in REQUIRED_FIELDS {
            if field_value(agent, field).trim().is_empty() {
                errors.push(format!(
                    "Agent {} ({}): Missing required field: {}",
                    i, label, field
                ));
            }
        }
    }

    let mut seen = HashSet::new();
    for agent in agents {
        if agent.agent_name.is_empty() {
            continue;
        }
        if !seen.insert(agent.agent_name.as_str()) {
            errors.push(format!("Duplicate agent name: {}", agent.agent_name));
        }
    }

    for agent in agents {
        if let Some(target) = agent.next_hop() {
            if !seen.contains(target) {
                errors.push(format!(
                    "Agent {} references non-existent agent: {}",
                    agent.agent_name, target
                ));
            }
        }
    }

    if let Some(cycle) = find_cycle(agents) {
        errors.push(format!("Routing cycle detected: {}", cycle.join(" → ")));
    }

    errors
}

fn field_value<'a>(agent: &'a AgentSpec, field: &str) -> &'a str {
    match field {
        "agent_name" => &agent.agent_name,
        "description" => &agent.description,
        "behavior_prompt" => &agent.behavior_prompt,
        _ => "",
    }
}

/// Each agent has at most one outgoing edge, so a cycle is found by walking
/// from every node until the walk either leaves the graph or revisits a node.
fn find_cycle(agents: &[AgentSpec]) -> Option<Vec<String>> {
    let edges: HashMap<&str, &str> = agents
        .iter()
        .filter(|a| !a.agent_name.is_empty())
        .filter_map(|a| a.next_hop().map(|t| (a.agent_name.as_str(), t)))
        .collect();

    for start in agents.iter().map(|a| a.agent_name.as_str()) {
        let mut path: Vec<&str> = vec![start];
        let mut current = start;
        while let Some(&next) = edges.get(current) {
            if let Some(pos) = path.iter().position(|n| *n == next) {
                let mut cycle: Vec<String> = path[pos..].iter().map(|s| s.to_string()).collect();
                cycle.push(next.to_string());
                return Some(cycle);
            }
            path.push(next);
            current = next;
        }
    }
    None
}

/// Names of agents in chain order starting at the head, stopping at the
/// terminal agent. Used for the chain summary log.
pub fn chain_order(doc: &WorkflowDocument) -> Vec<&AgentSpec> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut current = doc.head();
    while let Some(agent) = current {
        if !visited.insert(agent.agent_name.as_str()) {
            break;
        }
        order.push(agent);
        current = agent.next_hop().and_then(|next| doc.agent(next));
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(agents: Vec<AgentSpec>) -> WorkflowDocument {
        WorkflowDocument {
            agents,
            workflow_config: None,
        }
    }

    #[test]
    fn test_valid_chain() {
        let d = doc(vec![
            AgentSpec::new("a", "first", "p").with_output_to("b"),
            AgentSpec::new("b", "second", "p"),
        ]);
        assert!(validate(&d).is_ok());
        let names: Vec<_> = chain_order(&d).iter().map(|a| a.agent_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_fields_all_reported() {
        let d = doc(vec![
            AgentSpec::new("a", "", "p"),
            AgentSpec::new("", "desc", ""),
        ]);
        let errors = collect_errors(&d.agents);
        assert!(errors.contains(&"Agent 0 (a): Missing required field: description".to_string()));
        assert!(errors.contains(&"Agent 1 (unnamed): Missing required field: agent_name".to_string()));
        assert!(errors
            .contains(&"Agent 1 (unnamed): Missing required field: behavior_prompt".to_string()));
    }

    #[test]
    fn test_dangling_reference_reported_once() {
        let d = doc(vec![AgentSpec::new("A", "x", "p").with_output_to("ghost")]);
        let errors = collect_errors(&d.agents);
        let dangling: Vec<_> = errors
            .iter()
            .filter(|e| e.contains("non-existent agent"))
            .collect();
        assert_eq!(dangling, vec!["Agent A references non-existent agent: ghost"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let d = doc(vec![AgentSpec::new("a", "x", "p"), AgentSpec::new("a", "y", "q")]);
        let err = validate(&d).unwrap_err();
        assert!(err.to_string().contains("Duplicate agent name: a"));
    }

    #[test]
    fn test_cycle_detected() {
        let d = doc(vec![
            AgentSpec::new("a", "x", "p").with_output_to("b"),
            AgentSpec::new("b", "y", "p").with_output_to("a"),
        ]);
        let errors = collect_errors(&d.agents);
        assert!(errors.iter().any(|e| e == "Routing cycle detected: a → b → a"));
        assert_eq!(chain_order(&d).len(), 2);
    }

    #[test]
    fn test_self_loop_detected() {
        let d = doc(vec![AgentSpec::new("solo", "x", "p").with_output_to("solo")]);
        let errors = collect_errors(&d.agents);
        assert!(errors.iter().any(|e| e.starts_with("Routing cycle detected")));
    }
}
