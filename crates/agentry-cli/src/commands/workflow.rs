//! `agentry run` / `agentry validate` — run or check a workflow document.

use agentry_core::workflow::env::referenced_names;
use agentry_core::workflow::{chain_order, validate as validate_document, WorkflowDocument};
use agentry_core::Pipeline;

use super::{print_json, truncate, RunOptions};

/// Synthesize and run the workflow in `workflow_file`.
pub async fn run(workflow_file: &str, options: &RunOptions, json: bool) -> Result<(), String> {
    let config = options.to_config();
    if config.backend.api_key.is_empty() {
        tracing::warn!("[Cli] No API key configured (set AGENTRY_API_KEY or GOOGLE_API_KEY)");
    }

    if !json {
        println!("📄 Workflow : {}", workflow_file);
        println!("   Model    : {} via {}", config.backend.model, config.backend.adapter);
        println!("   Timeout  : {}s", config.run_timeout_secs);
        println!();
    }

    let pipeline = Pipeline::http(config);
    let summary = pipeline
        .run_file(workflow_file)
        .await
        .map_err(|e| e.to_string())?;

    if json {
        let report = summary.synthesis.as_ref().map(|r| {
            serde_json::json!({
                "generated": r.generated,
                "reused": r.reused,
                "registered": r.registered,
                "registrationErrors": r.registration_errors,
            })
        });
        print_json(&serde_json::json!({
            "runId": summary.run_id.to_string(),
            "success": summary.success,
            "text": summary.text,
            "synthesis": report,
        }));
        return if summary.success {
            Ok(())
        } else {
            Err("Workflow failed".to_string())
        };
    }

    if let Some(report) = &summary.synthesis {
        println!(
            "   Generated: {} | Reused: {} | Registered: {}",
            report.generated.len(),
            report.reused.len(),
            report.registered.len()
        );
        for error in &report.registration_errors {
            println!("   ⚠️  {}", error);
        }
    }

    if summary.success {
        println!("\n🎉 Workflow completed successfully!\n");
        println!("{}", summary.text);
        Ok(())
    } else {
        Err(format!("Workflow failed: {}", summary.text))
    }
}

/// Parse and validate a workflow file without calling any backend.
pub fn validate(workflow_file: &str) -> Result<(), String> {
    let doc = WorkflowDocument::from_file(workflow_file).map_err(|e| e.to_string())?;
    validate_document(&doc).map_err(|e| e.to_string())?;

    let config = doc.config();
    println!("✅ Workflow '{}' is valid", workflow_file);
    println!("   Agents: {}", doc.agents.len());
    println!("   Input : {:?}", config.input_mode);

    for (i, agent) in chain_order(&doc).iter().enumerate() {
        let next = agent.next_hop().unwrap_or("End");
        let mut line = format!(
            "   {}. {} → {} ({})",
            i + 1,
            agent.agent_name,
            next,
            truncate(&agent.description, 48)
        );
        if agent.has_tools() {
            line.push_str(&format!(" [🔧{} tools]", agent.tools.len()));
        }
        println!("{}", line);
    }

    let unreachable: Vec<&str> = doc
        .agents
        .iter()
        .map(|a| a.agent_name.as_str())
        .filter(|name| !chain_order(&doc).iter().any(|a| a.agent_name == *name))
        .collect();
    if !unreachable.is_empty() {
        println!("   ⚠️  Not reachable from the head: {}", unreachable.join(", "));
    }

    let mut unset: Vec<String> = doc
        .agents
        .iter()
        .flat_map(|a| a.tools.iter())
        .flat_map(|t| t.params.env.values())
        .filter_map(|v| v.as_str())
        .flat_map(referenced_names)
        .filter(|name| std::env::var(name).is_err())
        .collect();
    unset.sort();
    unset.dedup();
    if !unset.is_empty() {
        println!("   ⚠️  Unset environment variables: {}", unset.join(", "));
    }
    Ok(())
}
