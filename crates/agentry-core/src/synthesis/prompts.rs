//! Fixed prompt text used by the Creator and the Completion Sink.

/// System prompt for the generator backend.
pub const CREATOR_SYSTEM_PROMPT: &str = "\
You are an agent that creates new AI agents from a provided template.
You receive a template: a YAML worker definition interpreted by a fixed executor.
You must use the EXACT template provided and ONLY fill in the parts that need to be customized.

CRITICAL REQUIREMENTS:
1. `kind` must stay exactly as it is in the template
2. `constructor` must stay EXACTLY [name, behavior_prompt, spec]
3. `handler` must stay `on_message`
4. Do NOT write your own behavior prompt. The one supplied by the user is bound at construction
5. Keep `template_version` exactly as it is in the template
6. Follow the template structure EXACTLY: only replace placeholders

Respond ONLY with the YAML document.
Do NOT include any extra markers, TERMINATE statements, explanations, or Markdown fences.";

/// Instruction block that precedes the template in a generation request.
///
/// The description and behavior prompt are embedded verbatim.
pub fn creator_prompt(description: &str, behavior_prompt: &str) -> String {
    format!(
        "Please generate a new worker definition based on this template. \
The `kind` must stay the same and the constructor must keep the EXACT shape: \
[name, behavior_prompt, spec]\n\n\
IMPORTANT: The behavior prompt below is bound to the worker at construction. \
Do NOT generate your own.\n\n\
The agent should reflect the following description:\n\
{description}\n\n\
Here is the REQUIRED behavior prompt (use verbatim, do not paraphrase):\n\
{behavior_prompt}\n\n\
Respond only with the YAML document, no explanations or markdown fences.\n\n\
Here is the template:\n\n"
    )
}

/// System prompt for the optional end-of-run summary.
pub const END_SYSTEM_PROMPT: &str = "\
You are the agent at the endpoint of the system's workflow.
You will receive either a normal result or an error message with an explicit reason from the workflow execution.
Your job is to interpret the input and output a concise natural language message to the user.
Reply in the format: success: {result}, where {result} is your clear, plain-language summary of the outcome.
Do not include any markdown, code fences, or extra formatting. Just plain text as described.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creator_prompt_embeds_inputs_verbatim() {
        let prompt = creator_prompt("Adds numbers", "You are a calculator.\nBe exact.");
        assert!(prompt.contains("Adds numbers"));
        assert!(prompt.contains("You are a calculator.\nBe exact."));
        assert!(prompt.contains("use verbatim, do not paraphrase"));
        assert!(prompt.ends_with("Here is the template:\n\n"));
    }
}
