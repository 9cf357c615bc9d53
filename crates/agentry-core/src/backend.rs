//! Language-model backend — single-turn generation over HTTP.
//!
//! Workers, the Creator and the optional end-of-run summarizer all talk to
//! the model through [`ModelBackend`]. [`HttpBackend`] calls the model API
//! directly:
//!
//! - `anthropic`: `POST {base_url}/v1/messages` with `x-api-key`
//! - `openai`: `POST {base_url}/chat/completions` with a bearer token; also
//!   serves OpenAI-compatible endpoints such as Gemini's

use async_trait::async_trait;

use crate::config::BackendConfig;
use crate::error::WorkflowError;
use crate::tools::BoundTool;

/// A single-turn exchange.
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub prompt: String,
    pub tools: Vec<BoundTool>,
}

impl ModelRequest {
    pub fn new(system_prompt: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            prompt: prompt.into(),
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<BoundTool>) -> Self {
        self.tools = tools;
        self
    }

    /// System prompt with the bound tools described after it.
    pub fn effective_system_prompt(&self) -> String {
        if self.tools.is_empty() {
            return self.system_prompt.clone();
        }
        let listing: Vec<String> = self
            .tools
            .iter()
            .map(|t| format!("- {}", t.summary()))
            .collect();
        format!(
            "{}\n\nAvailable tools:\n{}",
            self.system_prompt,
            listing.join("\n")
        )
    }
}

#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn generate(&self, request: ModelRequest) -> Result<String, WorkflowError>;
}

/// Calls the model API over HTTP.
pub struct HttpBackend {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    async fn post(
        &self,
        request: reqwest::RequestBuilder,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, WorkflowError> {
        let response = request
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| WorkflowError::Backend(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| WorkflowError::Backend(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(WorkflowError::Backend(format!(
                "API returned {}: {}",
                status, text
            )));
        }

        serde_json::from_str(&text)
            .map_err(|e| WorkflowError::Backend(format!("Failed to parse response JSON: {}", e)))
    }

    async fn call_anthropic(&self, request: &ModelRequest) -> Result<String, WorkflowError> {
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));

        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": 8192,
            "messages": [{ "role": "user", "content": request.prompt }]
        });
        let system = request.effective_system_prompt();
        if !system.is_empty() {
            body["system"] = serde_json::Value::String(system);
        }

        tracing::debug!("[Backend] Calling Anthropic API: {} (model: {})", url, self.config.model);

        let json = self
            .post(
                self.client
                    .post(&url)
                    .header("x-api-key", &self.config.api_key)
                    .header("anthropic-version", "2023-06-01"),
                &body,
            )
            .await?;
        Ok(extract_anthropic_text(&json))
    }

    async fn call_openai(&self, request: &ModelRequest) -> Result<String, WorkflowError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let mut messages = vec![];
        let system = request.effective_system_prompt();
        if !system.is_empty() {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": request.prompt }));

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": messages
        });

        tracing::debug!("[Backend] Calling chat completions: {} (model: {})", url, self.config.model);

        let json = self
            .post(
                self.client
                    .post(&url)
                    .header("Authorization", format!("Bearer {}", self.config.api_key)),
                &body,
            )
            .await?;
        Ok(extract_openai_text(&json))
    }
}

#[async_trait]
impl ModelBackend for HttpBackend {
    async fn generate(&self, request: ModelRequest) -> Result<String, WorkflowError> {
        match self.config.adapter.as_str() {
            "anthropic" | "claude" => self.call_anthropic(&request).await,
            "openai" | "gemini" => self.call_openai(&request).await,
            other => Err(WorkflowError::Backend(format!(
                "Unknown adapter type: '{}'",
                other
            ))),
        }
    }
}

fn extract_anthropic_text(json: &serde_json::Value) -> String {
    json.get("content")
        .and_then(|c| c.as_array())
        .and_then(|blocks| {
            blocks
                .iter()
                .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
                .filter_map(|b| b.get("text").and_then(|t| t.as_str()).map(str::to_string))
                .reduce(|a, b| format!("{}\n{}", a, b))
        })
        .unwrap_or_default()
}

fn extract_openai_text(json: &serde_json::Value) -> String {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_anthropic_text_joins_text_blocks() {
        let json = serde_json::json!({
            "content": [
                { "type": "text", "text": "first" },
                { "type": "tool_use", "id": "x" },
                { "type": "text", "text": "second" }
            ]
        });
        assert_eq!(extract_anthropic_text(&json), "first\nsecond");
    }

    #[test]
    fn test_extract_openai_text() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "8" } }]
        });
        assert_eq!(extract_openai_text(&json), "8");
        assert_eq!(extract_openai_text(&serde_json::json!({})), "");
    }

    #[test]
    fn test_effective_system_prompt_lists_tools() {
        let tool = BoundTool {
            name: "fetch".to_string(),
            command: Some("uvx".to_string()),
            args: vec![],
            env: Default::default(),
            extra: Default::default(),
        };
        let request = ModelRequest::new("Be brief.", "hi").with_tools(vec![tool]);
        assert_eq!(
            request.effective_system_prompt(),
            "Be brief.\n\nAvailable tools:\n- fetch (uvx)"
        );
        assert_eq!(ModelRequest::new("Be brief.", "hi").effective_system_prompt(), "Be brief.");
    }

    #[tokio::test]
    async fn test_unknown_adapter_rejected() {
        let backend = HttpBackend::new(BackendConfig {
            adapter: "carrier-pigeon".to_string(),
            ..BackendConfig::default()
        });
        let err = backend.generate(ModelRequest::new("", "hi")).await.unwrap_err();
        assert_eq!(
            err,
            WorkflowError::Backend("Unknown adapter type: 'carrier-pigeon'".to_string())
        );
    }
}
