//! Completion Sink ("End") — records the run's outcome.

use std::sync::Arc;

use async_trait::async_trait;

use crate::backend::{ModelBackend, ModelRequest};
use crate::error::WorkflowError;
use crate::runtime::{Envelope, EnvelopeKind, MessageContext, Worker, END};
use crate::synthesis::prompts::END_SYSTEM_PROMPT;

/// Terminal worker. Emits no further message.
pub struct CompletionSink {
    summarizer: Option<Arc<dyn ModelBackend>>,
}

impl CompletionSink {
    pub fn new() -> Self {
        Self { summarizer: None }
    }

    /// Pass successful results once through `backend` before recording them.
    pub fn with_summarizer(backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            summarizer: Some(backend),
        }
    }

    async fn summarize(&self, result: String) -> String {
        let Some(backend) = &self.summarizer else {
            return result;
        };
        match backend
            .generate(ModelRequest::new(END_SYSTEM_PROMPT, result.clone()))
            .await
        {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => result,
            Err(e) => {
                tracing::warn!("[End] Summarizer failed, recording raw result: {}", e);
                result
            }
        }
    }
}

impl Default for CompletionSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Worker for CompletionSink {
    fn name(&self) -> &str {
        END
    }

    async fn on_message(
        &self,
        envelope: Envelope,
        ctx: &MessageContext,
    ) -> Result<Envelope, WorkflowError> {
        tracing::info!("[End] Received {:?} from {}", envelope.kind, envelope.sender);

        match envelope.kind {
            EnvelopeKind::Message => {
                let result = self.summarize(envelope.content).await;
                tracing::info!("[End] Workflow completed with result: {}", result);
                ctx.run.set_result(result);
            }
            EnvelopeKind::Error | EnvelopeKind::Diagnostic => {
                tracing::error!("[End] Workflow failed: {}", envelope.content);
                ctx.run.set_error(envelope.content);
            }
        }
        Ok(Envelope::ack(END))
    }
}
