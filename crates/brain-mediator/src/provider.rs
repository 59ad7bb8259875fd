use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::prompt::SystemPrompt;
use crate::stream::StreamEvent;

/// A single message in the conversation history handed to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// Tool definition sent to the LLM API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// A tool call extracted from the LLM response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// Request handed to a provider adapter. `raw_messages` carries structured
/// content blocks (tool_use / tool_result) for the tool-calling loop; when
/// absent, `messages` is used as plain role/content turns.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub system_prompt: Option<SystemPrompt>,
    pub messages: Vec<Message>,
    pub raw_messages: Option<Vec<serde_json::Value>>,
    pub max_tokens: u32,
    pub tools: Vec<ToolDefinition>,
}

/// Non-streaming response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub stop_reason: String,
    pub tool_calls: Vec<ToolCall>,
}

/// Errors a provider adapter can report. `ToolsUnsupported` is the single
/// case the Mediator knows how to recover from on its own (retry once with
/// an empty tool list); every other variant is forwarded to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("model does not support tool calls")]
    ToolsUnsupported,

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("cancelled")]
    Cancelled,
}

/// Shared contract every LLM backend implements. `send_stream` has a default
/// implementation that falls back to `send` and emits a single `TextDelta`
/// followed by `Done` — adapters without a native streaming endpoint get
/// correct (if chunky) behavior for free.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Model names this adapter declares support for; the Mediator's
    /// selector matches `selected_model` against this list.
    fn models(&self) -> Vec<String>;

    /// Adapters under maintenance or missing credentials report `true` so
    /// the selector skips them without attempting a doomed request.
    fn is_offline(&self) -> bool {
        false
    }

    async fn send(&self, req: &ChatRequest) -> Result<ChatResponse, ProviderError>;

    async fn send_stream(
        &self,
        req: &ChatRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ProviderError> {
        let resp = self.send(req).await?;
        if !resp.content.is_empty() {
            let _ = tx
                .send(StreamEvent::TextDelta {
                    text: resp.content.clone(),
                })
                .await;
        }
        for call in &resp.tool_calls {
            let _ = tx
                .send(StreamEvent::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.input.clone(),
                })
                .await;
        }
        let _ = tx
            .send(StreamEvent::Done {
                model: resp.model,
                tokens_in: resp.tokens_in,
                tokens_out: resp.tokens_out,
                stop_reason: resp.stop_reason,
            })
            .await;
        Ok(())
    }
}
