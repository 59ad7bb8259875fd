use async_trait::async_trait;
use brain_core::types::UserContext;
use serde::{Deserialize, Serialize};

/// Result of executing a tool — becomes a tool-role message body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self { content: content.into(), is_error: false }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { content: message.into(), is_error: true }
    }
}

/// A callable capability the Brain Core can offer the model.
///
/// `execute` receives `ctx` from the enclosing session, never from its own
/// `input` — tools must not read `user_id` out of arguments, since that
/// would let a percept spoof another user.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> serde_json::Value;
    async fn execute(&self, ctx: &UserContext, input: serde_json::Value) -> ToolResult;
}
