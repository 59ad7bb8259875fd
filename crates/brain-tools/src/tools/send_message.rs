use std::sync::Arc;

use async_trait::async_trait;
use brain_core::types::UserContext;
use brain_devices::DeviceRegistry;
use brain_protocol::Frame;

use crate::tool::{Tool, ToolResult};

/// Pushes a text message straight to the caller's own devices, bypassing the
/// normal Mediator/Output Pipeline path — useful for a tool that wants to
/// notify the user out-of-band (e.g. a long job finishing).
pub struct SendMessageTool {
    devices: Arc<DeviceRegistry>,
}

impl SendMessageTool {
    pub fn new(devices: Arc<DeviceRegistry>) -> Self {
        Self { devices }
    }
}

#[async_trait]
impl Tool for SendMessageTool {
    fn name(&self) -> &str {
        "send_message"
    }

    fn description(&self) -> &str {
        "Send a text message directly to the user's connected devices."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Message text to send."
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, ctx: &UserContext, input: serde_json::Value) -> ToolResult {
        let text = match input.get("text").and_then(|v| v.as_str()) {
            Some(t) => t,
            None => return ToolResult::error("missing required parameter: text"),
        };

        let frame = Frame::text_final(ctx.user_id.as_str(), text);
        let report = self.devices.broadcast(&ctx.user_id, &frame).await;

        if report.delivered.is_empty() && report.failed.is_empty() {
            return ToolResult::error("no connected devices to send to");
        }

        ToolResult::success(format!("delivered to {} device(s)", report.delivered.len()))
    }
}
