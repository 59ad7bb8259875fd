use async_trait::async_trait;
use brain_core::types::UserContext;
use chrono::Utc;
use chrono_tz::Tz;

use crate::tool::{Tool, ToolResult};

/// Reports the current time in a given IANA timezone.
pub struct GetTimeTool;

#[async_trait]
impl Tool for GetTimeTool {
    fn name(&self) -> &str {
        "get_time"
    }

    fn description(&self) -> &str {
        "Get the current time in a given IANA timezone (e.g. \"Asia/Tokyo\")."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "tz": {
                    "type": "string",
                    "description": "IANA timezone name, e.g. Asia/Tokyo"
                }
            },
            "required": ["tz"]
        })
    }

    async fn execute(&self, _ctx: &UserContext, input: serde_json::Value) -> ToolResult {
        let tz_name = match input.get("tz").and_then(|v| v.as_str()) {
            Some(t) => t,
            None => return ToolResult::error("missing required parameter: tz"),
        };

        let tz: Tz = match tz_name.parse() {
            Ok(tz) => tz,
            Err(_) => return ToolResult::error(format!("unknown timezone: {tz_name}")),
        };

        let now = Utc::now().with_timezone(&tz);
        ToolResult::success(now.format("%H:%M %Z").to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> UserContext {
        UserContext {
            user_id: brain_core::types::UserId::from("u1"),
            username: "tester".to_string(),
            email: "t@example.com".to_string(),
            now: Utc::now(),
        }
    }

    #[tokio::test]
    async fn rejects_unknown_timezone() {
        let result = GetTimeTool
            .execute(&ctx(), serde_json::json!({ "tz": "Nowhere/City" }))
            .await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn formats_known_timezone() {
        let result = GetTimeTool.execute(&ctx(), serde_json::json!({ "tz": "Asia/Tokyo" })).await;
        assert!(!result.is_error);
        assert!(result.content.contains("JST"));
    }
}
