use std::sync::Arc;

use brain_core::types::UserContext;
use brain_mediator::ToolCall;
use futures_util::stream::FuturesOrdered;
use futures_util::StreamExt;
use tokio::sync::Semaphore;

use crate::registry::ToolRegistry;
use crate::tool::ToolResult;
use crate::validate::validate_arguments;

/// Upper bound on concurrent tool executions within a single fan-out, per
/// the Tool Registry & Executor design (default is the call count, capped
/// here).
pub const MAX_PARALLEL_TOOLS: usize = 16;

pub struct Executor;

impl Executor {
    /// Resolve, validate, and run a single tool call. Never panics on a
    /// missing tool or bad arguments — both become an error [`ToolResult`]
    /// so the decide loop can keep going.
    pub async fn execute_one(ctx: &UserContext, registry: &ToolRegistry, call: &ToolCall) -> ToolResult {
        let Some(tool) = registry.get(&call.name) else {
            return ToolResult::error(format!("unknown tool: {}", call.name));
        };

        if let Err(e) = validate_arguments(&call.name, &tool.input_schema(), &call.input) {
            return ToolResult::error(e.to_string());
        }

        tool.execute(ctx, call.input.clone()).await
    }

    /// Run every call in `calls` with bounded parallelism, returning results
    /// in call order regardless of completion order. One failing tool never
    /// cancels its siblings — each call always contributes exactly one
    /// [`ToolResult`].
    pub async fn execute_batch(
        ctx: &UserContext,
        registry: &ToolRegistry,
        calls: &[ToolCall],
    ) -> Vec<ToolResult> {
        if calls.is_empty() {
            return Vec::new();
        }

        let permits = calls.len().min(MAX_PARALLEL_TOOLS);
        let semaphore = Arc::new(Semaphore::new(permits));
        let mut ordered = FuturesOrdered::new();

        for call in calls {
            let sem = semaphore.clone();
            let call = call.clone();
            ordered.push_back(async move {
                let _permit = sem.acquire_owned().await.expect("tool semaphore never closes");
                Executor::execute_one(ctx, registry, &call).await
            });
        }

        ordered.collect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::Tool;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::time::Duration;

    struct SlowTool(&'static str, u64);

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "test tool"
        }
        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({ "type": "object", "properties": {} })
        }
        async fn execute(&self, _ctx: &UserContext, _input: serde_json::Value) -> ToolResult {
            tokio::time::sleep(Duration::from_millis(self.1)).await;
            ToolResult::success(self.0)
        }
    }

    fn ctx() -> UserContext {
        UserContext {
            user_id: brain_core::types::UserId::from("u1"),
            username: "tester".to_string(),
            email: "t@example.com".to_string(),
            now: Utc::now(),
        }
    }

    #[tokio::test]
    async fn results_preserve_call_order_not_completion_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(SlowTool("slow", 50))).unwrap();
        registry.register(Box::new(SlowTool("fast", 1))).unwrap();

        let calls = vec![
            ToolCall { id: "1".to_string(), name: "slow".to_string(), input: serde_json::json!({}) },
            ToolCall { id: "2".to_string(), name: "fast".to_string(), input: serde_json::json!({}) },
        ];

        let results = Executor::execute_batch(&ctx(), &registry, &calls).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "slow");
        assert_eq!(results[1].content, "fast");
    }

    #[tokio::test]
    async fn unknown_tool_does_not_cancel_siblings() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(SlowTool("known", 1))).unwrap();

        let calls = vec![
            ToolCall { id: "1".to_string(), name: "missing".to_string(), input: serde_json::json!({}) },
            ToolCall { id: "2".to_string(), name: "known".to_string(), input: serde_json::json!({}) },
        ];

        let results = Executor::execute_batch(&ctx(), &registry, &calls).await;
        assert!(results[0].is_error);
        assert!(!results[1].is_error);
    }
}
