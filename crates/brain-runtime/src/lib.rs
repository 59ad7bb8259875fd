//! `brain-runtime` — the Brain Core: ties the Mediator, Tool Registry &
//! Executor, Output Pipeline, and Conversation Repository together into the
//! decide loop.

pub mod core;
pub mod error;
pub mod session;

pub use core::BrainCore;
pub use error::RuntimeError;
pub use session::SessionStore;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use brain_core::types::{JobType, Role, Task, TaskStatus, UserContext, UserId};
    use brain_devices::registry::DeviceRegistry;
    use brain_mediator::{ChatRequest, ChatResponse, LlmProvider, Mediator, ProviderError, StreamEvent};
    use brain_memory::ConversationRepository;
    use brain_pipeline::{NullTtsEngine, Pipeline};
    use brain_tools::{Tool, ToolRegistry, ToolResult};
    use chrono::Utc;
    use rusqlite::Connection;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    fn user_ctx() -> UserContext {
        UserContext {
            user_id: UserId::from("u1"),
            username: "tester".to_string(),
            email: "tester@example.com".to_string(),
            now: Utc::now(),
        }
    }

    fn repository() -> Arc<ConversationRepository> {
        let conn = Connection::open_in_memory().expect("open in-memory sqlite db");
        Arc::new(ConversationRepository::new(conn, 1440).expect("init conversation repository"))
    }

    fn pipeline() -> Arc<Pipeline> {
        Arc::new(Pipeline::new(Arc::new(DeviceRegistry::new()), Arc::new(NullTtsEngine)))
    }

    /// Always answers with plain text, no tool calls.
    struct PlainTextProvider {
        model: String,
        reply: &'static str,
    }

    #[async_trait]
    impl LlmProvider for PlainTextProvider {
        fn name(&self) -> &str {
            "plain"
        }
        fn models(&self) -> Vec<String> {
            vec![self.model.clone()]
        }
        async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            unreachable!("tests drive send_stream only")
        }
        async fn send_stream(&self, _req: &ChatRequest, tx: mpsc::Sender<StreamEvent>) -> Result<(), ProviderError> {
            let _ = tx.send(StreamEvent::TextDelta { text: self.reply.to_string() }).await;
            let _ = tx
                .send(StreamEvent::Done { model: self.model.clone(), tokens_in: 1, tokens_out: 1, stop_reason: "end_turn".to_string() })
                .await;
            Ok(())
        }
    }

    /// First call asks for a tool; every call after that answers with text.
    struct RoundScriptedProvider {
        model: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for RoundScriptedProvider {
        fn name(&self) -> &str {
            "round-scripted"
        }
        fn models(&self) -> Vec<String> {
            vec![self.model.clone()]
        }
        async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            unreachable!("tests drive send_stream only")
        }
        async fn send_stream(&self, _req: &ChatRequest, tx: mpsc::Sender<StreamEvent>) -> Result<(), ProviderError> {
            let round = self.calls.fetch_add(1, Ordering::SeqCst);
            if round == 0 {
                let _ = tx
                    .send(StreamEvent::ToolUse { id: "call-1".to_string(), name: "get_time".to_string(), input: serde_json::json!({}) })
                    .await;
            } else {
                let _ = tx.send(StreamEvent::TextDelta { text: "The time is noon.".to_string() }).await;
            }
            let _ = tx
                .send(StreamEvent::Done { model: self.model.clone(), tokens_in: 1, tokens_out: 1, stop_reason: "end_turn".to_string() })
                .await;
            Ok(())
        }
    }

    /// Always asks for a tool — used to drive the tool-call budget past its
    /// limit deterministically.
    struct AlwaysToolProvider {
        model: String,
    }

    #[async_trait]
    impl LlmProvider for AlwaysToolProvider {
        fn name(&self) -> &str {
            "always-tool"
        }
        fn models(&self) -> Vec<String> {
            vec![self.model.clone()]
        }
        async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            unreachable!("tests drive send_stream only")
        }
        async fn send_stream(&self, _req: &ChatRequest, tx: mpsc::Sender<StreamEvent>) -> Result<(), ProviderError> {
            let _ = tx
                .send(StreamEvent::ToolUse { id: "call-n".to_string(), name: "get_time".to_string(), input: serde_json::json!({}) })
                .await;
            let _ = tx
                .send(StreamEvent::Done { model: self.model.clone(), tokens_in: 1, tokens_out: 1, stop_reason: "end_turn".to_string() })
                .await;
            Ok(())
        }
    }

    /// Asks for exactly one tool call per request, then answers with text —
    /// decided from the conversation history rather than a call counter, so
    /// the same provider instance behaves identically across separate
    /// `process()` calls for the same session.
    struct PerRequestOneToolProvider {
        model: String,
    }

    #[async_trait]
    impl LlmProvider for PerRequestOneToolProvider {
        fn name(&self) -> &str {
            "per-request-one-tool"
        }
        fn models(&self) -> Vec<String> {
            vec![self.model.clone()]
        }
        async fn send(&self, _req: &ChatRequest) -> Result<ChatResponse, ProviderError> {
            unreachable!("tests drive send_stream only")
        }
        async fn send_stream(&self, req: &ChatRequest, tx: mpsc::Sender<StreamEvent>) -> Result<(), ProviderError> {
            let last_user = req.messages.iter().rposition(|m| m.role == brain_mediator::Role::User);
            let already_called = match last_user {
                Some(idx) => req.messages[idx + 1..].iter().any(|m| m.role == brain_mediator::Role::Tool),
                None => false,
            };
            if already_called {
                let _ = tx.send(StreamEvent::TextDelta { text: "The time is noon.".to_string() }).await;
            } else {
                let _ = tx
                    .send(StreamEvent::ToolUse { id: "call-1".to_string(), name: "get_time".to_string(), input: serde_json::json!({}) })
                    .await;
            }
            let _ = tx
                .send(StreamEvent::Done { model: self.model.clone(), tokens_in: 1, tokens_out: 1, stop_reason: "end_turn".to_string() })
                .await;
            Ok(())
        }
    }

    struct GetTimeTool;

    #[async_trait]
    impl Tool for GetTimeTool {
        fn name(&self) -> &str {
            "get_time"
        }
        fn description(&self) -> &str {
            "returns the current time"
        }
        fn input_schema(&self) -> serde_json::Value {
            serde_json::json!({ "type": "object", "properties": {} })
        }
        async fn execute(&self, _ctx: &UserContext, _input: serde_json::Value) -> ToolResult {
            ToolResult::success("noon")
        }
    }

    fn registry_with_get_time() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(GetTimeTool)).expect("register get_time tool");
        Arc::new(registry)
    }

    #[tokio::test]
    async fn simple_reply_persists_user_and_assistant_messages() {
        let mut mediator = Mediator::new(24, 150);
        mediator.register(Arc::new(PlainTextProvider { model: "test-model".to_string(), reply: "Hello there." }));

        let repo = repository();
        let core = BrainCore::new(
            Arc::new(mediator),
            Arc::new(ToolRegistry::new()),
            pipeline(),
            repo.clone(),
            5,
            "test-model".to_string(),
        );

        let reply = core
            .process(CancellationToken::new(), user_ctx(), "hi".to_string())
            .await
            .expect("process should succeed");

        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.text, "Hello there.");

        let conversation = repo.retrieve_conversation(&UserId::from("u1"), None).expect("retrieve conversation");
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].role, Role::User);
        assert_eq!(conversation.messages[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn one_tool_round_trip_inserts_exactly_one_tool_message() {
        let mut mediator = Mediator::new(24, 150);
        mediator.register(Arc::new(RoundScriptedProvider { model: "test-model".to_string(), calls: AtomicUsize::new(0) }));

        let repo = repository();
        let core = BrainCore::new(
            Arc::new(mediator),
            registry_with_get_time(),
            pipeline(),
            repo.clone(),
            5,
            "test-model".to_string(),
        );

        let reply = core
            .process(CancellationToken::new(), user_ctx(), "what time is it?".to_string())
            .await
            .expect("process should succeed");

        assert_eq!(reply.text, "The time is noon.");

        let conversation = repo.retrieve_conversation(&UserId::from("u1"), None).expect("retrieve conversation");
        assert_eq!(conversation.messages.len(), 3, "expected user, tool, assistant");
        assert_eq!(conversation.messages[0].role, Role::User);
        assert_eq!(conversation.messages[1].role, Role::Tool);
        assert_eq!(conversation.messages[1].text, "noon");
        assert_eq!(conversation.messages[2].role, Role::Assistant);
    }

    #[tokio::test]
    async fn tool_limit_exceeded_terminates_with_the_deterministic_message() {
        let mut mediator = Mediator::new(24, 150);
        mediator.register(Arc::new(AlwaysToolProvider { model: "test-model".to_string() }));

        let repo = repository();
        let core = BrainCore::new(
            Arc::new(mediator),
            registry_with_get_time(),
            pipeline(),
            repo.clone(),
            1, // budget of one tool call total
            "test-model".to_string(),
        );

        let reply = core
            .process(CancellationToken::new(), user_ctx(), "loop forever".to_string())
            .await
            .expect("process should still terminate and succeed");

        assert!(reply.text.contains("limit"), "expected the deterministic tool-limit message, got: {}", reply.text);
        assert!(
            reply.tags.iter().any(|t| t == "tool_limit_exceeded"),
            "expected the assistant message to be tagged tool_limit_exceeded, got: {:?}",
            reply.tags
        );
    }

    #[tokio::test]
    async fn tool_call_budget_resets_between_separate_requests() {
        let mut mediator = Mediator::new(24, 150);
        mediator.register(Arc::new(PerRequestOneToolProvider { model: "test-model".to_string() }));

        let repo = repository();
        let core = BrainCore::new(
            Arc::new(mediator),
            registry_with_get_time(),
            pipeline(),
            repo.clone(),
            1, // budget of one tool call per request
            "test-model".to_string(),
        );

        let first = core
            .process(CancellationToken::new(), user_ctx(), "what time is it?".to_string())
            .await
            .expect("first request should succeed");
        assert_eq!(first.text, "The time is noon.");
        assert!(first.tags.is_empty(), "first request should not hit the tool limit");

        let second = core
            .process(CancellationToken::new(), user_ctx(), "what time is it now?".to_string())
            .await
            .expect("second request should succeed");
        assert_eq!(
            second.text, "The time is noon.",
            "a later request must get its own tool-call budget instead of inheriting the prior request's count"
        );
        assert!(second.tags.is_empty(), "second request should not be short-circuited by the first request's usage");
    }

    #[tokio::test]
    async fn scheduled_task_execution_synthesizes_a_percept_and_replies() {
        let mut mediator = Mediator::new(24, 150);
        mediator.register(Arc::new(PlainTextProvider { model: "test-model".to_string(), reply: "Reminder sent." }));

        let repo = repository();
        let core = BrainCore::new(
            Arc::new(mediator),
            Arc::new(ToolRegistry::new()),
            pipeline(),
            repo.clone(),
            5,
            "test-model".to_string(),
        );

        let task = Task {
            id: brain_core::types::TaskId::new(),
            user_id: UserId::from("u1"),
            title: "Water the plants".to_string(),
            description: "Every other day".to_string(),
            status: TaskStatus::Pending,
            priority: 1,
            tags: Vec::new(),
            scheduled_at: None,
            due_at: None,
            is_recurring: false,
            recurrence_config: None,
            parent_task_id: None,
            next_execution: None,
            execution_count: 0,
            metadata: serde_json::json!({}),
        };

        let reply = core
            .process_scheduled_task(CancellationToken::new(), user_ctx(), JobType::TaskReminder, &task)
            .await
            .expect("process_scheduled_task should succeed");

        assert_eq!(reply.text, "Reminder sent.");

        let conversation = repo.retrieve_conversation(&UserId::from("u1"), None).expect("retrieve conversation");
        assert!(conversation.messages[0].text.contains("Water the plants"));
    }
}
