//! `brain-scheduler` — the Scheduler: a durable delayed job queue with
//! at-least-once delivery, backed by the same SQLite database as the
//! Conversation Repository, replaying fired jobs through the Brain Core.

pub mod db;
pub mod engine;
pub mod error;
pub mod job;
pub mod queue;
pub mod recurrence;
pub mod task_store;

pub use engine::SchedulerEngine;
pub use error::SchedulerError;
pub use job::{QueueClass, QueuedJob};
pub use recurrence::compute_next_occurrence;
pub use task_store::{SqliteTaskStore, TaskStore, UserContextResolver};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task_store::test_support::{FixedUserContextResolver, InMemoryTaskStore};
    use async_trait::async_trait;
    use brain_core::types::{
        JobType, RecurrenceConfig, RecurrenceType, Task, TaskId, TaskStatus, UserId,
    };
    use brain_devices::registry::DeviceRegistry;
    use brain_mediator::{ChatRequest, ChatResponse, LlmProvider, Mediator, ProviderError};
    use brain_memory::ConversationRepository;
    use brain_pipeline::{NullTtsEngine, Pipeline};
    use brain_runtime::BrainCore;
    use brain_tools::ToolRegistry;
    use chrono::{Duration, Utc};
    use rusqlite::Connection;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

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
            Ok(ChatResponse {
                content: self.reply.to_string(),
                model: self.model.clone(),
                tokens_in: 1,
                tokens_out: 1,
                stop_reason: "end_turn".to_string(),
                tool_calls: Vec::new(),
            })
        }
    }

    fn engine(task_store: Arc<InMemoryTaskStore>) -> Arc<SchedulerEngine> {
        let mut mediator = Mediator::new(24, 150);
        mediator.register(Arc::new(PlainTextProvider { model: "test-model".to_string(), reply: "Done." }));

        let conversations = Connection::open_in_memory().expect("open in-memory sqlite db");
        let repo = Arc::new(ConversationRepository::new(conversations, 1440).expect("init conversation repository"));
        let pipeline = Arc::new(Pipeline::new(Arc::new(DeviceRegistry::new()), Arc::new(NullTtsEngine)));
        let core = Arc::new(BrainCore::new(
            Arc::new(mediator),
            Arc::new(ToolRegistry::new()),
            pipeline,
            repo,
            5,
            "test-model".to_string(),
        ));

        let jobs_db = Connection::open_in_memory().expect("open in-memory sqlite db");
        Arc::new(
            SchedulerEngine::new(jobs_db, core, task_store, Arc::new(FixedUserContextResolver), 2)
                .expect("init scheduler engine"),
        )
    }

    fn pending_task(id: TaskId) -> Task {
        Task {
            id,
            user_id: UserId::from("u1"),
            title: "Water the plants".to_string(),
            description: String::new(),
            status: TaskStatus::Pending,
            priority: 3,
            tags: Vec::new(),
            scheduled_at: None,
            due_at: None,
            is_recurring: false,
            recurrence_config: None,
            parent_task_id: None,
            next_execution: None,
            execution_count: 0,
            metadata: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn a_due_task_execution_job_runs_and_marks_the_task_done() {
        let task_store = Arc::new(InMemoryTaskStore::new());
        let task_id = TaskId::new();
        task_store.insert(pending_task(task_id.clone()));

        let engine = engine(task_store.clone());
        engine
            .schedule_task_execution(task_id.clone(), UserId::from("u1"), 3, Utc::now() - Duration::seconds(1))
            .expect("schedule should succeed");

        engine.tick().await.expect("tick should succeed");
        let ctx = CancellationToken::new();
        let job = engine_pop(&engine).await.expect("job should be queued after tick");
        engine.handle_job(ctx, job).await;

        let task = task_store.load_task(&task_id).await.unwrap().expect("task should still exist");
        assert_eq!(task.status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn a_recurring_job_reschedules_itself_with_an_incremented_execution_count() {
        let task_store = Arc::new(InMemoryTaskStore::new());
        let task_id = TaskId::new();
        let mut task = pending_task(task_id.clone());
        task.is_recurring = true;
        task.due_at = Some(Utc::now() - Duration::days(1));
        task.recurrence_config = Some(RecurrenceConfig {
            recurrence_type: RecurrenceType::Daily,
            interval: 1,
            days_of_week: Vec::new(),
            days_of_month: Vec::new(),
            months_of_year: Vec::new(),
            end_date: None,
            max_occurrences: None,
            custom_base_unit_secs: None,
        });
        task_store.insert(task);

        let engine = engine(task_store.clone());
        engine
            .schedule_recurring_task(task_id.clone(), UserId::from("u1"), 3, Utc::now() - Duration::seconds(1))
            .expect("schedule should succeed");

        engine.tick().await.expect("tick should succeed");
        let job = engine_pop(&engine).await.expect("job should be queued after tick");
        assert_eq!(job.payload.job_type, JobType::RecurringTask);
        engine.handle_job(CancellationToken::new(), job).await;

        let task = task_store.load_task(&task_id).await.unwrap().expect("task should still exist");
        assert_eq!(task.execution_count, 1);
        assert!(task.next_execution.is_some());
        assert_eq!(task.status, TaskStatus::Pending, "recurring task stays pending between runs");
    }

    #[tokio::test]
    async fn cancel_prevents_a_pending_job_from_being_dispatched() {
        let task_store = Arc::new(InMemoryTaskStore::new());
        let task_id = TaskId::new();
        task_store.insert(pending_task(task_id.clone()));

        let engine = engine(task_store.clone());
        engine
            .schedule_task_execution(task_id.clone(), UserId::from("u1"), 3, Utc::now() - Duration::seconds(1))
            .expect("schedule should succeed");
        engine.cancel(&task_id).expect("cancel should succeed");

        engine.tick().await.expect("tick should succeed");
        assert!(engine_try_pop(&engine).await.is_none(), "cancelled job must not dispatch");
    }

    async fn engine_pop(engine: &SchedulerEngine) -> Option<crate::job::QueuedJob> {
        tokio::time::timeout(std::time::Duration::from_millis(200), engine.queues_for_test().pop())
            .await
            .ok()
            .flatten()
    }

    async fn engine_try_pop(engine: &SchedulerEngine) -> Option<crate::job::QueuedJob> {
        engine_pop(engine).await
    }
}
