use std::sync::Arc;

use brain_core::types::{JobType, Message, Role, Task, ToolResponsePointer, UserContext};
use brain_mediator::prompt::SystemPrompt;
use brain_mediator::{
    Delta, DeltaMessage, Mediator, MediatorInput, Message as MediatorMessage, Role as MediatorRole, ToolCall,
};
use brain_memory::ConversationRepository;
use brain_pipeline::{Pipeline, PipelineSink};
use brain_tools::{Executor, ToolRegistry};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::RuntimeError;
use crate::session::SessionStore;

const DEFAULT_STATIC_PROMPT: &str =
    "You are a helpful personal assistant. Answer directly, use tools when they genuinely help, and say when you don't know something.";

const TOOL_LIMIT_EXCEEDED_TEXT: &str =
    "I've reached my limit of tool calls for this turn, so I'll stop here instead of continuing indefinitely.";

/// Ties the Mediator, Tool Registry & Executor, Output Pipeline, and
/// Conversation Repository together and drives the decide loop: stream a
/// reply, fan out any tool calls the model asked for, and loop until the
/// model stops asking or the tool-call budget runs out.
pub struct BrainCore {
    mediator: Arc<Mediator>,
    tools: Arc<ToolRegistry>,
    pipeline: Arc<Pipeline>,
    repository: Arc<ConversationRepository>,
    sessions: SessionStore,
    max_tool_calls: u32,
    default_model: String,
}

impl BrainCore {
    pub fn new(
        mediator: Arc<Mediator>,
        tools: Arc<ToolRegistry>,
        pipeline: Arc<Pipeline>,
        repository: Arc<ConversationRepository>,
        max_tool_calls: u32,
        default_model: String,
    ) -> Self {
        Self {
            mediator,
            tools,
            pipeline,
            repository,
            sessions: SessionStore::new(),
            max_tool_calls,
            default_model,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Turn a scheduled job's firing into a synthesized percept and run it
    /// through the same decide loop as a live user message.
    pub async fn process_scheduled_task(
        &self,
        ctx: CancellationToken,
        user_ctx: UserContext,
        job_type: JobType,
        task: &Task,
    ) -> Result<Message, RuntimeError> {
        let percept = synthesize_task_percept(job_type, task);
        self.process(ctx, user_ctx, percept).await
    }

    /// The decide loop: build input from system prompt + session history +
    /// percept, stream a reply while teeing every delta to the Output
    /// Pipeline, and — for as long as the model keeps asking for tools and
    /// the running total stays within `max_tool_calls` — execute them in
    /// parallel and loop. Bounded iteration always terminates, either with
    /// the model's own final reply or the deterministic tool-limit message.
    pub async fn process(
        &self,
        ctx: CancellationToken,
        user_ctx: UserContext,
        percept_text: String,
    ) -> Result<Message, RuntimeError> {
        let session = self.sessions.get_or_create(user_ctx.user_id.clone());

        let conversation = self.repository.retrieve_conversation(&user_ctx.user_id, None)?;
        let conversation_id = conversation.id.clone();

        let percept = Message::new(user_ctx.user_id.clone(), conversation_id.clone(), Role::User, percept_text);
        if let Err(e) = self.repository.append_message(percept.clone()) {
            warn!(error = %e, "failed to persist user percept message");
        }

        let session_id_str = {
            let mut guard = session.lock().expect("brain session mutex poisoned");
            guard.messages.push(percept);
            guard.session_id.as_str().to_string()
        };

        let mut sink = self.pipeline.start(user_ctx.user_id.clone(), session_id_str.clone());
        let tool_defs = self.tools.list();

        let mut tool_calls_count: u32 = 0;
        let mut tool_limit_exceeded = false;

        loop {
            let chat_messages: Vec<MediatorMessage> = {
                let guard = session.lock().expect("brain session mutex poisoned");
                guard.messages.iter().map(to_mediator_message).collect()
            };

            let prompt = system_prompt(&user_ctx, &session_id_str);
            let input = MediatorInput {
                id: session_id_str.clone(),
                system: prompt.to_plain_text(),
                system_prompt: Some(prompt),
                messages: chat_messages,
                raw_messages: None,
                tools: tool_defs.clone(),
                selected_model: self.default_model.clone(),
                max_tokens: 4096,
                meta: serde_json::json!({}),
            };

            let pending_calls = self.run_stream(ctx.clone(), input, &mut sink).await?;

            if pending_calls.is_empty() {
                break;
            }

            let would_be = tool_calls_count + pending_calls.len() as u32;
            if would_be > self.max_tool_calls {
                tool_limit_exceeded = true;
                sink.ingest(vec![Delta {
                    index: 0,
                    msg: Some(DeltaMessage {
                        role: MediatorRole::Assistant,
                        content: TOOL_LIMIT_EXCEEDED_TEXT.to_string(),
                    }),
                    tool_calls: Vec::new(),
                    done: true,
                    error: None,
                }]);
                break;
            }
            tool_calls_count = would_be;

            let results = Executor::execute_batch(&user_ctx, &self.tools, &pending_calls).await;
            for (call, result) in pending_calls.iter().zip(results.iter()) {
                let mut tool_msg = Message::new(user_ctx.user_id.clone(), conversation_id.clone(), Role::Tool, result.content.clone());
                tool_msg.tool_response = Some(ToolResponsePointer {
                    tool_name: call.name.clone(),
                    call_id: call.id.clone(),
                });
                if let Err(e) = self.repository.append_message(tool_msg.clone()) {
                    warn!(error = %e, "failed to persist tool result message");
                }
                session.lock().expect("brain session mutex poisoned").messages.push(tool_msg);
            }
        }

        let full_text = sink.finish().await;
        let mut assistant_message = Message::new(user_ctx.user_id.clone(), conversation_id, Role::Assistant, full_text);
        if tool_limit_exceeded {
            assistant_message.tags.push("tool_limit_exceeded".to_string());
        }
        if let Err(e) = self.repository.append_message(assistant_message.clone()) {
            warn!(error = %e, "failed to persist assistant reply");
        }
        session.lock().expect("brain session mutex poisoned").messages.push(assistant_message.clone());

        Ok(assistant_message)
    }

    /// Drive one Mediator `stream` call to completion, teeing every batch
    /// into `sink`, and return the tool calls the model asked for (empty if
    /// it produced a final reply with none).
    async fn run_stream(
        &self,
        ctx: CancellationToken,
        input: MediatorInput,
        sink: &mut PipelineSink,
    ) -> Result<Vec<ToolCall>, RuntimeError> {
        let (tx, mut rx) = mpsc::channel(64);
        let mediator = self.mediator.clone();
        let stream_task = tokio::spawn(async move { mediator.stream(ctx, input, tx).await });

        let mut tool_calls = Vec::new();
        while let Some(batch) = rx.recv().await {
            for delta in &batch {
                tool_calls.extend(delta.tool_calls.clone());
            }
            sink.ingest(batch);
        }

        let result = stream_task
            .await
            .map_err(|_| RuntimeError::Internal("mediator task panicked".to_string()))?;
        result?;

        Ok(tool_calls)
    }
}

fn system_prompt(user_ctx: &UserContext, session_id: &str) -> SystemPrompt {
    SystemPrompt {
        static_tier: DEFAULT_STATIC_PROMPT.to_string(),
        user_tier: format!("You are assisting {} ({}).", user_ctx.username, user_ctx.email),
        volatile_tier: format!("session={session_id} time={}", user_ctx.now.to_rfc3339()),
    }
}

fn to_mediator_message(msg: &Message) -> MediatorMessage {
    MediatorMessage {
        role: to_mediator_role(msg.role),
        content: msg.text.clone(),
    }
}

fn to_mediator_role(role: Role) -> MediatorRole {
    match role {
        Role::User => MediatorRole::User,
        Role::Assistant => MediatorRole::Assistant,
        Role::System => MediatorRole::System,
        Role::Tool => MediatorRole::Tool,
    }
}

fn synthesize_task_percept(job_type: JobType, task: &Task) -> String {
    match job_type {
        JobType::TaskExecution => {
            format!("Scheduled task is due now: \"{}\". {}", task.title, task.description)
        }
        JobType::TaskReminder => {
            let due = task
                .due_at
                .map(|d| d.to_rfc3339())
                .unwrap_or_else(|| "unspecified".to_string());
            format!("Reminder for an upcoming task: \"{}\" (due {due}).", task.title)
        }
        JobType::TaskDeadline => {
            format!("A task's deadline has been reached: \"{}\".", task.title)
        }
        JobType::RecurringTask => {
            format!("Recurring task fired: \"{}\". {}", task.title, task.description)
        }
    }
}

