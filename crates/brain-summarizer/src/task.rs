use std::sync::Arc;
use std::time::Duration;

use brain_core::types::{Message, UserId};
use brain_mediator::{Mediator, Message as MediatorMessage, Role as MediatorRole};
use brain_memory::{ConversationRepository, EmbeddingEngine};
use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::SummarizerError;
use crate::judgement::{SummaryJudgement, JUDGEMENT_SYSTEM_PROMPT};

/// Periodic background task: every tick, pulls each active user's recent
/// hot-window messages, asks the Processor whether they are worth a durable
/// memory, and prunes the window once judged.
///
/// Meant to run as a single instance per process — spawn [`SummarizerTask::run`]
/// once and let it run for the process lifetime; running two instances
/// against the same repository would double up Processor calls for no
/// benefit, since both would see the same active users each tick.
pub struct SummarizerTask {
    mediator: Arc<Mediator>,
    repository: Arc<ConversationRepository>,
    embedder: Arc<dyn EmbeddingEngine>,
    model: String,
    interval: Duration,
    window: chrono::Duration,
    confidence_threshold: f64,
}

impl SummarizerTask {
    pub fn new(
        mediator: Arc<Mediator>,
        repository: Arc<ConversationRepository>,
        embedder: Arc<dyn EmbeddingEngine>,
        model: String,
        interval_secs: u64,
        confidence_threshold: f64,
    ) -> Self {
        Self {
            mediator,
            repository,
            embedder,
            model,
            interval: Duration::from_secs(interval_secs),
            window: chrono::Duration::seconds(interval_secs as i64),
            confidence_threshold,
        }
    }

    /// Runs ticks on `interval` until `ctx` is cancelled. Missed ticks are
    /// skipped rather than queued up — a tick that's late because the
    /// previous one ran long is simply dropped, not backfilled.
    pub async fn run(&self, ctx: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await; // first tick fires immediately; discard it

        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    info!("summarizer stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(error = %e, "summarizer tick failed");
                    }
                }
            }
        }
    }

    /// One pass: enumerate active users, judge each one's recent window, and
    /// prune it regardless of the judgement. A single user's failure is
    /// logged and does not stop the rest of the tick.
    pub async fn tick(&self) -> Result<(), SummarizerError> {
        let now = Utc::now();
        let window_start = now - self.window;
        let users = self.repository.list_active_users(window_start)?;

        for user_id in users {
            if let Err(e) = self.process_user(&user_id, window_start, now).await {
                warn!(user_id = %user_id, error = %e, "summarizer failed for user, window left unpruned");
            }
        }
        Ok(())
    }

    async fn process_user(
        &self,
        user_id: &UserId,
        window_start: chrono::DateTime<Utc>,
        now: chrono::DateTime<Utc>,
    ) -> Result<(), SummarizerError> {
        let messages = self.repository.fetch_messages(user_id, window_start, now)?;
        if messages.is_empty() {
            return Ok(());
        }

        let conversation = self.repository.retrieve_conversation(user_id, None)?;
        let transcript = render_transcript(&messages);

        let response = self
            .mediator
            .send_once(
                &self.model,
                JUDGEMENT_SYSTEM_PROMPT.to_string(),
                vec![MediatorMessage { role: MediatorRole::User, content: transcript }],
            )
            .await?;

        let judgement = SummaryJudgement::parse(&response.content);

        if judgement.worth_memory && judgement.confidence >= self.confidence_threshold {
            self.repository
                .create_memory(
                    &conversation.id,
                    judgement.memory_type,
                    judgement.saliency,
                    judgement.memory_content,
                    self.embedder.as_ref(),
                )
                .await?;
        }

        self.repository.prune_messages_before(user_id, window_start)?;
        Ok(())
    }
}

fn render_transcript(messages: &[Message]) -> String {
    messages.iter().map(|m| format!("{}: {}", m.role, m.text)).collect::<Vec<_>>().join("\n")
}
