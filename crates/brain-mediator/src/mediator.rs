use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::delta::{Batch, Delta};
use crate::error::MediatorError;
use crate::provider::{ChatRequest, ChatResponse, LlmProvider, Message, ProviderError, ToolDefinition};
use crate::prompt::SystemPrompt;
use crate::stream::StreamEvent;

/// One call's worth of input to [`Mediator::stream`].
#[derive(Debug, Clone)]
pub struct MediatorInput {
    pub id: String,
    pub system: String,
    pub system_prompt: Option<SystemPrompt>,
    pub messages: Vec<Message>,
    pub raw_messages: Option<Vec<serde_json::Value>>,
    pub tools: Vec<ToolDefinition>,
    pub selected_model: String,
    pub max_tokens: u32,
    pub meta: serde_json::Value,
}

struct Registration {
    provider: Arc<dyn LlmProvider>,
}

/// Owns a pool of provider adapters and drives the batched streaming
/// contract described in the LLM Mediator design.
pub struct Mediator {
    registrations: Vec<Registration>,
    buffer_limit: usize,
    tick: Duration,
}

impl Mediator {
    pub fn new(buffer_limit: usize, tick_ms: u64) -> Self {
        Self {
            registrations: Vec::new(),
            buffer_limit,
            tick: Duration::from_millis(tick_ms),
        }
    }

    /// Register an adapter. Selection among adapters whose `models()`
    /// contains the requested name is first-fit, ties broken by
    /// registration order (i.e. the order `register` was called in).
    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.registrations.push(Registration { provider });
    }

    /// Non-streaming single-shot call against the same provider pool
    /// `stream` uses — for callers (the Summarizer's Processor call) that
    /// want one complete response rather than a delta stream.
    pub async fn send_once(&self, model: &str, system: String, messages: Vec<Message>) -> Result<ChatResponse, MediatorError> {
        let adapter = self.select(model)?;
        let req = ChatRequest {
            model: model.to_string(),
            system,
            system_prompt: None,
            messages,
            raw_messages: None,
            max_tokens: 1024,
            tools: Vec::new(),
        };
        adapter.send(&req).await.map_err(MediatorError::Provider)
    }

    fn select(&self, model: &str) -> Result<Arc<dyn LlmProvider>, MediatorError> {
        self.registrations
            .iter()
            .find(|r| !r.provider.is_offline() && r.provider.models().iter().any(|m| m == model))
            .map(|r| r.provider.clone())
            .ok_or_else(|| MediatorError::NoProviderForModel(model.to_string()))
    }

    /// Drive a single request to completion, writing batches to `out_tx`.
    /// `out_tx` is closed by the Mediator exactly once, including on
    /// cancellation or panic during the drive — callers must never close it
    /// themselves.
    pub async fn stream(
        &self,
        ctx: CancellationToken,
        input: MediatorInput,
        out_tx: mpsc::Sender<Batch>,
    ) -> Result<(), MediatorError> {
        let closer = ChannelCloser::new(out_tx);
        let index = AtomicU64::new(0);

        let result = self.stream_with_fallback(&ctx, &input, &closer, &index).await;

        if let Err(ref e) = result {
            if !matches!(e, MediatorError::Cancelled) {
                let idx = index.fetch_add(1, Ordering::SeqCst);
                closer.send(vec![Delta::error(idx, e.to_string())]).await;
            }
        }
        closer.close();
        result
    }

    async fn stream_with_fallback(
        &self,
        ctx: &CancellationToken,
        input: &MediatorInput,
        closer: &ChannelCloser,
        index: &AtomicU64,
    ) -> Result<(), MediatorError> {
        let adapter = self.select(&input.selected_model)?;
        let req = build_chat_request(input, input.tools.clone());

        match self.run_stream(ctx, adapter.clone(), req, closer, index).await {
            Err(MediatorError::Provider(ProviderError::ToolsUnsupported)) if !input.tools.is_empty() => {
                info!(model = %input.selected_model, "model rejected tools, retrying without them");
                let retry_req = build_chat_request(input, Vec::new());
                self.run_stream(ctx, adapter, retry_req, closer, index).await
            }
            other => other,
        }
    }

    async fn run_stream(
        &self,
        ctx: &CancellationToken,
        adapter: Arc<dyn LlmProvider>,
        req: ChatRequest,
        closer: &ChannelCloser,
        index: &AtomicU64,
    ) -> Result<(), MediatorError> {
        let (provider_tx, mut provider_rx) = mpsc::channel::<StreamEvent>(64);
        let provider_ctx = ctx.clone();
        let adapter_for_task = adapter.clone();

        let provider_task = tokio::spawn(async move {
            tokio::select! {
                _ = provider_ctx.cancelled() => Err(ProviderError::Cancelled),
                res = adapter_for_task.send_stream(&req, provider_tx) => res,
            }
        });

        let mut buffer: Batch = Vec::new();
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // first tick fires immediately; discard it

        let drive_result: Result<(), MediatorError> = loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    if !buffer.is_empty() {
                        closer.send(std::mem::take(&mut buffer)).await;
                    }
                    break Err(MediatorError::Cancelled);
                }
                maybe_event = provider_rx.recv() => {
                    match maybe_event {
                        Some(event) => {
                            let done = matches!(event, StreamEvent::Done { .. });
                            let errored = matches!(event, StreamEvent::Error { .. });
                            let idx = index.fetch_add(1, Ordering::SeqCst);
                            buffer.push(Delta::from_event(idx, event));

                            if done || errored || buffer.len() >= self.buffer_limit {
                                closer.send(std::mem::take(&mut buffer)).await;
                            }
                            if done || errored {
                                break Ok(());
                            }
                        }
                        None => {
                            if !buffer.is_empty() {
                                closer.send(std::mem::take(&mut buffer)).await;
                            }
                            break Ok(());
                        }
                    }
                }
                _ = ticker.tick() => {
                    if !buffer.is_empty() {
                        closer.send(std::mem::take(&mut buffer)).await;
                    }
                }
            }
        };

        match provider_task.await {
            Ok(Ok(())) => drive_result,
            Ok(Err(ProviderError::Cancelled)) => Err(MediatorError::Cancelled),
            Ok(Err(e)) => Err(MediatorError::Provider(e)),
            Err(join_err) => {
                warn!(error = %join_err, "provider task panicked");
                Err(MediatorError::Internal("provider task panicked".to_string()))
            }
        }
    }
}

fn build_chat_request(input: &MediatorInput, tools: Vec<ToolDefinition>) -> ChatRequest {
    ChatRequest {
        model: input.selected_model.clone(),
        system: input.system.clone(),
        system_prompt: input.system_prompt.clone(),
        messages: input.messages.clone(),
        raw_messages: input.raw_messages.clone(),
        max_tokens: input.max_tokens,
        tools,
    }
}

/// Guards `out_tx`, guaranteeing it is dropped (closing the channel) exactly
/// once even when multiple code paths — including a panicking drop — try.
struct ChannelCloser {
    tx: StdMutex<Option<mpsc::Sender<Batch>>>,
}

impl ChannelCloser {
    fn new(tx: mpsc::Sender<Batch>) -> Self {
        Self {
            tx: StdMutex::new(Some(tx)),
        }
    }

    async fn send(&self, batch: Batch) {
        if batch.is_empty() {
            return;
        }
        let sender = self.tx.lock().expect("channel closer mutex poisoned").clone();
        if let Some(sender) = sender {
            let _ = sender.send(batch).await;
        }
    }

    fn close(&self) {
        self.tx.lock().expect("channel closer mutex poisoned").take();
    }
}

impl Drop for ChannelCloser {
    fn drop(&mut self) {
        self.close();
    }
}
