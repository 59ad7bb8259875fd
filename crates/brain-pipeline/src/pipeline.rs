use std::sync::Arc;

use brain_core::types::UserId;
use brain_devices::registry::DeviceRegistry;
use brain_mediator::{Batch, Delta};
use brain_protocol::Frame;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::accumulator::SentenceAccumulator;
use crate::queue::DropOldestQueue;
use crate::tts::TtsEngine;

const QUEUE_CAPACITY: usize = 256;
const DEFAULT_TTS_MAX_CHARS: usize = 280;

/// Tees a Mediator delta stream into a text path (device broadcast) and a
/// TTS path (sentence-accumulated synthesis), each running on its own
/// bounded [`DropOldestQueue`] so a slow device or slow voice backend never
/// stalls whoever is draining the Mediator's channel.
pub struct Pipeline {
    devices: Arc<DeviceRegistry>,
    tts: Arc<dyn TtsEngine>,
    tts_max_chars: usize,
}

impl Pipeline {
    pub fn new(devices: Arc<DeviceRegistry>, tts: Arc<dyn TtsEngine>) -> Self {
        Self {
            devices,
            tts,
            tts_max_chars: DEFAULT_TTS_MAX_CHARS,
        }
    }

    pub fn with_tts_max_chars(mut self, max_chars: usize) -> Self {
        self.tts_max_chars = max_chars;
        self
    }

    /// Opens a sink that a caller can feed batches into directly — used by
    /// the Brain Core, which needs to inspect tool calls from the same
    /// batches it tees to this pipeline, so it can't hand over a whole
    /// channel the way [`Pipeline::run`] does.
    pub fn start(&self, user_id: UserId, session_id: String) -> PipelineSink {
        let text_queue: Arc<DropOldestQueue<Frame>> =
            Arc::new(DropOldestQueue::new(QUEUE_CAPACITY, "pipeline-text"));
        let tts_queue: Arc<DropOldestQueue<String>> =
            Arc::new(DropOldestQueue::new(QUEUE_CAPACITY, "pipeline-tts"));

        let text_task = {
            let devices = self.devices.clone();
            let queue = text_queue.clone();
            let user_id = user_id.clone();
            tokio::spawn(async move {
                while let Some(frame) = queue.pop().await {
                    devices.broadcast(&user_id, &frame).await;
                }
            })
        };

        let tts_task = {
            let devices = self.devices.clone();
            let tts = self.tts.clone();
            let queue = tts_queue.clone();
            let session_id_for_tts = session_id.clone();
            tokio::spawn(async move {
                while let Some(segment) = queue.pop().await {
                    match tts.synthesize(&segment).await {
                        Ok(chunks) => {
                            for chunk in chunks {
                                let frame = Frame::audio_chunk(session_id_for_tts.clone(), chunk.to_vec());
                                devices.broadcast(&user_id, &frame).await;
                            }
                        }
                        Err(e) => warn!(error = %e, "tts synthesis failed, dropping segment"),
                    }
                }
                devices
                    .broadcast(&user_id, &Frame::audio_end(session_id_for_tts))
                    .await;
            })
        };

        PipelineSink {
            session_id,
            full_text: String::new(),
            accumulator: SentenceAccumulator::new(self.tts_max_chars),
            text_queue,
            tts_queue,
            text_task,
            tts_task,
        }
    }

    /// Drain `rx` to completion, teeing every delta, and return the fully
    /// assembled reply text. Convenience wrapper around [`Pipeline::start`]
    /// for callers (tests, simple single-shot requests) that don't need to
    /// inspect the batch stream themselves.
    pub async fn run(&self, user_id: UserId, session_id: String, mut rx: mpsc::Receiver<Batch>) -> String {
        let mut sink = self.start(user_id, session_id);
        while let Some(batch) = rx.recv().await {
            sink.ingest(batch);
        }
        sink.finish().await
    }
}

/// A single tee session opened by [`Pipeline::start`]. The caller pushes
/// batches in with [`PipelineSink::ingest`] and calls [`PipelineSink::finish`]
/// exactly once, when the whole exchange (including any tool-call rounds) is
/// truly over — not after every individual Mediator `stream` call, since a
/// multi-round tool loop makes several of those before it is done.
pub struct PipelineSink {
    session_id: String,
    full_text: String,
    accumulator: SentenceAccumulator,
    text_queue: Arc<DropOldestQueue<Frame>>,
    tts_queue: Arc<DropOldestQueue<String>>,
    text_task: JoinHandle<()>,
    tts_task: JoinHandle<()>,
}

impl PipelineSink {
    pub fn ingest(&mut self, batch: Batch) {
        for delta in batch {
            dispatch(&self.session_id, delta, &mut self.full_text, &mut self.accumulator, &self.text_queue, &self.tts_queue);
        }
    }

    pub async fn finish(mut self) -> String {
        if let Some(tail) = self.accumulator.flush() {
            self.tts_queue.push(tail);
        }
        self.text_queue.push(Frame::text_final(self.session_id.clone(), self.full_text.clone()));
        self.text_queue.close();
        self.tts_queue.close();

        let _ = self.text_task.await;
        let _ = self.tts_task.await;

        self.full_text
    }
}

fn dispatch(
    session_id: &str,
    delta: Delta,
    full_text: &mut String,
    accumulator: &mut SentenceAccumulator,
    text_queue: &DropOldestQueue<Frame>,
    tts_queue: &DropOldestQueue<String>,
) {
    if let Some(message) = delta.error {
        text_queue.push(Frame::error(session_id, "mediator_error", message));
        return;
    }

    for call in delta.tool_calls {
        text_queue.push(Frame::event(session_id, call.name, call.input));
    }

    if let Some(msg) = delta.msg {
        full_text.push_str(&msg.content);
        text_queue.push(Frame::text_delta(session_id, msg.content.clone()));
        for segment in accumulator.push(&msg.content) {
            tts_queue.push(segment);
        }
    }
}
