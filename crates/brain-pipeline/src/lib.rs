//! `brain-pipeline` — the Output Pipeline: tees a Mediator delta stream into
//! a device-broadcast text path and a sentence-accumulated TTS path.

pub mod accumulator;
pub mod error;
pub mod pipeline;
pub mod queue;
pub mod tts;

pub use accumulator::SentenceAccumulator;
pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineSink};
pub use queue::DropOldestQueue;
pub use tts::{NullTtsEngine, TtsEngine};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use brain_core::types::{DeviceId, FrameKind, UserId};
    use brain_devices::device::{Device, SendOutcome};
    use brain_devices::registry::DeviceRegistry;
    use brain_mediator::{Delta, DeltaMessage, Role, ToolCall};
    use brain_protocol::{Frame, FrameType};
    use bytes::Bytes;
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    struct RecordingDevice {
        id: DeviceId,
        user: UserId,
        frames: Arc<Mutex<Vec<Frame>>>,
    }

    #[async_trait]
    impl Device for RecordingDevice {
        fn device_id(&self) -> &DeviceId {
            &self.id
        }
        fn user_id(&self) -> &UserId {
            &self.user
        }
        fn accepts(&self, _kind: FrameKind) -> bool {
            true
        }
        async fn send(&self, frame: &Frame) -> SendOutcome {
            self.frames.lock().expect("frames mutex poisoned").push(frame.clone());
            SendOutcome::Ok
        }
    }

    struct EchoTts;

    #[async_trait]
    impl TtsEngine for EchoTts {
        async fn synthesize(&self, text: &str) -> Result<Vec<Bytes>, PipelineError> {
            Ok(vec![Bytes::from(text.as_bytes().to_vec())])
        }
    }

    fn text_delta(index: u64, content: &str) -> Delta {
        Delta {
            index,
            msg: Some(DeltaMessage { role: Role::Assistant, content: content.to_string() }),
            tool_calls: Vec::new(),
            done: false,
            error: None,
        }
    }

    fn done(index: u64) -> Delta {
        Delta { index, msg: None, tool_calls: Vec::new(), done: true, error: None }
    }

    fn tool_use(index: u64, name: &str) -> Delta {
        Delta {
            index,
            msg: None,
            tool_calls: vec![ToolCall { id: "call-1".to_string(), name: name.to_string(), input: serde_json::json!({}) }],
            done: false,
            error: None,
        }
    }

    #[tokio::test]
    async fn text_deltas_arrive_in_order_and_final_carries_full_text() {
        let devices = Arc::new(DeviceRegistry::new());
        let frames = Arc::new(Mutex::new(Vec::new()));
        let user = UserId::from("u1");
        devices.register(
            user.clone(),
            Arc::new(RecordingDevice { id: DeviceId::new(), user: user.clone(), frames: frames.clone() }),
        );

        let pipeline = Pipeline::new(devices, Arc::new(NullTtsEngine));
        let (tx, rx) = mpsc::channel(16);
        tx.send(vec![text_delta(0, "Hello, "), text_delta(1, "world.")]).await.unwrap();
        tx.send(vec![done(2)]).await.unwrap();
        drop(tx);

        let full_text = pipeline.run(user, "sess-1".to_string(), rx).await;
        assert_eq!(full_text, "Hello, world.");

        let seen = frames.lock().expect("frames mutex poisoned");
        let deltas: Vec<&Frame> = seen.iter().filter(|f| f.frame_type == FrameType::TextDelta).collect();
        assert_eq!(deltas.len(), 2);
        let finals: Vec<&Frame> = seen.iter().filter(|f| f.frame_type == FrameType::TextFinal).collect();
        assert_eq!(finals.len(), 1);
        assert_eq!(finals[0].payload["content"], "Hello, world.");
    }

    #[tokio::test]
    async fn tool_call_deltas_become_event_frames_and_skip_tts() {
        let devices = Arc::new(DeviceRegistry::new());
        let frames = Arc::new(Mutex::new(Vec::new()));
        let user = UserId::from("u1");
        devices.register(
            user.clone(),
            Arc::new(RecordingDevice { id: DeviceId::new(), user: user.clone(), frames: frames.clone() }),
        );

        let pipeline = Pipeline::new(devices, Arc::new(EchoTts));
        let (tx, rx) = mpsc::channel(16);
        tx.send(vec![tool_use(0, "get_time")]).await.unwrap();
        tx.send(vec![done(1)]).await.unwrap();
        drop(tx);

        pipeline.run(user, "sess-1".to_string(), rx).await;

        let seen = frames.lock().expect("frames mutex poisoned");
        assert!(seen.iter().any(|f| f.frame_type == FrameType::Event));
        assert!(seen.iter().all(|f| f.frame_type != FrameType::AudioChunk));
    }

    #[tokio::test]
    async fn tts_segments_never_exceed_hard_cap() {
        let devices = Arc::new(DeviceRegistry::new());
        let frames = Arc::new(Mutex::new(Vec::new()));
        let user = UserId::from("u1");
        devices.register(
            user.clone(),
            Arc::new(RecordingDevice { id: DeviceId::new(), user: user.clone(), frames: frames.clone() }),
        );

        let pipeline = Pipeline::new(devices, Arc::new(EchoTts)).with_tts_max_chars(8);
        let (tx, rx) = mpsc::channel(16);
        tx.send(vec![text_delta(0, "no punctuation to split on at all here")]).await.unwrap();
        tx.send(vec![done(1)]).await.unwrap();
        drop(tx);

        pipeline.run(user, "sess-1".to_string(), rx).await;

        let seen = frames.lock().expect("frames mutex poisoned");
        for frame in seen.iter().filter(|f| f.frame_type == FrameType::AudioChunk) {
            let data = frame.payload["data"].as_array().expect("audio chunk payload is an array");
            assert!(data.len() <= 8, "tts segment exceeded the configured hard cap");
        }
        assert!(seen.iter().any(|f| f.frame_type == FrameType::AudioEnd));
    }
}
