use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tag discriminating a [`Frame`]'s payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FrameType {
    TextDelta,
    TextFinal,
    AudioChunk,
    AudioEnd,
    Event,
    Error,
}

/// Wire: `{ "type": "text-delta", "session_id": "...", "payload": {...} }`.
/// Every frame the core produces carries its `session_id` so a client with
/// multiple in-flight requests can correlate frames to the request that
/// produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    pub session_id: String,
    pub payload: Value,
}

impl Frame {
    pub fn text_delta(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            frame_type: FrameType::TextDelta,
            session_id: session_id.into(),
            payload: serde_json::json!({ "content": content.into() }),
        }
    }

    pub fn text_final(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            frame_type: FrameType::TextFinal,
            session_id: session_id.into(),
            payload: serde_json::json!({ "content": content.into() }),
        }
    }

    pub fn audio_chunk(session_id: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            frame_type: FrameType::AudioChunk,
            session_id: session_id.into(),
            payload: serde_json::json!({ "data": data }),
        }
    }

    pub fn audio_end(session_id: impl Into<String>) -> Self {
        Self {
            frame_type: FrameType::AudioEnd,
            session_id: session_id.into(),
            payload: Value::Null,
        }
    }

    pub fn event(session_id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            frame_type: FrameType::Event,
            session_id: session_id.into(),
            payload: serde_json::json!({ "tool_name": tool_name.into(), "arguments": arguments }),
        }
    }

    pub fn error(session_id: impl Into<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            frame_type: FrameType::Error,
            session_id: session_id.into(),
            payload: serde_json::json!({ "code": code, "message": message.into() }),
        }
    }

    pub fn accepts(&self) -> brain_core::types::FrameKind {
        use brain_core::types::FrameKind;
        match self.frame_type {
            FrameType::AudioChunk | FrameType::AudioEnd => FrameKind::Audio,
            _ => FrameKind::Text,
        }
    }
}
