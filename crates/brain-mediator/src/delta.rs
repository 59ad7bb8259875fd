use crate::provider::{Role, ToolCall};
use crate::stream::StreamEvent;

#[derive(Debug, Clone)]
pub struct DeltaMessage {
    pub role: Role,
    pub content: String,
}

/// One unit of the Mediator's downstream contract. A `stream` call produces
/// a sequence of batches, each batch a non-empty `Vec<Delta>`; `index` is
/// monotonic across the whole call, including across the tools-unsupported
/// retry.
#[derive(Debug, Clone)]
pub struct Delta {
    pub index: u64,
    pub msg: Option<DeltaMessage>,
    pub tool_calls: Vec<ToolCall>,
    pub done: bool,
    pub error: Option<String>,
}

impl Delta {
    pub(crate) fn from_event(index: u64, event: StreamEvent) -> Self {
        match event {
            StreamEvent::TextDelta { text } => Delta {
                index,
                msg: Some(DeltaMessage {
                    role: Role::Assistant,
                    content: text,
                }),
                tool_calls: Vec::new(),
                done: false,
                error: None,
            },
            StreamEvent::ToolUse { id, name, input } => Delta {
                index,
                msg: None,
                tool_calls: vec![ToolCall { id, name, input }],
                done: false,
                error: None,
            },
            StreamEvent::Done { .. } => Delta {
                index,
                msg: None,
                tool_calls: Vec::new(),
                done: true,
                error: None,
            },
            StreamEvent::Error { message } => Delta {
                index,
                msg: None,
                tool_calls: Vec::new(),
                done: true,
                error: Some(message),
            },
        }
    }

    pub(crate) fn error(index: u64, message: String) -> Self {
        Delta {
            index,
            msg: None,
            tool_calls: Vec::new(),
            done: true,
            error: Some(message),
        }
    }
}

/// A non-empty group of deltas flushed downstream together, either because
/// the buffer limit was reached or the coalescing tick elapsed.
pub type Batch = Vec<Delta>;
