//! `brain-mediator` — the LLM Mediator: a single streaming contract over
//! multiple provider adapters, with buffered-delta batching and one
//! recovery path (retry without tools when a model rejects them).

pub mod anthropic;
pub mod delta;
pub mod error;
pub mod mediator;
pub mod openai_compat;
pub mod prompt;
pub mod provider;
pub mod stream;

pub use delta::{Batch, Delta, DeltaMessage};
pub use error::MediatorError;
pub use mediator::{Mediator, MediatorInput};
pub use provider::{ChatRequest, ChatResponse, LlmProvider, Message, ProviderError, Role, ToolCall, ToolDefinition};
pub use stream::StreamEvent;
