//! `brain-memory` — Conversation Repository: the hot-window message store
//! and durable memory store, both backed by SQLite.

pub mod chunk;
pub mod db;
pub mod embedding;
pub mod error;
pub mod repository;

pub use chunk::chunk_content;
pub use embedding::{cosine_similarity, EmbeddingEngine, PlaceholderEmbeddingEngine};
pub use error::MemoryError;
pub use repository::{ConversationRepository, MemoryFilter, MemorySearch};
