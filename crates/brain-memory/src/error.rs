use brain_core::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("embedding request failed: {0}")]
    Embedding(String),

    #[error("memory not found: {0}")]
    NotFound(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl MemoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MemoryError::Database(_) => ErrorKind::Internal,
            MemoryError::Embedding(_) => ErrorKind::ProviderError,
            MemoryError::NotFound(_) => ErrorKind::NotFound,
            MemoryError::Serialization(_) => ErrorKind::Internal,
        }
    }
}
