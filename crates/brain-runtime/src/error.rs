use brain_core::error::ErrorKind;
use brain_mediator::MediatorError;
use brain_memory::MemoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("mediator error: {0}")]
    Mediator(#[from] MediatorError),

    #[error("persistence error: {0}")]
    Persistence(#[from] MemoryError),

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::Mediator(e) => e.kind(),
            RuntimeError::Persistence(_) => ErrorKind::Internal,
            RuntimeError::Cancelled => ErrorKind::Cancelled,
            RuntimeError::Internal(_) => ErrorKind::Internal,
        }
    }
}
