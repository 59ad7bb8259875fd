use brain_core::error::ErrorKind;
use brain_mediator::MediatorError;
use brain_memory::MemoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("mediator error: {0}")]
    Mediator(#[from] MediatorError),

    #[error("persistence error: {0}")]
    Persistence(#[from] MemoryError),
}

impl SummarizerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SummarizerError::Mediator(e) => e.kind(),
            SummarizerError::Persistence(_) => ErrorKind::Internal,
        }
    }
}
