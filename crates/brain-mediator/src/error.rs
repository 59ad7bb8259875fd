use brain_core::error::ErrorKind;
use thiserror::Error;

use crate::provider::ProviderError;

#[derive(Debug, Error)]
pub enum MediatorError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("no adapter registered for model {0}")]
    NoProviderForModel(String),

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl MediatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediatorError::Provider(_) => ErrorKind::ProviderError,
            MediatorError::NoProviderForModel(_) => ErrorKind::InvalidInput,
            MediatorError::Cancelled => ErrorKind::Cancelled,
            MediatorError::Internal(_) => ErrorKind::Internal,
        }
    }
}
