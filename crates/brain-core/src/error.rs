use thiserror::Error;

/// Semantic error class, shared across every `brain-*` crate so a caller at
/// the boundary can match on kind without matching each crate's concrete
/// error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    Unauthorized,
    NotFound,
    ProviderError,
    ToolError,
    ToolLimitExceeded,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::ProviderError => "PROVIDER_ERROR",
            ErrorKind::ToolError => "TOOL_ERROR",
            ErrorKind::ToolLimitExceeded => "TOOL_LIMIT_EXCEEDED",
            ErrorKind::Cancelled => "CANCELLED",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Error)]
pub enum BrainError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl BrainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BrainError::InvalidInput(_) => ErrorKind::InvalidInput,
            BrainError::Unauthorized(_) => ErrorKind::Unauthorized,
            BrainError::NotFound(_) => ErrorKind::NotFound,
            BrainError::Database(_) => ErrorKind::Internal,
            BrainError::Config(_) => ErrorKind::Internal,
            BrainError::Serialization(_) => ErrorKind::Internal,
            BrainError::Io(_) => ErrorKind::Internal,
            BrainError::Cancelled => ErrorKind::Cancelled,
            BrainError::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, BrainError>;
