use brain_core::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    #[error("unknown tool: {0}")]
    NotFound(String),

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::DuplicateTool(_) => ErrorKind::Internal,
            ToolError::NotFound(_) => ErrorKind::NotFound,
            ToolError::InvalidArguments { .. } => ErrorKind::InvalidInput,
        }
    }
}
