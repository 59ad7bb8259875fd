use brain_core::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("tts synthesis failed: {0}")]
    Synthesis(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}
