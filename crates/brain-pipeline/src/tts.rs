use async_trait::async_trait;
use bytes::Bytes;

use crate::error::PipelineError;

/// Synthesizes speech audio from text. Adapters for a real voice backend
/// live outside this crate; the Pipeline only depends on this trait so the
/// Brain Core and Summarizer never need to know TTS exists.
#[async_trait]
pub trait TtsEngine: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<Bytes>, PipelineError>;
}

/// No-op engine for configurations without a voice backend.
pub struct NullTtsEngine;

#[async_trait]
impl TtsEngine for NullTtsEngine {
    async fn synthesize(&self, _text: &str) -> Result<Vec<Bytes>, PipelineError> {
        Ok(Vec::new())
    }
}
