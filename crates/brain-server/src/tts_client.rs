use async_trait::async_trait;
use brain_pipeline::{PipelineError, TtsEngine};
use bytes::Bytes;

/// HTTP-backed [`TtsEngine`] for a configured voice endpoint. POSTs the
/// segment text as a JSON body and treats the whole response body as one
/// opaque audio chunk — the wire format of the audio itself is whatever the
/// configured endpoint emits, this crate never inspects it.
pub struct HttpTtsEngine {
    client: reqwest::Client,
    endpoint_url: String,
}

impl HttpTtsEngine {
    pub fn new(endpoint_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint_url,
        }
    }
}

#[async_trait]
impl TtsEngine for HttpTtsEngine {
    async fn synthesize(&self, text: &str) -> Result<Vec<Bytes>, PipelineError> {
        let response = self
            .client
            .post(&self.endpoint_url)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| PipelineError::Synthesis(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PipelineError::Synthesis(format!(
                "tts endpoint returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::Synthesis(e.to_string()))?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![bytes])
    }
}
