use async_trait::async_trait;

use crate::error::MemoryError;

/// Produces a fixed-dimension embedding for a chunk of text. Adapters for a
/// real embedding model live outside this crate.
#[async_trait]
pub trait EmbeddingEngine: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;
    fn dimension(&self) -> usize;
}

/// Deterministic bag-of-words feature-hashing embedding. Not a real semantic
/// embedder — a placeholder so `find_memories` has something non-degenerate
/// to rank by before a real model is wired in.
pub struct PlaceholderEmbeddingEngine {
    dimension: usize,
}

impl PlaceholderEmbeddingEngine {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingEngine for PlaceholderEmbeddingEngine {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text.split_whitespace() {
            let bucket = (fnv1a(&token.to_lowercase()) as usize) % self.dimension;
            vector[bucket] += 1.0;
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in s.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// `dot(a, b) / (|a| * |b|)`; `0.0` if either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
