//! Embedding provider trait and vector math.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by an embedding provider.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("http error: {0}")]
    Http(String),

    #[error("provider returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// Result alias for embedding calls.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Opaque text-to-vector capability.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a text into a dense vector.
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Human-readable provider name for logs.
    fn provider_name(&self) -> &str;
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero norm - a defined edge case, not
/// an error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| *x as f64 * *y as f64)
        .sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
