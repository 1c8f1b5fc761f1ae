//! Retrieval error type.

use thiserror::Error;

/// The one failure the retrieval layer refuses to paper over: the question
/// itself could not be embedded, so no semantic scoring is possible at all.
/// Everything else degrades to empty structures instead of erroring.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("embedding provider unavailable: {0}")]
    Embedding(String),
}

/// Result alias for retrieval operations.
pub type RetrievalResult<T> = Result<T, RetrievalError>;
