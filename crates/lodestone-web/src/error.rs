//! Web-layer error type.

use thiserror::Error;

/// Errors that can abort server startup. Request handlers never surface
/// these; they shape degraded JSON bodies instead.
#[derive(Error, Debug)]
pub enum WebError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias for the web layer.
pub type Result<T> = std::result::Result<T, WebError>;
