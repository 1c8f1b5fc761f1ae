//! Error types for graph store operations.

use thiserror::Error;

/// Errors raised by a [`crate::GraphStore`] implementation.
#[derive(Error, Debug)]
pub enum GraphError {
    /// The store could not be reached or the connection was lost.
    #[error("graph store unavailable: {0}")]
    Unavailable(String),

    /// The query was rejected or failed during execution.
    #[error("query failed: {0}")]
    Query(String),

    /// A value in the result could not be converted to a [`crate::GraphValue`].
    #[error("result conversion failed: {0}")]
    Conversion(String),
}

/// Result alias for graph store operations.
pub type GraphResult<T> = Result<T, GraphError>;
