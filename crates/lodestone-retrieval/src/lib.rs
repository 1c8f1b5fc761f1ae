//! # Lodestone Retrieval
//!
//! The retrieval half of the pipeline: discover what the graph looks like,
//! find what in it is relevant to a question, and package both into a
//! context the query synthesizer can lean on.
//!
//! - [`schema`]: schema introspection and the TTL'd digest cache
//! - [`embedding`]: per-text cached embeddings and the bounded linear
//!   semantic scan
//! - [`context`]: entity-seeded graph neighborhood extraction
//! - [`hybrid`]: the merged vector + graph retrieval pipeline
//!
//! Everything here is best-effort: failures degrade to empty or stale
//! structures and never propagate past this crate's boundary, with one
//! exception - a question that cannot be embedded at all fails the
//! pipeline, which reports it as a degraded outcome rather than an error.

pub mod context;
pub mod embedding;
pub mod error;
pub mod hybrid;
pub mod schema;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use context::GraphContextExtractor;
pub use embedding::EmbeddingIndex;
pub use error::{RetrievalError, RetrievalResult};
pub use hybrid::HybridRetriever;
pub use schema::{SchemaCache, SchemaIntrospector};

#[cfg(any(test, feature = "test-utils"))]
pub use test_support::MockGraphStore;
