//! # Lodestone Core
//!
//! Core types and traits shared across the Lodestone workspace.
//!
//! ## Modules
//!
//! - [`graph`]: property-graph value model and the [`GraphStore`] trait
//! - [`schema`]: runtime-discovered schema digest records
//! - [`context`]: retrieval context and pipeline outcome types
//! - [`hashing`]: stable content hashing for cache keys
//!
//! Everything here is pure data plus trait seams - no I/O, no provider
//! specifics. Concrete adapters live in `lodestone-graph`, `lodestone-llm`
//! and `lodestone-cache`.

pub mod context;
pub mod error;
pub mod graph;
pub mod hashing;
pub mod schema;

pub use context::{
    CandidateQuery, CentralEntity, ConnectionRecord, ContextEntry, ContextSource,
    ConversationTurn, EntityContext, PipelineOutcome, PipelineStatus, RetrievalContext,
    SemanticMatch, SharedValue, SimilarEntity,
};
pub use error::{GraphError, GraphResult};
pub use graph::{
    GraphNode, GraphPath, GraphRelationship, GraphRow, GraphStore, GraphValue, QueryParam,
};
pub use hashing::sha256_hex;
pub use schema::{ConnectionPattern, NodeTypeInfo, PropertySample, RelTypeInfo, SchemaDigest};
