//! Schema discovery and caching.

mod cache;
mod introspect;

pub use cache::{SchemaCache, SCHEMA_CACHE_KEY};
pub use introspect::SchemaIntrospector;
