//! Route groups for the HTTP surface.

mod ask;
mod cache;
mod health;
mod history;
mod schema;

pub use ask::ask_routes;
pub use cache::cache_routes;
pub use health::health_routes;
pub use history::history_routes;
pub use schema::schema_routes;
