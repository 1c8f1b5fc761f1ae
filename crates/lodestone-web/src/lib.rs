//! # Lodestone Web
//!
//! The HTTP surface: JSON routes over the ask engine plus the periodic
//! background schema refresh. The core pipeline lives below this crate;
//! routes only parse requests, call the engine and shape responses.

pub mod refresh;
pub mod routes;
pub mod server;
pub mod state;

mod error;

pub use error::{Result, WebError};
pub use refresh::{next_delay, RefreshOutcome, SchemaRefreshTask};
pub use server::{build_router, start_server};
pub use state::AppState;
