//! Shared application state.

use std::sync::Arc;

use lodestone_pipeline::AskEngine;

/// State handed to every route: the ask engine carries all services.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AskEngine>,
}

impl AppState {
    pub fn new(engine: Arc<AskEngine>) -> Self {
        Self { engine }
    }
}
