//! Conversation history endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn history_routes() -> Router<AppState> {
    Router::new().route("/api/history", get(history))
}

async fn history(State(state): State<AppState>) -> Json<Value> {
    let turns = state.engine.history().recent(10).await;
    Json(json!({ "history": turns }))
}
