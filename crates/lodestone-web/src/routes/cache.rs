//! Cache maintenance endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn cache_routes() -> Router<AppState> {
    Router::new().route("/api/clear-cache", post(clear_cache))
}

async fn clear_cache(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if state.engine.clear_caches().await {
        Ok(Json(json!({ "message": "cache cleared" })))
    } else {
        Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "cache could not be cleared" })),
        ))
    }
}
