//! Schema inspection endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn schema_routes() -> Router<AppState> {
    Router::new().route("/api/schema", get(schema))
}

async fn schema(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    match state.engine.current_digest().await {
        Some(digest) => {
            let message = format!("Schema detected: {}", digest.summary());
            Ok(Json(json!({
                "status": "success",
                "schema": digest,
                "message": message,
            })))
        }
        None => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "message": "schema detection failed - the graph store may be unavailable",
            })),
        )),
    }
}
