//! Health check endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use lodestone_core::GraphValue;
use serde_json::{json, Value};

use crate::state::AppState;

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/api/health", get(health))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let graph_available = state.engine.graph().is_available().await;

    let mut body = json!({
        "status": "healthy",
        "graph": graph_available,
    });

    if graph_available {
        let total_nodes = state
            .engine
            .graph()
            .query("MATCH (n) RETURN count(n) AS total LIMIT 1")
            .await
            .ok()
            .and_then(|rows| {
                rows.first()
                    .and_then(|row| row.get("total").and_then(GraphValue::as_i64))
            });
        body["total_nodes"] = json!(total_nodes);

        if let Some(digest) = state.engine.current_digest().await {
            body["schema"] = json!({
                "node_types": digest.nodes.len(),
                "relationship_types": digest.relationships.len(),
                "total_nodes": digest.total_nodes,
                "total_relationships": digest.total_relationships,
            });
        }
    }

    Json(body)
}
