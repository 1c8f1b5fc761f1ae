//! The question endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    question: String,
}

pub fn ask_routes() -> Router<AppState> {
    Router::new().route("/api/ask", post(ask))
}

async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "please provide a question" })),
        ));
    }

    info!(question, "received question");
    let outcome = state.engine.ask(question).await;
    Ok(Json(json!({
        "answer": outcome.answer,
        "cypher": outcome.cypher,
        "results": outcome.results,
        "description": outcome.description,
        "error": outcome.error,
    })))
}
