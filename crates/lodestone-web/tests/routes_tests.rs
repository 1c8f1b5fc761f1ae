//! Route-level tests over the assembled router with scripted services.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use lodestone_cache::{CacheStore, ConversationLog};
use lodestone_core::GraphStore;
use lodestone_llm::{MockEmbeddingProvider, MockTextProvider, ProviderChain};
use lodestone_pipeline::AskEngine;
use lodestone_retrieval::{
    EmbeddingIndex, GraphContextExtractor, HybridRetriever, MockGraphStore, SchemaCache,
    SchemaIntrospector,
};
use lodestone_web::{build_router, AppState};
use serde_json::Value;
use tower::ServiceExt;

async fn state_with(store: MockGraphStore, provider: MockTextProvider) -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(
        CacheStore::open(dir.path().join("cache.json"), Duration::from_secs(3600))
            .await
            .unwrap(),
    );
    let history = Arc::new(ConversationLog::open(dir.path().join("history.json")).await);
    let graph: Arc<dyn GraphStore> = Arc::new(store);

    let index = Arc::new(EmbeddingIndex::new(
        Arc::new(MockEmbeddingProvider::new()),
        cache.clone(),
        graph.clone(),
        1000,
    ));
    let extractor = Arc::new(GraphContextExtractor::new(graph.clone()));
    let retriever = Arc::new(HybridRetriever::new(index, extractor, cache.clone(), 5, 2));
    let schema_cache =
        Arc::new(SchemaCache::hydrate(cache.clone(), Duration::from_secs(300)).await);
    let introspector = Arc::new(SchemaIntrospector::new(graph.clone()));
    let chain = Arc::new(ProviderChain::new(
        Some(Arc::new(provider)),
        None,
        Vec::new(),
    ));

    let engine = Arc::new(AskEngine::new(
        graph,
        retriever,
        schema_cache,
        introspector,
        chain,
        cache,
        history,
    ));
    (AppState::new(engine), dir)
}

async fn body_json(body: Body) -> Value {
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_graph_availability() {
    let (state, _dir) = state_with(MockGraphStore::new(), MockTextProvider::with_response("x")).await;
    let app = build_router(state);

    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["graph"], true);
}

#[tokio::test]
async fn empty_question_is_rejected() {
    let (state, _dir) = state_with(MockGraphStore::new(), MockTextProvider::with_response("x")).await;
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::post("/api/ask")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"question": "   "}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn ask_round_trip_returns_answer_and_query() {
    let responses = vec![
        r#"{"cypher": "MATCH (n) RETURN n", "description": "everything"}"#.to_string(),
        "Nothing in the database yet.".to_string(),
    ];
    let (state, _dir) = state_with(
        MockGraphStore::new(),
        MockTextProvider::with_responses(responses),
    )
    .await;
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::post("/api/ask")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"question": "what is in the Database?"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response.into_body()).await;
    assert_eq!(body["cypher"], "MATCH (n) RETURN n");
    assert_eq!(body["answer"], "Nothing in the database yet.");
    assert_eq!(body["description"], "everything");
}

#[tokio::test]
async fn history_starts_empty_and_records_turns() {
    let responses = vec![
        r#"{"cypher": "MATCH (n) RETURN n", "description": "d"}"#.to_string(),
        "the answer".to_string(),
    ];
    let (state, _dir) = state_with(
        MockGraphStore::new(),
        MockTextProvider::with_responses(responses),
    )
    .await;
    let app = build_router(state.clone());

    let response = app
        .clone()
        .oneshot(Request::get("/api/history").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response.into_body()).await;
    assert_eq!(body["history"].as_array().unwrap().len(), 0);

    app.clone()
        .oneshot(
            Request::post("/api/ask")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"question": "remember This"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .oneshot(Request::get("/api/history").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response.into_body()).await;
    assert_eq!(body["history"].as_array().unwrap().len(), 1);
    assert_eq!(body["history"][0]["question"], "remember This");
}

#[tokio::test]
async fn clear_cache_succeeds() {
    let (state, _dir) = state_with(MockGraphStore::new(), MockTextProvider::with_response("x")).await;
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::post("/api/clear-cache")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
