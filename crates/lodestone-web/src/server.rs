//! Router assembly and server startup.

use std::net::SocketAddr;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::Router;
use lodestone_config::ServerSettings;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};

use crate::routes::{ask_routes, cache_routes, health_routes, history_routes, schema_routes};
use crate::state::AppState;
use crate::{Result, WebError};

const MAX_BODY_SIZE_1MB: usize = 1024 * 1024;

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .merge(ask_routes())
        .merge(schema_routes())
        .merge(health_routes())
        .merge(history_routes())
        .merge(cache_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE_1MB))
        .layer(cors)
}

/// Bind and serve until the shutdown signal flips.
pub async fn start_server(
    config: &ServerSettings,
    state: AppState,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| WebError::Config(format!("invalid address: {e}")))?;

    tracing::info!("starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(WebError::Io)?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
            tracing::info!("server shutting down");
        })
        .await
        .map_err(WebError::Io)?;

    Ok(())
}
