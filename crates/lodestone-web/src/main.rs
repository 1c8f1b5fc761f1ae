//! Lodestone service binary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use lodestone_cache::{CacheStore, ConversationLog};
use lodestone_config::Settings;
use lodestone_core::GraphStore;
use lodestone_graph::Neo4jStore;
use lodestone_llm::{
    GeminiEmbeddingProvider, GeminiTextProvider, OpenRouterTextProvider, ProviderChain,
    TextGenerationProvider,
};
use lodestone_pipeline::AskEngine;
use lodestone_retrieval::{
    EmbeddingIndex, GraphContextExtractor, HybridRetriever, SchemaCache, SchemaIntrospector,
};
use lodestone_web::{AppState, SchemaRefreshTask};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::var("LODESTONE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("lodestone.toml"));
    let settings = Settings::load(Some(&config_path)).context("failed to load configuration")?;
    // The one fatal gate: missing credentials halt startup, everything else
    // degrades at runtime.
    settings.validate().context("invalid configuration")?;

    let cache = Arc::new(
        CacheStore::open(
            settings.cache_path(),
            Duration::from_secs(settings.cache.entry_ttl_secs),
        )
        .await
        .context("failed to open cache store")?,
    );
    let history = Arc::new(ConversationLog::open(settings.history_path()).await);

    let graph: Arc<dyn GraphStore> = Arc::new(
        Neo4jStore::connect(
            &settings.graph.uri,
            &settings.graph.user,
            settings.graph.password.as_deref().unwrap_or_default(),
            settings.graph.connect_retries,
        )
        .await,
    );

    let primary: Option<Arc<dyn TextGenerationProvider>> =
        settings.llm.gemini_api_key.as_ref().map(|key| {
            Arc::new(GeminiTextProvider::new(
                key.clone(),
                settings.llm.gemini_model.clone(),
                settings.llm.gemini_timeout_secs,
            )) as Arc<dyn TextGenerationProvider>
        });
    let fallback = settings.llm.openrouter_api_key.as_ref().map(|key| {
        OpenRouterTextProvider::new(
            key.clone(),
            settings
                .llm
                .fallback_models
                .first()
                .cloned()
                .unwrap_or_default(),
            settings.llm.openrouter_timeout_secs,
        )
    });
    let chain = Arc::new(ProviderChain::new(
        primary,
        fallback,
        settings.llm.fallback_models.clone(),
    ));
    if !chain.is_available() {
        warn!("no text generation provider configured; answers will degrade");
    }

    let embedding_provider = Arc::new(GeminiEmbeddingProvider::new(
        settings.llm.gemini_api_key.clone().unwrap_or_default(),
        settings.llm.gemini_timeout_secs,
    ));

    let index = Arc::new(EmbeddingIndex::new(
        embedding_provider,
        cache.clone(),
        graph.clone(),
        settings.retrieval.node_scan_cap,
    ));
    let extractor = Arc::new(GraphContextExtractor::new(graph.clone()));
    let retriever = Arc::new(HybridRetriever::new(
        index,
        extractor,
        cache.clone(),
        settings.retrieval.semantic_k,
        settings.retrieval.entity_depth,
    ));
    let schema_cache = Arc::new(
        SchemaCache::hydrate(
            cache.clone(),
            Duration::from_secs(settings.cache.schema_ttl_secs),
        )
        .await,
    );
    let introspector = Arc::new(SchemaIntrospector::new(graph.clone()));

    let engine = Arc::new(AskEngine::new(
        graph,
        retriever,
        schema_cache,
        introspector,
        chain,
        cache.clone(),
        history,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let refresh = SchemaRefreshTask::new(
        engine.clone(),
        Duration::from_secs(settings.retrieval.refresh_interval_secs),
        Duration::from_secs(settings.retrieval.refresh_error_backoff_secs),
    )
    .spawn(shutdown_rx.clone());
    info!(
        interval_secs = settings.retrieval.refresh_interval_secs,
        "background schema refresh started"
    );

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    lodestone_web::start_server(&settings.server, AppState::new(engine), shutdown_rx).await?;

    refresh.await.ok();
    cache.flush().await.ok();
    info!("shutdown complete");
    Ok(())
}
