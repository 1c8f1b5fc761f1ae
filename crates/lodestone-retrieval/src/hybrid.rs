//! Hybrid retrieval: semantic scan + graph expansion merged into one
//! scored context, and the cached full pipeline that feeds the query
//! synthesizer.

use std::sync::{Arc, OnceLock};

use lodestone_cache::CacheStore;
use lodestone_core::{
    sha256_hex, ContextEntry, ContextSource, PipelineOutcome, PipelineStatus, RetrievalContext,
};
use regex::Regex;
use serde_json::json;
use tracing::{info, warn};

use crate::context::GraphContextExtractor;
use crate::embedding::EmbeddingIndex;
use crate::error::RetrievalResult;

/// Graph matches carry no native similarity; they enter the merged context
/// with this fixed default.
const GRAPH_MATCH_SIMILARITY: f64 = 0.5;

/// Most entities considered per question.
const MAX_ENTITIES: usize = 10;

fn entity_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Unicode-aware so questions in any script keep their proper nouns.
    PATTERN.get_or_init(|| Regex::new(r"\b\p{Lu}\p{L}+\b").expect("static pattern compiles"))
}

/// Orchestrates embedding search and graph context extraction into one
/// merged, scored context.
pub struct HybridRetriever {
    index: Arc<EmbeddingIndex>,
    extractor: Arc<GraphContextExtractor>,
    cache: Arc<CacheStore>,
    semantic_k: usize,
    entity_depth: u32,
}

impl HybridRetriever {
    pub fn new(
        index: Arc<EmbeddingIndex>,
        extractor: Arc<GraphContextExtractor>,
        cache: Arc<CacheStore>,
        semantic_k: usize,
        entity_depth: u32,
    ) -> Self {
        Self {
            index,
            extractor,
            cache,
            semantic_k,
            entity_depth,
        }
    }

    /// Heuristic entity extraction: capitalized tokens longer than two
    /// characters, first-seen order, deduplicated, at most ten. A naive
    /// named-entity substitute - false positives and negatives are an
    /// accepted limitation.
    pub fn extract_entities(&self, text: &str) -> Vec<String> {
        let mut entities: Vec<String> = Vec::new();
        for token in entity_pattern().find_iter(text) {
            let token = token.as_str();
            if token.chars().count() <= 2 {
                continue;
            }
            if !entities.iter().any(|e| e == token) {
                entities.push(token.to_string());
            }
            if entities.len() == MAX_ENTITIES {
                break;
            }
        }
        entities
    }

    /// Run semantic search and (when entities exist) graph context
    /// extraction concurrently, then merge.
    pub async fn hybrid_retrieval(
        &self,
        question: &str,
        k: usize,
    ) -> RetrievalResult<RetrievalContext> {
        let entities = self.extract_entities(question);
        info!(?entities, "extracted entities");

        let semantic_future = self.index.search(question, k);
        let graph_future = async {
            if entities.is_empty() {
                lodestone_core::EntityContext::degenerate(&entities)
            } else {
                self.extractor
                    .extract_entity_context(&entities, self.entity_depth)
                    .await
            }
        };
        let (semantic_matches, graph_context) = tokio::join!(semantic_future, graph_future);
        let semantic_matches = semantic_matches?;

        let mut merged: Vec<ContextEntry> = Vec::new();
        for m in &semantic_matches {
            merged.push(ContextEntry {
                entity: json!({
                    "id": m.node_id,
                    "labels": m.labels,
                    "properties": m.properties,
                }),
                similarity: m.similarity,
                source: ContextSource::Semantic,
            });
        }
        for central in &graph_context.central_entities {
            merged.push(ContextEntry {
                entity: central.node.clone(),
                similarity: GRAPH_MATCH_SIMILARITY,
                source: ContextSource::Graph,
            });
        }

        let combined_relevance = if merged.is_empty() {
            0.0
        } else {
            merged.iter().map(|e| e.similarity).sum::<f64>() / merged.len() as f64
        };

        Ok(RetrievalContext {
            entities,
            semantic_matches,
            graph_context,
            merged,
            combined_relevance,
        })
    }

    /// Human-readable context summary embedded in the generation prompt:
    /// counts per source plus the top-3 semantic matches verbatim.
    pub fn summarize_context(&self, context: &RetrievalContext) -> String {
        let mut parts: Vec<String> = Vec::new();

        if !context.semantic_matches.is_empty() {
            parts.push(format!(
                "Semantic matches: {} similar nodes found",
                context.semantic_matches.len()
            ));
            for m in context.semantic_matches.iter().take(3) {
                parts.push(format!(
                    "  - Node: {} (similarity: {:.2})",
                    m.properties, m.similarity
                ));
            }
        }

        if !context.graph_context.central_entities.is_empty() {
            parts.push(format!(
                "Central nodes: {} found",
                context.graph_context.central_entities.len()
            ));
            let similar_total: usize = context
                .graph_context
                .central_entities
                .iter()
                .map(|c| c.similar.len())
                .sum();
            if similar_total > 0 {
                parts.push(format!("Similar entities: {similar_total} found"));
            }
        }

        if !context.merged.is_empty() {
            parts.push(format!("Combined entities: {} total", context.merged.len()));
        }

        if parts.is_empty() {
            "No specific context found".to_string()
        } else {
            parts.join("\n")
        }
    }

    /// Render the context-aware generation prompt. The JSON output contract
    /// (`cypher` and `description` fields) is fixed - downstream parsing
    /// depends on it.
    pub fn generation_prompt(
        &self,
        question: &str,
        context: &RetrievalContext,
        summary: &str,
        schema_text: &str,
    ) -> String {
        format!(
            r#"{schema_text}

CONTEXT INFORMATION:
{summary}

DETECTED ENTITIES: {entities:?}
SEMANTIC RELEVANCE: {relevance:.2}

TASK: Using the context above, translate the user question into a single
read-only Cypher query.

USER QUESTION: "{question}"

GUIDELINES:
- Use the entities from the context
- Prefer semantically similar nodes
- Exploit the graph structure for deeper matches
- Do not use LIMIT; return all relevant data

RESPONSE FORMAT (JSON only):
{{
  "cypher": "Cypher query using only MATCH and RETURN",
  "description": "explanation grounded in the retrieved context"
}}
"#,
            entities = context.entities,
            relevance = context.combined_relevance,
        )
    }

    /// The cached full pipeline: retrieval plus prompt rendering, wrapped
    /// in a status-carrying outcome. Internal failures return a degraded
    /// outcome; nothing escapes this boundary.
    pub async fn full_pipeline(&self, question: &str, schema_text: &str) -> PipelineOutcome {
        let cache_key = format!(
            "graphrag_{}",
            sha256_hex(&format!("{question}{schema_text}"))
        );
        if let Some(cached) = self.cache.get(&cache_key).await {
            match serde_json::from_value::<PipelineOutcome>(cached) {
                Ok(outcome) => {
                    info!(question, "using cached pipeline outcome");
                    return outcome;
                }
                Err(e) => warn!(error = %e, "cached pipeline outcome unreadable, recomputing"),
            }
        }

        let context = match self.hybrid_retrieval(question, self.semantic_k).await {
            Ok(context) => context,
            Err(e) => {
                warn!(question, error = %e, "pipeline degraded");
                return PipelineOutcome::failed(question, e.to_string());
            }
        };

        let summary = self.summarize_context(&context);
        let prompt = self.generation_prompt(question, &context, &summary, schema_text);

        let outcome = PipelineOutcome {
            question: question.to_string(),
            entities: context.entities.clone(),
            retrieval_score: context.combined_relevance,
            context: Some(context),
            context_summary: summary,
            prompt,
            status: PipelineStatus::Success,
            error: None,
        };

        match serde_json::to_value(&outcome) {
            Ok(value) => {
                if let Err(e) = self.cache.set(&cache_key, value).await {
                    warn!(error = %e, "failed to cache pipeline outcome");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize pipeline outcome"),
        }

        info!(
            question,
            score = outcome.retrieval_score,
            "pipeline completed"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockGraphStore;
    use lodestone_llm::MockEmbeddingProvider;
    use std::time::Duration;

    struct FailingEmbeddings;

    #[async_trait::async_trait]
    impl lodestone_llm::EmbeddingProvider for FailingEmbeddings {
        async fn embed(&self, _text: &str) -> lodestone_llm::EmbeddingResult<Vec<f32>> {
            Err(lodestone_llm::EmbeddingError::Http(
                "simulated outage".to_string(),
            ))
        }

        fn provider_name(&self) -> &str {
            "Failing"
        }
    }

    async fn retriever_with(
        provider: Arc<dyn lodestone_llm::EmbeddingProvider>,
        store: MockGraphStore,
    ) -> (HybridRetriever, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(
            CacheStore::open(dir.path().join("cache.json"), Duration::from_secs(3600))
                .await
                .unwrap(),
        );
        let graph: Arc<dyn lodestone_core::GraphStore> = Arc::new(store);
        let index = Arc::new(EmbeddingIndex::new(
            provider,
            cache.clone(),
            graph.clone(),
            1000,
        ));
        let extractor = Arc::new(GraphContextExtractor::new(graph));
        (
            HybridRetriever::new(index, extractor, cache, 5, 2),
            dir,
        )
    }

    #[tokio::test]
    async fn entity_extraction_dedupes_and_caps() {
        let (retriever, _dir) =
            retriever_with(Arc::new(MockEmbeddingProvider::new()), MockGraphStore::new()).await;

        let entities =
            retriever.extract_entities("which MSI products did MSI make with Nvidia chips?");
        assert_eq!(entities, vec!["MSI", "Nvidia"]);

        // length filter drops 2-char tokens
        let entities = retriever.extract_entities("Is It On?");
        assert!(entities.is_empty());
    }

    #[tokio::test]
    async fn entity_extraction_is_locale_aware() {
        let (retriever, _dir) =
            retriever_with(Arc::new(MockEmbeddingProvider::new()), MockGraphStore::new()).await;
        let entities = retriever.extract_entities("Ürünleri Čelik markasından getir");
        assert_eq!(entities, vec!["Ürünleri", "Čelik"]);
    }

    #[tokio::test]
    async fn empty_context_scores_zero() {
        let (retriever, _dir) =
            retriever_with(Arc::new(MockEmbeddingProvider::new()), MockGraphStore::new()).await;
        let context = retriever.hybrid_retrieval("lowercase only", 5).await.unwrap();
        assert!(context.merged.is_empty());
        assert_eq!(context.combined_relevance, 0.0);
        assert_eq!(
            retriever.summarize_context(&context),
            "No specific context found"
        );
    }

    #[tokio::test]
    async fn pipeline_failure_is_a_degraded_outcome() {
        let (retriever, _dir) =
            retriever_with(Arc::new(FailingEmbeddings), MockGraphStore::new()).await;
        let outcome = retriever.full_pipeline("Any Question", "SCHEMA").await;
        assert_eq!(outcome.status, PipelineStatus::Failed);
        assert!(outcome.entities.is_empty());
        assert_eq!(outcome.retrieval_score, 0.0);
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn pipeline_outcome_is_cached_by_question_and_schema() {
        let store = MockGraphStore::new();
        let (retriever, _dir) =
            retriever_with(Arc::new(MockEmbeddingProvider::new()), store).await;

        let first = retriever.full_pipeline("What Brands exist?", "SCHEMA").await;
        assert_eq!(first.status, PipelineStatus::Success);
        let second = retriever.full_pipeline("What Brands exist?", "SCHEMA").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn prompt_contains_schema_question_and_contract() {
        let (retriever, _dir) =
            retriever_with(Arc::new(MockEmbeddingProvider::new()), MockGraphStore::new()).await;
        let context = RetrievalContext::default();
        let prompt =
            retriever.generation_prompt("the question", &context, "summary", "THE SCHEMA");
        assert!(prompt.starts_with("THE SCHEMA"));
        assert!(prompt.contains("\"the question\""));
        assert!(prompt.contains("\"cypher\""));
        assert!(prompt.contains("\"description\""));
    }
}
