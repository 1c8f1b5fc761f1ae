//! The ask engine: one question in, one answered outcome out.
//!
//! Flow: schema text (cached digest or fresh introspection or fallback) ->
//! hybrid retrieval -> generation -> synthesis/validation -> read-only
//! execution -> answer composition -> history. No hot-path failure crashes
//! the request; every external-call site degrades into the outcome's
//! `error` tag.

use std::sync::Arc;

use lodestone_cache::{CacheStore, ConversationLog};
use lodestone_core::{CandidateQuery, GraphStore, PipelineStatus, SchemaDigest};
use lodestone_llm::{GenerationOptions, ProviderChain};
use lodestone_retrieval::{HybridRetriever, SchemaCache, SchemaIntrospector};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::answer::AnswerComposer;
use crate::render::render_schema_prompt;
use crate::synth::QuerySynthesizer;

const SYNTH_SYSTEM_PROMPT: &str = "You are a Cypher expert translating natural-language \
questions into read-only queries. Use the retrieval context. Never use LIMIT. Respond with \
valid JSON only.";

/// Everything `POST /ask` needs to report back.
#[derive(Debug, Clone, Serialize)]
pub struct AskOutcome {
    pub answer: String,
    pub cypher: Option<String>,
    pub results: Option<Vec<Vec<Value>>>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Orchestrates the full question-to-answer flow.
pub struct AskEngine {
    graph: Arc<dyn GraphStore>,
    retriever: Arc<HybridRetriever>,
    schema_cache: Arc<SchemaCache>,
    introspector: Arc<SchemaIntrospector>,
    chain: Arc<ProviderChain>,
    synthesizer: QuerySynthesizer,
    composer: AnswerComposer,
    cache: Arc<CacheStore>,
    history: Arc<ConversationLog>,
}

impl AskEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        graph: Arc<dyn GraphStore>,
        retriever: Arc<HybridRetriever>,
        schema_cache: Arc<SchemaCache>,
        introspector: Arc<SchemaIntrospector>,
        chain: Arc<ProviderChain>,
        cache: Arc<CacheStore>,
        history: Arc<ConversationLog>,
    ) -> Self {
        let composer = AnswerComposer::new(chain.clone());
        Self {
            graph,
            retriever,
            schema_cache,
            introspector,
            chain,
            synthesizer: QuerySynthesizer::new(),
            composer,
            cache,
            history,
        }
    }

    /// Current digest: fresh cache hit, else introspection (cached on
    /// success), else the stale digest if one exists.
    pub async fn current_digest(&self) -> Option<SchemaDigest> {
        if let Some(digest) = self.schema_cache.get().await {
            return Some(digest);
        }
        info!("schema cache expired or empty, introspecting");
        match self.introspector.introspect().await {
            Some(digest) => {
                self.schema_cache.set(digest.clone()).await;
                Some(digest)
            }
            None => {
                warn!("introspection failed, falling back to stale digest");
                self.schema_cache.get_stale().await
            }
        }
    }

    /// Re-introspect unconditionally and replace the cached digest.
    /// Returns false when introspection fails (the stale digest stays).
    pub async fn refresh_schema(&self) -> bool {
        match self.introspector.introspect().await {
            Some(digest) => {
                self.schema_cache.set(digest).await;
                true
            }
            None => false,
        }
    }

    /// Synthesize a validated query for the question, consulting the
    /// per-question cache first. Always yields an executable query.
    pub async fn synthesize_query(&self, question: &str) -> CandidateQuery {
        let cache_key = format!("cypher_{question}");
        if let Some(cached) = self.cache.get(&cache_key).await {
            if let Ok(candidate) = serde_json::from_value::<CandidateQuery>(cached) {
                info!(question, "using cached query");
                return candidate;
            }
        }

        let digest = self.current_digest().await;
        let schema_text = render_schema_prompt(digest.as_ref());

        let outcome = self.retriever.full_pipeline(question, &schema_text).await;
        let prompt = if outcome.status == PipelineStatus::Success && !outcome.prompt.is_empty() {
            outcome.prompt
        } else {
            // Degraded retrieval still gets a schema-grounded prompt.
            format!(
                r#"{schema_text}

TASK: Translate the user question into a single read-only Cypher query.
USER QUESTION: "{question}"

RESPONSE FORMAT (JSON only):
{{
  "cypher": "Cypher query using only MATCH and RETURN",
  "description": "short explanation"
}}
"#
            )
        };

        let response = self
            .chain
            .generate(&prompt, SYNTH_SYSTEM_PROMPT, &GenerationOptions::default())
            .await;
        let candidate = self.synthesizer.synthesize(response.as_deref());

        if candidate.valid {
            match serde_json::to_value(&candidate) {
                Ok(value) => {
                    if let Err(e) = self.cache.set(&cache_key, value).await {
                        warn!(error = %e, "failed to cache query");
                    }
                }
                Err(e) => warn!(error = %e, "failed to serialize query"),
            }
        }
        candidate
    }

    /// Answer one question end to end.
    pub async fn ask(&self, question: &str) -> AskOutcome {
        if !self.graph.is_available().await {
            warn!("graph store unavailable for question");
            return AskOutcome {
                answer: "Sorry, the database connection is currently unavailable. Please make \
sure the graph store is running and try again."
                    .to_string(),
                cypher: None,
                results: None,
                description: String::new(),
                error: Some("graph_unavailable".to_string()),
            };
        }

        let candidate = self.synthesize_query(question).await;
        info!(cypher = %candidate.cypher, "executing synthesized query");

        let (rows, exec_error) = match self.graph.query(&candidate.cypher).await {
            Ok(rows) => {
                let plain: Vec<Vec<Value>> = rows.iter().map(|row| row.to_plain()).collect();
                (Some(plain), None)
            }
            Err(e) => {
                warn!(error = %e, "query execution failed");
                (None, Some(e.to_string()))
            }
        };

        let result_rows = rows.clone().unwrap_or_default();
        let answer = self.compose_answer(question, &candidate.cypher, &result_rows).await;

        if let Err(e) = self.history.add(question, &answer).await {
            warn!(error = %e, "failed to record history turn");
        }

        AskOutcome {
            answer,
            cypher: Some(candidate.cypher),
            results: rows,
            description: candidate.description,
            error: exec_error,
        }
    }

    /// Compose (or re-use) the answer for a question/results pair.
    async fn compose_answer(
        &self,
        question: &str,
        cypher: &str,
        rows: &[Vec<Value>],
    ) -> String {
        let results_tag = serde_json::to_string(rows).unwrap_or_default();
        let cache_key = format!("answer_{question}_{results_tag}");
        if let Some(cached) = self.cache.get(&cache_key).await {
            if let Some(answer) = cached.as_str() {
                info!(question, "using cached answer");
                return answer.to_string();
            }
        }

        let history = self.history.all().await;
        let answer = self.composer.compose(question, cypher, rows, &history).await;

        // fallback apologies are transient; only real answers are cached
        if answer != crate::answer::FALLBACK_ANSWER {
            if let Err(e) = self
                .cache
                .set(&cache_key, Value::String(answer.clone()))
                .await
            {
                warn!(error = %e, "failed to cache answer");
            }
        }
        answer
    }

    /// Clear the persistent cache and the schema digest.
    pub async fn clear_caches(&self) -> bool {
        let cache_ok = match self.cache.clear().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to clear cache");
                false
            }
        };
        self.schema_cache.clear().await;
        cache_ok
    }

    /// Conversation history accessor for the HTTP surface.
    pub fn history(&self) -> &Arc<ConversationLog> {
        &self.history
    }

    /// Graph accessor for health probes.
    pub fn graph(&self) -> &Arc<dyn GraphStore> {
        &self.graph
    }
}
