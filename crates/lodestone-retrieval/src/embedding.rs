//! Embedding index: cached text embeddings and the bounded semantic scan.
//!
//! There is no vector index here. Search embeds a bounded sample of graph
//! nodes and scores them linearly against the query - the system's
//! scalability bottleneck by design, capped at [`EmbeddingIndex::scan_cap`]
//! nodes. Building anything smarter than the cap is an explicit non-goal.

use std::cmp::Ordering;
use std::sync::Arc;

use lodestone_cache::CacheStore;
use lodestone_core::{sha256_hex, GraphStore, GraphValue, SemanticMatch};
use lodestone_llm::{cosine_similarity, EmbeddingProvider};
use tracing::{debug, info, warn};

use crate::error::{RetrievalError, RetrievalResult};

/// Candidate scan: build one searchable string per node from its non-null
/// scalar properties. The LIMIT is formatted in from the configured cap.
const CANDIDATE_SCAN_QUERY: &str = r#"
MATCH (n)
WHERE any(prop IN keys(n) WHERE
    toString(n[prop]) <> '' AND
    toString(n[prop]) IS NOT NULL
)
WITH n,
     [prop IN keys(n) WHERE toString(n[prop]) <> '' |
      prop + ': ' + toString(n[prop])] AS text_parts,
     labels(n) AS node_labels
WITH n, node_labels,
     reduce(text = '', part IN text_parts | text + ' ' + part) AS searchable_text
WHERE size(trim(searchable_text)) > 5
RETURN elementId(n) AS id, node_labels, searchable_text,
       properties(n) AS all_properties
LIMIT {limit}
"#;

/// Text-to-vector provider with a persistent per-exact-text cache and a
/// bounded linear node scan.
pub struct EmbeddingIndex {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Arc<CacheStore>,
    graph: Arc<dyn GraphStore>,
    scan_cap: usize,
}

impl EmbeddingIndex {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        cache: Arc<CacheStore>,
        graph: Arc<dyn GraphStore>,
        scan_cap: usize,
    ) -> Self {
        Self {
            provider,
            cache,
            graph,
            scan_cap,
        }
    }

    /// Embed a text, consulting the persistent cache first. Cached vectors
    /// never expire on their own - the entry TTL is the store's, and the
    /// key is the exact text.
    pub async fn embed(&self, text: &str) -> RetrievalResult<Vec<f32>> {
        let key = format!("embedding_{}", sha256_hex(text));
        if let Some(cached) = self.cache.get(&key).await {
            if let Ok(vector) = serde_json::from_value::<Vec<f32>>(cached) {
                return Ok(vector);
            }
        }

        let vector = self
            .provider
            .embed(text)
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        match serde_json::to_value(&vector) {
            Ok(value) => {
                if let Err(e) = self.cache.set(&key, value).await {
                    warn!(error = %e, "failed to cache embedding");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize embedding"),
        }
        Ok(vector)
    }

    /// Cosine similarity; 0.0 for zero-norm vectors.
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> f64 {
        cosine_similarity(a, b)
    }

    /// Semantic search over a bounded sample of graph nodes.
    ///
    /// Fails only when the query itself cannot be embedded. A failing node
    /// scan degrades to an empty result, and nodes whose text cannot be
    /// embedded are skipped.
    pub async fn search(&self, text: &str, limit: usize) -> RetrievalResult<Vec<SemanticMatch>> {
        let query_vector = self.embed(text).await?;

        let scan = CANDIDATE_SCAN_QUERY.replace("{limit}", &self.scan_cap.to_string());
        let rows = match self.graph.query(&scan).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "candidate scan failed, semantic search degrades to empty");
                return Ok(Vec::new());
            }
        };

        let mut candidates = Vec::new();
        for row in &rows {
            let Some(node_text) = row.get("searchable_text").and_then(GraphValue::as_str) else {
                continue;
            };
            let node_vector = match self.embed(node_text).await {
                Ok(vector) => vector,
                Err(e) => {
                    debug!(error = %e, "skipping node that failed to embed");
                    continue;
                }
            };
            candidates.push(SemanticMatch {
                node_id: row
                    .get("id")
                    .and_then(GraphValue::as_str)
                    .unwrap_or_default()
                    .to_string(),
                labels: row
                    .get("node_labels")
                    .and_then(GraphValue::as_string_list)
                    .unwrap_or_default(),
                text: node_text.to_string(),
                properties: row
                    .get("all_properties")
                    .map(GraphValue::to_plain)
                    .unwrap_or(serde_json::Value::Null),
                similarity: cosine_similarity(&query_vector, &node_vector),
            });
        }

        candidates.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        candidates.truncate(limit);

        info!(
            scanned = rows.len(),
            returned = candidates.len(),
            "semantic search completed"
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{row, MockGraphStore};
    use lodestone_llm::MockEmbeddingProvider;
    use std::time::Duration;

    fn candidate(id: &str, text: &str) -> lodestone_core::GraphRow {
        row(vec![
            ("id", GraphValue::String(id.to_string())),
            (
                "node_labels",
                GraphValue::List(vec![GraphValue::String("Product".to_string())]),
            ),
            ("searchable_text", GraphValue::String(text.to_string())),
            ("all_properties", GraphValue::Map(Default::default())),
        ])
    }

    async fn index_with(store: MockGraphStore) -> (EmbeddingIndex, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(
            CacheStore::open(dir.path().join("cache.json"), Duration::from_secs(3600))
                .await
                .unwrap(),
        );
        let index = EmbeddingIndex::new(
            Arc::new(MockEmbeddingProvider::new()),
            cache,
            Arc::new(store),
            1000,
        );
        (index, dir)
    }

    #[tokio::test]
    async fn search_ranks_closer_text_first() {
        let store = MockGraphStore::new().on(
            "searchable_text",
            vec![
                candidate("1", "name: cheap mouse pad"),
                candidate("2", "name: msi graphics card brand: msi"),
            ],
        );
        let (index, _dir) = index_with(store).await;

        let matches = index.search("msi graphics card", 5).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].node_id, "2");
        assert!(matches[0].similarity >= matches[1].similarity);
    }

    #[tokio::test]
    async fn search_truncates_to_limit() {
        let store = MockGraphStore::new().on(
            "searchable_text",
            vec![
                candidate("1", "name: one"),
                candidate("2", "name: two"),
                candidate("3", "name: three"),
            ],
        );
        let (index, _dir) = index_with(store).await;
        let matches = index.search("one", 2).await.unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[tokio::test]
    async fn failing_scan_degrades_to_empty() {
        let (index, _dir) = index_with(MockGraphStore::failing()).await;
        let matches = index.search("anything", 5).await.unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn embed_is_cached_per_exact_text() {
        let (index, _dir) = index_with(MockGraphStore::new()).await;
        let first = index.embed("stable text").await.unwrap();
        let second = index.embed("stable text").await.unwrap();
        assert_eq!(first, second);
    }
}
