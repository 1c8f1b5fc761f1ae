//! Retrieval context and pipeline outcome types.
//!
//! A [`RetrievalContext`] is constructed fresh per request and dropped with
//! it; only the final [`PipelineOutcome`] may be cached, keyed by a hash of
//! question plus schema text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One semantically similar node, found by the embedding scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticMatch {
    /// Store element id of the node.
    pub node_id: String,
    pub labels: Vec<String>,
    /// The synthetic searchable text the node was scored on.
    pub text: String,
    /// Full property bag, plain JSON.
    pub properties: Value,
    pub similarity: f64,
}

/// A node connected to a central entity, with the relationship chain that
/// reaches it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Connected node, plain JSON form.
    pub node: Value,
    /// Relationship type names along the path, start-side first.
    pub relationship_types: Vec<String>,
    pub path_length: i64,
}

/// A property value shared between a central entity and a similar node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedValue {
    pub property: String,
    pub value: String,
}

/// A node sharing at least one stringified property value with a central
/// entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarEntity {
    /// Similar node, plain JSON form.
    pub node: Value,
    /// Up to 5 shared property/value pairs.
    pub shared_values: Vec<SharedValue>,
}

/// One entity-matched start node with its expanded neighborhood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralEntity {
    /// The matched node, plain JSON form.
    pub node: Value,
    /// +10 per direct containment match, +5 per reverse containment.
    pub relevance_score: i64,
    /// Capped at 20 records.
    pub connections: Vec<ConnectionRecord>,
    /// Capped at 10 records.
    pub similar: Vec<SimilarEntity>,
}

/// Graph-structural context for a set of extracted entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityContext {
    pub central_entities: Vec<CentralEntity>,
    /// The entity strings the extraction was seeded with.
    pub query_entities: Vec<String>,
}

impl EntityContext {
    /// Degenerate context carrying only the seed entities, used on every
    /// extraction failure.
    pub fn degenerate(entities: &[String]) -> Self {
        Self {
            central_entities: Vec::new(),
            query_entities: entities.to_vec(),
        }
    }
}

/// Where a merged context entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextSource {
    Semantic,
    Graph,
}

/// One entry in the merged context, tagged with its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// The matched entity, plain JSON form.
    pub entity: Value,
    /// Native similarity for semantic entries; a fixed default for graph
    /// entries, which carry no native score.
    pub similarity: f64,
    pub source: ContextSource,
}

/// The merged hybrid-retrieval context for one question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalContext {
    /// Extracted entity strings, deduplicated, at most 10.
    pub entities: Vec<String>,
    /// Ordered by similarity, descending.
    pub semantic_matches: Vec<SemanticMatch>,
    pub graph_context: EntityContext,
    pub merged: Vec<ContextEntry>,
    /// Arithmetic mean over merged entries, 0.0 if none.
    pub combined_relevance: f64,
}

/// A generated query candidate after cleaning, repair and validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateQuery {
    pub cypher: String,
    pub description: String,
    pub valid: bool,
}

/// Pipeline completion status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Success,
    Failed,
}

/// The cacheable result of one full-pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub question: String,
    pub entities: Vec<String>,
    pub context: Option<RetrievalContext>,
    pub context_summary: String,
    /// The fully rendered generation prompt, empty on failure.
    pub prompt: String,
    pub retrieval_score: f64,
    pub status: PipelineStatus,
    pub error: Option<String>,
}

impl PipelineOutcome {
    /// A well-formed degraded outcome. Never carries partial context: a
    /// failed pipeline reports empty entities and a zero score.
    pub fn failed(question: &str, error: String) -> Self {
        Self {
            question: question.to_string(),
            entities: Vec::new(),
            context: None,
            context_summary: format!("Pipeline failed: {error}"),
            prompt: String::new(),
            retrieval_score: 0.0,
            status: PipelineStatus::Failed,
            error: Some(error),
        }
    }
}

/// One question/answer exchange, retained in a bounded most-recent window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_is_well_formed() {
        let outcome = PipelineOutcome::failed("why", "model down".to_string());
        assert_eq!(outcome.status, PipelineStatus::Failed);
        assert!(outcome.entities.is_empty());
        assert_eq!(outcome.retrieval_score, 0.0);
        assert!(outcome.context_summary.contains("model down"));
        assert!(outcome.prompt.is_empty());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&PipelineStatus::Success).unwrap(),
            "\"success\""
        );
        assert_eq!(
            serde_json::to_string(&PipelineStatus::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn empty_context_defaults_to_zero_relevance() {
        let ctx = RetrievalContext::default();
        assert_eq!(ctx.combined_relevance, 0.0);
        assert!(ctx.merged.is_empty());
    }
}
