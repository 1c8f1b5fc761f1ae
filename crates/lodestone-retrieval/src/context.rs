//! Entity-seeded graph context extraction.
//!
//! Entities are noisy heuristic tokens, not exact keys, so start nodes are
//! matched by bidirectional substring containment over every property
//! value. The cross-property scans are O(property-count squared) per
//! candidate pair and bounded only by the fixed output caps (20 connection
//! records, 10 similar-entity records per start node) - preserved exactly,
//! no pagination.

use std::sync::Arc;

use lodestone_core::{
    CentralEntity, ConnectionRecord, EntityContext, GraphStore, GraphValue, QueryParam,
    SharedValue, SimilarEntity,
};
use serde_json::{json, Value};
use tracing::{info, warn};

/// Start-node discovery, neighborhood expansion and relevance scoring in
/// one pass. Connected and similar nodes are projected to explicit
/// label/property maps; `{depth}` is formatted in because pattern lengths
/// cannot be parameterized.
const ENTITY_CONTEXT_QUERY: &str = r#"
MATCH (start)
WHERE any(prop IN keys(start) WHERE
    any(entity IN $entities WHERE
        toString(start[prop]) CONTAINS entity OR
        entity CONTAINS toString(start[prop])
    )
)
OPTIONAL MATCH path = (start)-[r*1..{depth}]-(connected)
WITH start, connected, r, path,
     reduce(score = 0, entity IN $entities |
        score + reduce(prop_score = 0, prop IN keys(start) |
            prop_score + CASE
                WHEN toString(start[prop]) CONTAINS entity THEN 10
                WHEN entity CONTAINS toString(start[prop]) THEN 5
                ELSE 0
            END
        )
     ) AS relevance_score
WITH start, relevance_score,
     [entry IN collect({
         labels: labels(connected),
         properties: properties(connected),
         relationship_types: [rel IN r | type(rel)],
         path_length: length(path)
     }) WHERE entry.path_length IS NOT NULL][..20] AS connections
OPTIONAL MATCH (similar)
WHERE similar <> start
AND any(start_prop IN keys(start) WHERE
    any(sim_prop IN keys(similar) WHERE
        toString(start[start_prop]) = toString(similar[sim_prop]) AND
        toString(start[start_prop]) <> '' AND
        toString(start[start_prop]) IS NOT NULL
    )
)
WITH start, relevance_score, connections,
     [entry IN collect({
         labels: labels(similar),
         properties: properties(similar),
         shared_values: [prop IN keys(start) WHERE
             any(sim_prop IN keys(similar) WHERE
                 toString(start[prop]) = toString(similar[sim_prop])
             ) | { property: prop, value: toString(start[prop]) }
         ][..5]
     }) WHERE entry.properties IS NOT NULL][..10] AS similar_entities
RETURN start, relevance_score, connections, similar_entities
"#;

const NEIGHBORHOOD_QUERY: &str = r#"
MATCH (center) WHERE elementId(center) = $node_id
MATCH (center)-[r*1..{radius}]-(neighbor)
RETURN center,
       collect(DISTINCT { labels: labels(neighbor), properties: properties(neighbor) }) AS neighbors,
       [(center)-[r1]-(n1) | {
           relationship_type: type(r1),
           neighbor_labels: labels(n1),
           properties: keys(r1)
       }] AS patterns
"#;

const CONNECTION_PATHS_QUERY: &str = r#"
MATCH path = shortestPath((start)-[*1..{max_depth}]-(end))
WHERE start.name = $start_name AND end.name = $end_name
RETURN {
    length: length(path),
    nodes: [n IN nodes(path) | { labels: labels(n), properties: properties(n) }],
    relationships: [r IN relationships(path) | { type: type(r), properties: properties(r) }]
} AS connection_path
LIMIT 5
"#;

/// Best-effort graph-structural context. Every failure returns an empty or
/// degenerate structure; errors never propagate past this boundary.
pub struct GraphContextExtractor {
    graph: Arc<dyn GraphStore>,
}

impl GraphContextExtractor {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }

    /// Expand context around every node matching one of the entity strings.
    pub async fn extract_entity_context(
        &self,
        entities: &[String],
        depth: u32,
    ) -> EntityContext {
        if entities.is_empty() {
            return EntityContext::degenerate(entities);
        }

        let query = ENTITY_CONTEXT_QUERY.replace("{depth}", &depth.max(1).to_string());
        let params = vec![(
            "entities".to_string(),
            QueryParam::StringList(entities.to_vec()),
        )];

        let rows = match self.graph.run(&query, params).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "entity context extraction failed");
                return EntityContext::degenerate(entities);
            }
        };

        let central_entities: Vec<CentralEntity> = rows
            .iter()
            .filter_map(|row| {
                let node = row.get("start")?.to_plain();
                let relevance_score = row
                    .get("relevance_score")
                    .and_then(GraphValue::as_i64)
                    .unwrap_or(0);
                let connections = row
                    .get("connections")
                    .map(Self::parse_connections)
                    .unwrap_or_default();
                let similar = row
                    .get("similar_entities")
                    .map(Self::parse_similar)
                    .unwrap_or_default();
                Some(CentralEntity {
                    node,
                    relevance_score,
                    connections,
                    similar,
                })
            })
            .collect();

        info!(
            entities = entities.len(),
            central = central_entities.len(),
            depth,
            "entity context extracted"
        );

        EntityContext {
            central_entities,
            query_entities: entities.to_vec(),
        }
    }

    /// Neighborhood around one identified node, plain JSON. Empty object on
    /// any failure.
    pub async fn get_node_neighborhood(&self, node_id: &str, radius: u32) -> Value {
        let query = NEIGHBORHOOD_QUERY.replace("{radius}", &radius.max(1).to_string());
        let params = vec![(
            "node_id".to_string(),
            QueryParam::String(node_id.to_string()),
        )];
        match self.graph.run(&query, params).await {
            Ok(rows) => rows
                .first()
                .map(|row| {
                    json!({
                        "center": row.get("center").map(GraphValue::to_plain),
                        "neighbors": row.get("neighbors").map(GraphValue::to_plain),
                        "patterns": row.get("patterns").map(GraphValue::to_plain),
                    })
                })
                .unwrap_or_else(|| json!({})),
            Err(e) => {
                warn!(node_id, error = %e, "neighborhood extraction failed");
                json!({})
            }
        }
    }

    /// Shortest connection paths between two name-matched nodes, at most 5.
    /// Empty on any failure.
    pub async fn find_connection_paths(
        &self,
        start_name: &str,
        end_name: &str,
        max_depth: u32,
    ) -> Vec<Value> {
        let query = CONNECTION_PATHS_QUERY.replace("{max_depth}", &max_depth.max(1).to_string());
        let params = vec![
            (
                "start_name".to_string(),
                QueryParam::String(start_name.to_string()),
            ),
            (
                "end_name".to_string(),
                QueryParam::String(end_name.to_string()),
            ),
        ];
        match self.graph.run(&query, params).await {
            Ok(rows) => rows
                .iter()
                .filter_map(|row| row.get("connection_path").map(GraphValue::to_plain))
                .collect(),
            Err(e) => {
                warn!(start_name, end_name, error = %e, "connection path search failed");
                Vec::new()
            }
        }
    }

    fn parse_connections(value: &GraphValue) -> Vec<ConnectionRecord> {
        let Value::Array(entries) = value.to_plain() else {
            return Vec::new();
        };
        entries
            .into_iter()
            .filter_map(|entry| {
                let path_length = entry.get("path_length")?.as_i64()?;
                Some(ConnectionRecord {
                    node: json!({
                        "labels": entry.get("labels").cloned().unwrap_or(Value::Null),
                        "properties": entry.get("properties").cloned().unwrap_or(Value::Null),
                    }),
                    relationship_types: entry
                        .get("relationship_types")
                        .and_then(Value::as_array)
                        .map(|types| {
                            types
                                .iter()
                                .filter_map(|t| t.as_str().map(str::to_string))
                                .collect()
                        })
                        .unwrap_or_default(),
                    path_length,
                })
            })
            .collect()
    }

    fn parse_similar(value: &GraphValue) -> Vec<SimilarEntity> {
        let Value::Array(entries) = value.to_plain() else {
            return Vec::new();
        };
        entries
            .into_iter()
            .filter_map(|entry| {
                if entry.get("properties").map(Value::is_null).unwrap_or(true) {
                    return None;
                }
                let shared_values = entry
                    .get("shared_values")
                    .and_then(Value::as_array)
                    .map(|shared| {
                        shared
                            .iter()
                            .filter_map(|sv| {
                                Some(SharedValue {
                                    property: sv.get("property")?.as_str()?.to_string(),
                                    value: sv.get("value")?.as_str()?.to_string(),
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Some(SimilarEntity {
                    node: json!({
                        "labels": entry.get("labels").cloned().unwrap_or(Value::Null),
                        "properties": entry.get("properties").cloned().unwrap_or(Value::Null),
                    }),
                    shared_values,
                })
            })
            .collect()
    }
}
