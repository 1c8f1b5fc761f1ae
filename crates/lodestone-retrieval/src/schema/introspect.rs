//! Live schema introspection.
//!
//! Four read-only discovery queries build a [`SchemaDigest`]: node types,
//! relationship types, connection patterns and property value samples.
//! Nothing here is hardcoded to a label or property name - the schema is
//! whatever the graph says it is.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use lodestone_core::{
    ConnectionPattern, GraphRow, GraphStore, GraphValue, NodeTypeInfo, PropertySample,
    RelTypeInfo, SchemaDigest,
};
use tracing::{info, warn};

const NODE_TYPES_QUERY: &str = r#"
MATCH (n)
WITH labels(n)[0] AS node_label, collect(keys(n)) AS all_keys, count(n) AS node_count,
     collect(n)[0] AS sample_node
WITH node_label, node_count, sample_node,
     reduce(unique_keys = [], key_set IN all_keys |
            unique_keys + [k IN key_set WHERE NOT k IN unique_keys]) AS unique_properties
RETURN node_label, node_count, unique_properties,
       properties(sample_node) AS sample_properties
ORDER BY node_label
"#;

const REL_TYPES_QUERY: &str = r#"
MATCH ()-[r]->()
WITH type(r) AS rel_type, collect(keys(r)) AS all_keys, count(r) AS rel_count,
     collect(r)[0] AS sample_rel
WITH rel_type, rel_count, sample_rel,
     reduce(unique_keys = [], key_set IN all_keys |
            unique_keys + [k IN key_set WHERE NOT k IN unique_keys]) AS unique_properties
RETURN rel_type, rel_count, unique_properties,
       properties(sample_rel) AS sample_properties
ORDER BY rel_type
"#;

const CONNECTION_PATTERNS_QUERY: &str = r#"
MATCH (n1)-[r]->(n2)
WITH labels(n1)[0] AS from_label, type(r) AS rel_type, labels(n2)[0] AS to_label,
     count(*) AS connection_count
RETURN from_label, rel_type, to_label, connection_count
ORDER BY connection_count DESC
LIMIT 50
"#;

const PROPERTY_SAMPLES_QUERY: &str = r#"
MATCH (n)
WITH labels(n)[0] AS node_type, keys(n) AS props, n
UNWIND props AS prop_name
WITH node_type, prop_name, n[prop_name] AS prop_value
WHERE prop_value IS NOT NULL
WITH node_type, prop_name,
     collect(DISTINCT prop_value)[0..3] AS sample_values, count(*) AS total_count
RETURN node_type, prop_name, sample_values, total_count
ORDER BY node_type, prop_name
"#;

/// Builds schema digests by interrogating the live graph.
pub struct SchemaIntrospector {
    graph: Arc<dyn GraphStore>,
}

impl SchemaIntrospector {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }

    /// Run the discovery queries and assemble a digest. Any query failure
    /// yields `None`; the caller falls back to a possibly-stale cached
    /// digest or the static fallback prompt.
    pub async fn introspect(&self) -> Option<SchemaDigest> {
        let node_rows = self.discover(NODE_TYPES_QUERY, "node types").await?;
        let rel_rows = self.discover(REL_TYPES_QUERY, "relationship types").await?;
        let pattern_rows = self
            .discover(CONNECTION_PATTERNS_QUERY, "connection patterns")
            .await?;
        let sample_rows = self
            .discover(PROPERTY_SAMPLES_QUERY, "property samples")
            .await?;

        let nodes: Vec<NodeTypeInfo> = node_rows
            .iter()
            .filter_map(|row| {
                Some(NodeTypeInfo {
                    label: row.get("node_label")?.as_str()?.to_string(),
                    count: row.get("node_count")?.as_i64()?,
                    properties: row.get("unique_properties")?.as_string_list()?,
                    sample_properties: row
                        .get("sample_properties")
                        .map(GraphValue::to_plain)
                        .unwrap_or(serde_json::Value::Null),
                })
            })
            .collect();

        let relationships: Vec<RelTypeInfo> = rel_rows
            .iter()
            .filter_map(|row| {
                Some(RelTypeInfo {
                    rel_type: row.get("rel_type")?.as_str()?.to_string(),
                    count: row.get("rel_count")?.as_i64()?,
                    properties: row.get("unique_properties")?.as_string_list()?,
                    sample_properties: row
                        .get("sample_properties")
                        .map(GraphValue::to_plain)
                        .unwrap_or(serde_json::Value::Null),
                })
            })
            .collect();

        let connection_patterns: Vec<ConnectionPattern> = pattern_rows
            .iter()
            .filter_map(|row| {
                Some(ConnectionPattern {
                    from_label: row.get("from_label")?.as_str()?.to_string(),
                    rel_type: row.get("rel_type")?.as_str()?.to_string(),
                    to_label: row.get("to_label")?.as_str()?.to_string(),
                    count: row.get("connection_count")?.as_i64()?,
                })
            })
            .collect();

        let property_samples = Self::collect_property_samples(&sample_rows);

        let total_nodes = nodes.iter().map(|n| n.count).sum();
        let total_relationships = relationships.iter().map(|r| r.count).sum();

        info!(
            node_types = nodes.len(),
            relationship_types = relationships.len(),
            patterns = connection_patterns.len(),
            "schema introspection completed"
        );

        Some(SchemaDigest {
            nodes,
            relationships,
            connection_patterns,
            property_samples,
            total_nodes,
            total_relationships,
            captured_at: Utc::now(),
        })
    }

    async fn discover(&self, query: &str, what: &str) -> Option<Vec<GraphRow>> {
        match self.graph.query(query).await {
            Ok(rows) => Some(rows),
            Err(e) => {
                warn!(what, error = %e, "schema discovery query failed");
                None
            }
        }
    }

    fn collect_property_samples(
        rows: &[GraphRow],
    ) -> BTreeMap<String, BTreeMap<String, PropertySample>> {
        let mut samples: BTreeMap<String, BTreeMap<String, PropertySample>> = BTreeMap::new();
        for row in rows {
            let (Some(node_type), Some(prop_name), Some(total_count)) = (
                row.get("node_type").and_then(GraphValue::as_str),
                row.get("prop_name").and_then(GraphValue::as_str),
                row.get("total_count").and_then(GraphValue::as_i64),
            ) else {
                continue;
            };
            let sample_values = match row.get("sample_values") {
                Some(GraphValue::List(items)) => {
                    items.iter().map(GraphValue::to_plain).collect()
                }
                Some(other) => vec![other.to_plain()],
                None => Vec::new(),
            };
            samples.entry(node_type.to_string()).or_default().insert(
                prop_name.to_string(),
                PropertySample {
                    sample_values,
                    total_count,
                },
            );
        }
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{row, MockGraphStore};
    use lodestone_core::GraphValue;

    fn node_row(label: &str, count: i64) -> GraphRow {
        row(vec![
            ("node_label", GraphValue::String(label.to_string())),
            ("node_count", GraphValue::Int(count)),
            (
                "unique_properties",
                GraphValue::List(vec![GraphValue::String("name".to_string())]),
            ),
            (
                "sample_properties",
                GraphValue::Map(
                    [("name".to_string(), GraphValue::String("sample".to_string()))]
                        .into_iter()
                        .collect(),
                ),
            ),
        ])
    }

    #[tokio::test]
    async fn introspect_assembles_digest_with_totals() {
        let store = MockGraphStore::new()
            .on("labels(n)[0] AS node_label", vec![
                node_row("Brand", 3),
                node_row("Product", 12),
            ])
            .on("sample_rel", vec![row(vec![
                ("rel_type", GraphValue::String("MADE_BY".to_string())),
                ("rel_count", GraphValue::Int(12)),
                ("unique_properties", GraphValue::List(Vec::new())),
                ("sample_properties", GraphValue::Map(Default::default())),
            ])])
            .on("connection_count DESC", vec![row(vec![
                ("from_label", GraphValue::String("Product".to_string())),
                ("rel_type", GraphValue::String("MADE_BY".to_string())),
                ("to_label", GraphValue::String("Brand".to_string())),
                ("connection_count", GraphValue::Int(12)),
            ])])
            .on("UNWIND props AS prop_name", vec![row(vec![
                ("node_type", GraphValue::String("Product".to_string())),
                ("prop_name", GraphValue::String("brand".to_string())),
                (
                    "sample_values",
                    GraphValue::List(vec![GraphValue::String("MSI".to_string())]),
                ),
                ("total_count", GraphValue::Int(12)),
            ])]);

        let introspector = SchemaIntrospector::new(std::sync::Arc::new(store));
        let digest = introspector.introspect().await.unwrap();

        assert_eq!(digest.nodes.len(), 2);
        assert_eq!(digest.total_nodes, 15);
        assert_eq!(digest.total_relationships, 12);
        assert_eq!(digest.connection_patterns[0].rel_type, "MADE_BY");
        assert_eq!(
            digest.property_samples["Product"]["brand"].total_count,
            12
        );
    }

    #[tokio::test]
    async fn any_query_failure_yields_none() {
        let store = MockGraphStore::failing();
        let introspector = SchemaIntrospector::new(std::sync::Arc::new(store));
        assert!(introspector.introspect().await.is_none());
    }
}
