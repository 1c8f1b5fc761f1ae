//! Runtime-discovered schema digest.
//!
//! A [`SchemaDigest`] is a structured snapshot of the graph's node and
//! relationship types with sampled property values. It is built by the
//! introspector, owned by the schema cache, and immutable once built - a
//! stale digest may still be served until the cache's TTL boundary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One node type: label, count, property-name union, one sampled node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTypeInfo {
    pub label: String,
    pub count: i64,
    /// Union of property names seen across nodes with this label.
    pub properties: Vec<String>,
    /// Properties of one representative node, plain JSON.
    pub sample_properties: Value,
}

/// One relationship type, same shape as [`NodeTypeInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelTypeInfo {
    pub rel_type: String,
    pub count: i64,
    pub properties: Vec<String>,
    pub sample_properties: Value,
}

/// One `(fromLabel)-[relType]->(toLabel)` pattern with its occurrence count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionPattern {
    pub from_label: String,
    pub rel_type: String,
    pub to_label: String,
    pub count: i64,
}

/// Sampled values for one property of one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySample {
    /// Up to 3 distinct non-null values.
    pub sample_values: Vec<Value>,
    /// How many nodes carry this property.
    pub total_count: i64,
}

/// Structured snapshot of the graph schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDigest {
    pub nodes: Vec<NodeTypeInfo>,
    pub relationships: Vec<RelTypeInfo>,
    /// Top 50 connection patterns by count.
    pub connection_patterns: Vec<ConnectionPattern>,
    /// label -> property -> sampled values.
    pub property_samples: BTreeMap<String, BTreeMap<String, PropertySample>>,
    pub total_nodes: i64,
    pub total_relationships: i64,
    pub captured_at: DateTime<Utc>,
}

impl SchemaDigest {
    /// An empty digest, used only as a degenerate placeholder in tests.
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            relationships: Vec::new(),
            connection_patterns: Vec::new(),
            property_samples: BTreeMap::new(),
            total_nodes: 0,
            total_relationships: 0,
            captured_at: Utc::now(),
        }
    }

    /// Short human summary, used by the health endpoint.
    pub fn summary(&self) -> String {
        format!(
            "{} node types, {} relationship types, {} nodes, {} relationships",
            self.nodes.len(),
            self.relationships.len(),
            self.total_nodes,
            self.total_relationships
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_serde_round_trip() {
        let mut samples = BTreeMap::new();
        let mut props = BTreeMap::new();
        props.insert(
            "brand".to_string(),
            PropertySample {
                sample_values: vec![Value::String("MSI".into())],
                total_count: 12,
            },
        );
        samples.insert("Product".to_string(), props);

        let digest = SchemaDigest {
            nodes: vec![NodeTypeInfo {
                label: "Product".to_string(),
                count: 12,
                properties: vec!["brand".to_string(), "name".to_string()],
                sample_properties: serde_json::json!({"brand": "MSI"}),
            }],
            relationships: Vec::new(),
            connection_patterns: Vec::new(),
            property_samples: samples,
            total_nodes: 12,
            total_relationships: 0,
            captured_at: Utc::now(),
        };

        let text = serde_json::to_string(&digest).unwrap();
        let back: SchemaDigest = serde_json::from_str(&text).unwrap();
        assert_eq!(back, digest);
        assert!(back.summary().contains("1 node types"));
    }
}
