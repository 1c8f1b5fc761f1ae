//! Property-graph value model and the graph store seam.
//!
//! Nodes and edges are ordered property bags, not fixed records: the schema
//! is discovered at runtime, so nothing here assumes a particular label or
//! property set. This module is pure data - no I/O, no driver types.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::GraphResult;

/// A node as returned by the graph store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Store-assigned element id.
    pub id: String,
    /// Labels, in store order.
    pub labels: Vec<String>,
    /// Property bag.
    pub properties: BTreeMap<String, GraphValue>,
}

/// A relationship as returned by the graph store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRelationship {
    /// Relationship type name.
    pub rel_type: String,
    /// Property bag.
    pub properties: BTreeMap<String, GraphValue>,
    /// Element id of the start node.
    pub start_node: String,
    /// Element id of the end node.
    pub end_node: String,
}

/// A path as returned by the graph store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPath {
    /// Nodes along the path, start first.
    pub nodes: Vec<GraphNode>,
    /// Relationships along the path.
    pub relationships: Vec<GraphRelationship>,
}

/// A single value in a result row.
///
/// Temporal values are unwrapped to primitives (ISO-8601 strings) at the
/// driver boundary, so no temporal variant exists here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<GraphValue>),
    Map(BTreeMap<String, GraphValue>),
    Node(GraphNode),
    Relationship(GraphRelationship),
    Path(GraphPath),
}

impl GraphValue {
    /// Convert to the plain JSON form used in prompts, caches and API
    /// responses: node becomes `{labels, properties, id}`, relationship
    /// becomes `{type, properties, start_node, end_node}`, path becomes
    /// `{nodes, relationships, length}`.
    pub fn to_plain(&self) -> Value {
        match self {
            GraphValue::Null => Value::Null,
            GraphValue::Bool(b) => json!(b),
            GraphValue::Int(i) => json!(i),
            GraphValue::Float(f) => json!(f),
            GraphValue::String(s) => json!(s),
            GraphValue::List(items) => {
                Value::Array(items.iter().map(GraphValue::to_plain).collect())
            }
            GraphValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_plain()))
                    .collect(),
            ),
            GraphValue::Node(node) => node.to_plain(),
            GraphValue::Relationship(rel) => rel.to_plain(),
            GraphValue::Path(path) => path.to_plain(),
        }
    }

    /// Lift a plain JSON value into a `GraphValue`. Objects become maps;
    /// graph-native variants never come back from this direction.
    pub fn from_json(value: Value) -> GraphValue {
        match value {
            Value::Null => GraphValue::Null,
            Value::Bool(b) => GraphValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    GraphValue::Int(i)
                } else {
                    GraphValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => GraphValue::String(s),
            Value::Array(items) => {
                GraphValue::List(items.into_iter().map(GraphValue::from_json).collect())
            }
            Value::Object(map) => GraphValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, GraphValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// The value as a string slice, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            GraphValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The value as an integer, if it is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GraphValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The value as a float, widening integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GraphValue::Float(f) => Some(*f),
            GraphValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The value as a list of strings, skipping non-string items.
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        match self {
            GraphValue::List(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => None,
        }
    }
}

impl GraphNode {
    /// Plain JSON form: `{labels, properties, id}`.
    pub fn to_plain(&self) -> Value {
        json!({
            "labels": self.labels,
            "properties": self
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.to_plain()))
                .collect::<serde_json::Map<String, Value>>(),
            "id": self.id,
        })
    }
}

impl GraphRelationship {
    /// Plain JSON form: `{type, properties, start_node, end_node}`.
    pub fn to_plain(&self) -> Value {
        json!({
            "type": self.rel_type,
            "properties": self
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.to_plain()))
                .collect::<serde_json::Map<String, Value>>(),
            "start_node": self.start_node,
            "end_node": self.end_node,
        })
    }
}

impl GraphPath {
    /// Plain JSON form: `{nodes, relationships, length}`. Length is the
    /// relationship count, matching hop semantics.
    pub fn to_plain(&self) -> Value {
        json!({
            "nodes": self.nodes.iter().map(GraphNode::to_plain).collect::<Vec<_>>(),
            "relationships": self
                .relationships
                .iter()
                .map(GraphRelationship::to_plain)
                .collect::<Vec<_>>(),
            "length": self.relationships.len(),
        })
    }
}

/// One result row: column names plus values in the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRow {
    pub columns: Vec<String>,
    pub values: Vec<GraphValue>,
}

impl GraphRow {
    /// Look up a value by column name.
    pub fn get(&self, column: &str) -> Option<&GraphValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    /// Plain JSON forms of the row values, in column order.
    pub fn to_plain(&self) -> Vec<Value> {
        self.values.iter().map(GraphValue::to_plain).collect()
    }
}

/// A parameter passed alongside a query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    StringList(Vec<String>),
}

/// Read-only pattern-matching access to a property graph.
///
/// Rows are sequences of heterogeneous typed values. Implementations must
/// not mutate the store; query safety is enforced upstream by the
/// synthesizer's validation layer.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Execute a query with parameters and collect all result rows.
    async fn run(&self, cypher: &str, params: Vec<(String, QueryParam)>)
        -> GraphResult<Vec<GraphRow>>;

    /// Execute a parameterless query.
    async fn query(&self, cypher: &str) -> GraphResult<Vec<GraphRow>> {
        self.run(cypher, Vec::new()).await
    }

    /// Whether the store currently answers a trivial probe query.
    async fn is_available(&self) -> bool {
        self.query("MATCH (n) RETURN count(n) AS total LIMIT 1")
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_node() -> GraphNode {
        let mut props = BTreeMap::new();
        props.insert("name".to_string(), GraphValue::String("MSI".to_string()));
        props.insert("founded".to_string(), GraphValue::Int(1986));
        GraphNode {
            id: "4:abc:17".to_string(),
            labels: vec!["Brand".to_string()],
            properties: props,
        }
    }

    #[test]
    fn node_plain_form_has_labels_properties_id() {
        let plain = sample_node().to_plain();
        assert_eq!(plain["labels"][0], "Brand");
        assert_eq!(plain["properties"]["name"], "MSI");
        assert_eq!(plain["properties"]["founded"], 1986);
        assert_eq!(plain["id"], "4:abc:17");
    }

    #[test]
    fn path_length_is_relationship_count() {
        let node = sample_node();
        let rel = GraphRelationship {
            rel_type: "MADE_BY".to_string(),
            properties: BTreeMap::new(),
            start_node: "a".to_string(),
            end_node: "b".to_string(),
        };
        let path = GraphPath {
            nodes: vec![node.clone(), node],
            relationships: vec![rel],
        };
        assert_eq!(path.to_plain()["length"], 1);
    }

    #[test]
    fn row_lookup_by_column() {
        let row = GraphRow {
            columns: vec!["label".to_string(), "count".to_string()],
            values: vec![GraphValue::String("Product".to_string()), GraphValue::Int(42)],
        };
        assert_eq!(row.get("count").and_then(GraphValue::as_i64), Some(42));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn from_json_round_trips_scalars() {
        let value = GraphValue::from_json(serde_json::json!({"a": [1, "x", null]}));
        match value {
            GraphValue::Map(map) => {
                assert!(matches!(map["a"], GraphValue::List(_)));
            }
            other => panic!("expected map, got {other:?}"),
        }
    }
}
