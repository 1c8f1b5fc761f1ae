//! Conversion from neo4rs driver types to the core value model.

use std::collections::BTreeMap;

use lodestone_core::{GraphNode, GraphPath, GraphRelationship, GraphValue, QueryParam};
use neo4rs::BoltType;

/// Convert a driver node. Properties that fail to deserialize are stringified
/// rather than dropped, matching the fallback-to-string rule used everywhere
/// graph values cross into JSON.
pub(crate) fn node_to_value(node: &neo4rs::Node) -> GraphNode {
    let mut properties = BTreeMap::new();
    for key in node.keys() {
        let value = node
            .get::<serde_json::Value>(key)
            .map(GraphValue::from_json)
            .unwrap_or(GraphValue::Null);
        properties.insert(key.to_string(), value);
    }
    GraphNode {
        id: node.id().to_string(),
        labels: node.labels().iter().map(|l| l.to_string()).collect(),
        properties,
    }
}

pub(crate) fn relation_to_value(rel: &neo4rs::Relation) -> GraphRelationship {
    let mut properties = BTreeMap::new();
    for key in rel.keys() {
        let value = rel
            .get::<serde_json::Value>(key)
            .map(GraphValue::from_json)
            .unwrap_or(GraphValue::Null);
        properties.insert(key.to_string(), value);
    }
    GraphRelationship {
        rel_type: rel.typ().to_string(),
        properties,
        start_node: rel.start_node_id().to_string(),
        end_node: rel.end_node_id().to_string(),
    }
}

pub(crate) fn path_to_value(path: &neo4rs::Path) -> GraphPath {
    GraphPath {
        nodes: path.nodes().iter().map(node_to_value).collect(),
        relationships: path.rels().iter().map(relation_to_value).collect(),
    }
}

/// Map a core query parameter onto a bolt value.
pub(crate) fn param_to_bolt(param: QueryParam) -> BoltType {
    match param {
        QueryParam::String(s) => s.into(),
        QueryParam::Int(i) => i.into(),
        QueryParam::Float(f) => f.into(),
        QueryParam::Bool(b) => b.into(),
        QueryParam::StringList(items) => items.into(),
    }
}
