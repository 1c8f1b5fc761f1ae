//! Neo4j-backed [`GraphStore`] implementation.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use lodestone_core::{GraphError, GraphResult, GraphRow, GraphStore, GraphValue, QueryParam};
use neo4rs::{query, Graph};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::convert::{node_to_value, param_to_bolt, path_to_value, relation_to_value};

/// Read-only Neo4j client.
///
/// The connection is established lazily and re-attempted per call when the
/// store was unreachable at startup - an unreachable store is a degraded
/// state, not a fatal one. Only missing credentials are fatal, and that is
/// enforced upstream by configuration validation.
pub struct Neo4jStore {
    uri: String,
    user: String,
    password: String,
    retries: u32,
    graph: RwLock<Option<Graph>>,
}

impl Neo4jStore {
    /// Create the store and eagerly attempt the first connection. The
    /// store is returned even when the attempt fails; later calls retry.
    pub async fn connect(uri: &str, user: &str, password: &str, retries: u32) -> Self {
        let store = Self {
            uri: uri.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            retries: retries.max(1),
            graph: RwLock::new(None),
        };
        if let Err(e) = store.ensure_connected().await {
            warn!(uri, error = %e, "graph store unreachable at startup, will retry per call");
        }
        store
    }

    async fn ensure_connected(&self) -> GraphResult<Graph> {
        if let Some(graph) = self.graph.read().await.clone() {
            return Ok(graph);
        }

        let mut guard = self.graph.write().await;
        if let Some(graph) = guard.clone() {
            return Ok(graph);
        }

        let mut last_error = String::new();
        for attempt in 1..=self.retries {
            match Graph::new(&self.uri, &self.user, &self.password).await {
                Ok(graph) => {
                    info!(uri = %self.uri, attempt, "connected to graph store");
                    *guard = Some(graph.clone());
                    return Ok(graph);
                }
                Err(e) => {
                    warn!(uri = %self.uri, attempt, error = %e, "graph connection attempt failed");
                    last_error = e.to_string();
                    if attempt < self.retries {
                        tokio::time::sleep(Duration::from_millis(500)).await;
                    }
                }
            }
        }
        Err(GraphError::Unavailable(last_error))
    }

    /// Convert one driver row. Column names come from the row's map form;
    /// graph-native columns are re-read through the typed accessors so
    /// labels, relationship types and element ids survive the conversion.
    fn convert_row(row: &neo4rs::Row) -> GraphResult<GraphRow> {
        let map: BTreeMap<String, serde_json::Value> = row
            .to()
            .map_err(|e| GraphError::Conversion(e.to_string()))?;

        let mut columns = Vec::with_capacity(map.len());
        let mut values = Vec::with_capacity(map.len());
        for (column, json_value) in map {
            let value = if let Ok(node) = row.get::<neo4rs::Node>(&column) {
                GraphValue::Node(node_to_value(&node))
            } else if let Ok(rel) = row.get::<neo4rs::Relation>(&column) {
                GraphValue::Relationship(relation_to_value(&rel))
            } else if let Ok(path) = row.get::<neo4rs::Path>(&column) {
                GraphValue::Path(path_to_value(&path))
            } else {
                GraphValue::from_json(json_value)
            };
            columns.push(column);
            values.push(value);
        }
        Ok(GraphRow { columns, values })
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    async fn run(
        &self,
        cypher: &str,
        params: Vec<(String, QueryParam)>,
    ) -> GraphResult<Vec<GraphRow>> {
        let cypher = cypher.trim();
        if cypher.is_empty() {
            return Err(GraphError::Query("empty query".to_string()));
        }

        let graph = self.ensure_connected().await?;

        let mut q = query(cypher);
        for (key, param) in params {
            q = q.param(&key, param_to_bolt(param));
        }

        let mut result = graph
            .execute(q)
            .await
            .map_err(|e| GraphError::Query(e.to_string()))?;

        let mut rows = Vec::new();
        loop {
            match result.next().await {
                Ok(Some(row)) => match Self::convert_row(&row) {
                    Ok(row) => rows.push(row),
                    Err(e) => {
                        // One unconvertible row degrades to a warning; the
                        // rest of the result is still usable.
                        warn!(error = %e, "skipping unconvertible result row");
                    }
                },
                Ok(None) => break,
                Err(e) => return Err(GraphError::Query(e.to_string())),
            }
        }
        Ok(rows)
    }
}
