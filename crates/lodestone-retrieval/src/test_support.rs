//! Scripted in-memory graph store for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use lodestone_core::{GraphError, GraphResult, GraphRow, GraphStore, GraphValue, QueryParam};

/// Build a [`GraphRow`] from `(column, value)` pairs.
pub fn row(pairs: Vec<(&str, GraphValue)>) -> GraphRow {
    GraphRow {
        columns: pairs.iter().map(|(c, _)| c.to_string()).collect(),
        values: pairs.into_iter().map(|(_, v)| v).collect(),
    }
}

struct Rule {
    needle: String,
    rows: Vec<GraphRow>,
}

/// Graph store that answers queries by substring rule, in registration
/// order. Unmatched queries return no rows; a failing store errors on
/// every call.
pub struct MockGraphStore {
    rules: Vec<Rule>,
    fail: bool,
    queries: Mutex<Vec<String>>,
}

impl MockGraphStore {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Fail every query, simulating an unreachable store.
    pub fn failing() -> Self {
        Self {
            rules: Vec::new(),
            fail: true,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Answer queries containing `needle` with `rows`.
    pub fn on(mut self, needle: &str, rows: Vec<GraphRow>) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            rows,
        });
        self
    }

    /// Queries seen so far, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl Default for MockGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for MockGraphStore {
    async fn run(
        &self,
        cypher: &str,
        _params: Vec<(String, QueryParam)>,
    ) -> GraphResult<Vec<GraphRow>> {
        self.queries.lock().unwrap().push(cypher.to_string());
        if self.fail {
            return Err(GraphError::Unavailable("mock store down".to_string()));
        }
        for rule in &self.rules {
            if cypher.contains(&rule.needle) {
                return Ok(rule.rows.clone());
            }
        }
        Ok(Vec::new())
    }
}
