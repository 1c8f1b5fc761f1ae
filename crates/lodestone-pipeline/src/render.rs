//! Schema digest to prompt text.
//!
//! The rendered text is the largest block of every generation prompt: node
//! and relationship types with sampled values, connection patterns, syntax
//! rules, and example queries derived from the live schema. When no digest
//! is available at all, a static fallback block keeps the generator on
//! safe, generic queries.

use std::fmt::Write;

use lodestone_core::SchemaDigest;

/// Static fallback used when the store is unreachable and no stale digest
/// exists. No completeness guarantee.
const FALLBACK_SCHEMA_PROMPT: &str = r#"FALLBACK SCHEMA - the database could not be reached:
Only generic queries are safe in this state.

Basic queries:
- MATCH (n) RETURN labels(n), count(n)           -- list node types
- MATCH ()-[r]->() RETURN type(r), count(r)      -- list relationship types
"#;

/// Render a digest (or the fallback) into generation-prompt text.
pub fn render_schema_prompt(digest: Option<&SchemaDigest>) -> String {
    let Some(digest) = digest else {
        return FALLBACK_SCHEMA_PROMPT.to_string();
    };

    let mut out = String::new();

    let _ = writeln!(
        out,
        "LIVE DATABASE SCHEMA (detected automatically from the graph):"
    );
    let _ = writeln!(
        out,
        "Total nodes: {} | Total relationships: {}",
        digest.total_nodes, digest.total_relationships
    );
    let _ = writeln!(out, "Captured at: {}", digest.captured_at.to_rfc3339());

    let _ = writeln!(out, "\nNODE TYPES AND PROPERTIES:");
    for node in &digest.nodes {
        let _ = writeln!(
            out,
            "\nNODE: ({}) - {} nodes\nProperties: {:?}",
            node.label, node.count, node.properties
        );
        if let Some(samples) = digest.property_samples.get(&node.label) {
            let _ = writeln!(out, "Sample values:");
            for (prop_name, sample) in samples {
                let _ = writeln!(
                    out,
                    "    - {}: {} ({} records)",
                    prop_name,
                    serde_json::Value::Array(sample.sample_values.clone()),
                    sample.total_count
                );
            }
        }
    }

    let _ = writeln!(out, "\nRELATIONSHIP TYPES AND PROPERTIES:");
    for rel in &digest.relationships {
        let _ = writeln!(
            out,
            "\nRELATIONSHIP: :{} ({} total)\nProperties: {:?}\nSample properties: {}",
            rel.rel_type, rel.count, rel.properties, rel.sample_properties
        );
    }

    let _ = writeln!(out, "\nCONNECTION PATTERNS (graph structure):");
    for pattern in &digest.connection_patterns {
        let _ = writeln!(
            out,
            "({})-[:{}]->({}) : {} connections",
            pattern.from_label, pattern.rel_type, pattern.to_label, pattern.count
        );
    }

    let _ = writeln!(
        out,
        r#"
CYPHER SYNTAX RULES:
1. Always bind relationship variables: MATCH (n1)-[r:RELATIONSHIP_TYPE]->(n2)
2. Property access: n.property_name, r.property_name
3. Never use relationships.RELATIONSHIP_TYPE.property (invalid)
4. Dynamic property access: n[property_name]
5. Existence checks: WHERE n.property IS NOT NULL
6. Pattern matching: MATCH (n:NodeType {{property: 'value'}})

EXAMPLE QUERIES FROM THE LIVE SCHEMA:"#
    );

    for node in &digest.nodes {
        let first_property = node.properties.first().map(String::as_str).unwrap_or("name");
        let _ = writeln!(
            out,
            r#"
-- queries for {label} nodes:
MATCH (n:{label}) RETURN n LIMIT 10
MATCH (n:{label}) RETURN keys(n), count(n)
MATCH (n:{label}) WHERE n.{prop} CONTAINS 'search_term' RETURN n"#,
            label = node.label,
            prop = first_property
        );
    }

    for rel in &digest.relationships {
        let _ = writeln!(
            out,
            r#"
-- queries for the {rel_type} relationship:
MATCH (n1)-[r:{rel_type}]->(n2) RETURN n1, r, n2 LIMIT 5
MATCH (n1)-[r:{rel_type}]->(n2) RETURN type(r), count(r), keys(r)"#,
            rel_type = rel.rel_type
        );
    }

    for pattern in digest.connection_patterns.iter().take(5) {
        let _ = writeln!(
            out,
            r#"
-- {from} -> {to} pattern:
MATCH ({from_var}:{from})-[r:{rel}]->({to_var}:{to}) RETURN {from_var}, r, {to_var} LIMIT 10"#,
            from = pattern.from_label,
            to = pattern.to_label,
            rel = pattern.rel_type,
            from_var = pattern.from_label.to_lowercase(),
            to_var = pattern.to_label.to_lowercase(),
        );
    }

    let _ = writeln!(
        out,
        r#"
ANALYSIS QUERY EXAMPLES:

-- most connected nodes (degree)
MATCH (n)
OPTIONAL MATCH (n)-[r]-()
WITH n, count(r) AS degree
WHERE degree > 0
RETURN n, degree
ORDER BY degree DESC LIMIT 10

-- property usage per node type
MATCH (n)
WITH labels(n)[0] AS node_type, keys(n) AS props
UNWIND props AS prop
RETURN node_type, prop, count(*) AS usage_count
ORDER BY node_type, usage_count DESC

-- unconnected nodes
MATCH (n)
WHERE NOT (n)-[]-()
RETURN labels(n)[0] AS node_type, count(n) AS orphan_count
ORDER BY orphan_count DESC

TEXT2CYPHER TASK:
Translate the user's natural-language question into one Cypher query using
the schema above.
- Use the real property names
- Use pattern matching and CONTAINS / STARTS WITH / ENDS WITH for values
- Answer with the query only, no commentary"#
    );

    out
}
