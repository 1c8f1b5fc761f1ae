//! Query synthesis: cleaning, repair and validation of generated Cypher.
//!
//! Validation is a denylist, not a grammar parser. It is sufficient against
//! a cooperative generator only: an adversarial generation could avoid
//! every denylisted keyword through other means (procedure calls, for
//! instance). Known limitation; not hardened here.

use std::sync::OnceLock;

use lodestone_core::CandidateQuery;
use regex::Regex;
use tracing::{info, warn};

/// The always-safe fallback: count nodes grouped by label.
pub const SAFE_DEFAULT_QUERY: &str =
    "MATCH (n) RETURN labels(n), count(n) ORDER BY count(n) DESC";

/// Description attached to the fallback query.
pub const SAFE_DEFAULT_DESCRIPTION: &str = "Counts the nodes in the graph grouped by label";

/// Keywords that reject a query outright when they appear as standalone,
/// whitespace-bounded tokens. Substrings inside other words do not count.
const DENYLIST: [&str; 9] = [
    "DELETE", "REMOVE", "DROP", "CREATE", "MERGE", "SET", "DETACH", "FOREACH", "LOAD",
];

/// One textual repair rule. Order matters: later rules assume the
/// relationship-syntax normalization done by earlier ones.
struct RepairRule {
    pattern: &'static str,
    replacement: &'static str,
    #[allow(dead_code)]
    rationale: &'static str,
}

const REPAIR_RULES: [RepairRule; 6] = [
    RepairRule {
        pattern: r"(?i)relationships\.(\w+)\.(\w+)",
        replacement: "r.$2",
        rationale: "relationship property access goes through the bound variable",
    },
    RepairRule {
        pattern: r"(?i)\.birthdate\b",
        replacement: ".born",
        rationale: "property alias seen in generated queries",
    },
    RepairRule {
        pattern: r"(?i)\.year\b",
        replacement: ".released",
        rationale: "property alias seen in generated queries",
    },
    RepairRule {
        pattern: r"(?i)\.salary\b",
        replacement: ".earnings",
        rationale: "property alias seen in generated queries",
    },
    RepairRule {
        pattern: r"-\[:(\w+)\]->",
        replacement: "-[r:$1]->",
        rationale: "bare directed relationship patterns gain a binding variable",
    },
    RepairRule {
        pattern: r"-\[:(\w+)\]-",
        replacement: "-[r:$1]-",
        rationale: "bare undirected relationship patterns gain a binding variable",
    },
];

fn compiled_rules() -> &'static Vec<(Regex, &'static str)> {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        REPAIR_RULES
            .iter()
            .map(|rule| {
                (
                    Regex::new(rule.pattern).expect("static pattern compiles"),
                    rule.replacement,
                )
            })
            .collect()
    })
}

/// Cleans, repairs and validates model-generated queries, falling back to
/// [`SAFE_DEFAULT_QUERY`] whenever anything goes wrong.
pub struct QuerySynthesizer;

impl QuerySynthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Strip code fences and comment lines, collapse whitespace. The steps
    /// are order-independent normalization.
    pub fn clean(&self, text: &str) -> String {
        static FENCE: OnceLock<Regex> = OnceLock::new();
        let fence = FENCE
            .get_or_init(|| Regex::new(r"(?i)```(?:cypher|json)?").expect("static pattern compiles"));
        let without_fences = fence.replace_all(text, "");

        let joined = without_fences
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("//") && !line.starts_with("--"))
            .collect::<Vec<_>>()
            .join(" ");

        static SPACES: OnceLock<Regex> = OnceLock::new();
        let spaces = SPACES.get_or_init(|| Regex::new(r"\s+").expect("static pattern compiles"));
        spaces.replace_all(&joined, " ").trim().to_string()
    }

    /// Apply the fixed, ordered repair rules. Idempotent.
    pub fn repair(&self, text: &str) -> String {
        let mut repaired = text.to_string();
        for (pattern, replacement) in compiled_rules() {
            repaired = pattern.replace_all(&repaired, *replacement).into_owned();
        }
        repaired
    }

    /// Denylist validation plus shape checks: no standalone denylisted
    /// token, must start with `MATCH`, must contain `RETURN`.
    pub fn validate(&self, query: &str) -> bool {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return false;
        }
        let upper = trimmed.to_uppercase();

        for keyword in DENYLIST {
            if upper.split_whitespace().any(|token| token == keyword) {
                warn!(keyword, "denylisted keyword in generated query");
                return false;
            }
        }
        if !upper.starts_with("MATCH") {
            warn!("generated query does not start with MATCH");
            return false;
        }
        if !upper.split_whitespace().any(|token| token == "RETURN") {
            warn!("generated query has no RETURN");
            return false;
        }
        true
    }

    /// The fixed fallback candidate.
    pub fn safe_default(&self) -> CandidateQuery {
        CandidateQuery {
            cypher: SAFE_DEFAULT_QUERY.to_string(),
            description: SAFE_DEFAULT_DESCRIPTION.to_string(),
            valid: true,
        }
    }

    /// Extract the `{cypher, description}` JSON object from a model
    /// response, unwrapping fenced blocks.
    pub fn parse_response(&self, response: &str) -> Option<(String, String)> {
        let mut body = response.trim();
        if let Some(idx) = body.find("```json") {
            body = &body[idx + 7..];
            body = body.split("```").next().unwrap_or(body);
        } else if let Some(idx) = body.find("```") {
            body = &body[idx + 3..];
            body = body.split("```").next().unwrap_or(body);
        }

        let parsed: serde_json::Value = serde_json::from_str(body.trim()).ok()?;
        let cypher = parsed.get("cypher")?.as_str()?.to_string();
        let description = parsed
            .get("description")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some((cypher, description))
    }

    /// Full synthesis: parse the (possibly absent) model response, clean
    /// and repair the query, validate it, and fall back to the safe
    /// default on any failure.
    pub fn synthesize(&self, response: Option<&str>) -> CandidateQuery {
        let Some(response) = response else {
            warn!("no model response, using safe default query");
            return self.safe_default();
        };
        let Some((cypher, description)) = self.parse_response(response) else {
            warn!("unparsable model response, using safe default query");
            return self.safe_default();
        };

        let repaired = self.repair(&self.clean(&cypher));
        if self.validate(&repaired) {
            info!(cypher = %repaired, "synthesized query");
            CandidateQuery {
                cypher: repaired,
                description,
                valid: true,
            }
        } else {
            warn!(cypher = %repaired, "generated query failed validation, using safe default");
            self.safe_default()
        }
    }
}

impl Default for QuerySynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth() -> QuerySynthesizer {
        QuerySynthesizer::new()
    }

    #[test]
    fn validate_rejects_standalone_denylisted_token() {
        assert!(!synth().validate("MATCH (n) DELETE n RETURN n"));
        assert!(!synth().validate("MATCH (n) SET n.x = 1 RETURN n"));
        assert!(!synth().validate("MATCH (n) RETURN n MERGE (m)"));
    }

    #[test]
    fn validate_allows_denylisted_substring_inside_words() {
        assert!(synth().validate("MATCH (n) RETURN n.created AS x"));
        assert!(synth().validate("MATCH (n) WHERE n.dataset = 'a' RETURN n"));
    }

    #[test]
    fn validate_accepts_plain_match_return() {
        assert!(synth().validate("MATCH (n) RETURN n"));
    }

    #[test]
    fn validate_requires_match_prefix_and_return() {
        assert!(!synth().validate("RETURN 1"));
        assert!(!synth().validate("MATCH (n)"));
        assert!(!synth().validate(""));
        // case-insensitive shape checks
        assert!(synth().validate("match (n) return n"));
    }

    #[test]
    fn clean_strips_fences_and_comments() {
        let raw = "```cypher\n// a comment\nMATCH (n)\n-- another\nRETURN   n\n```";
        assert_eq!(synth().clean(raw), "MATCH (n) RETURN n");
    }

    #[test]
    fn repair_binds_bare_relationship_patterns() {
        let repaired = synth().repair("MATCH (a)-[:MADE_BY]->(b) RETURN a, b");
        assert_eq!(repaired, "MATCH (a)-[r:MADE_BY]->(b) RETURN a, b");

        let undirected = synth().repair("MATCH (a)-[:KNOWS]-(b) RETURN a");
        assert_eq!(undirected, "MATCH (a)-[r:KNOWS]-(b) RETURN a");
    }

    #[test]
    fn repair_rewrites_relationship_property_access() {
        let repaired = synth().repair("MATCH (a)-[r:ACTED_IN]->(b) RETURN relationships.ACTED_IN.role");
        assert_eq!(repaired, "MATCH (a)-[r:ACTED_IN]->(b) RETURN r.role");
    }

    #[test]
    fn repair_aliases_property_names() {
        let repaired = synth().repair("MATCH (p) RETURN p.birthdate, p.year, p.salary");
        assert_eq!(repaired, "MATCH (p) RETURN p.born, p.released, p.earnings");
    }

    #[test]
    fn repair_is_idempotent() {
        let inputs = [
            "MATCH (a)-[:MADE_BY]->(b) RETURN a",
            "MATCH (p) RETURN p.birthdate",
            "MATCH (a)-[r:X]->(b) RETURN relationships.X.weight",
            "MATCH (n) RETURN n",
        ];
        for input in inputs {
            let once = synth().repair(input);
            let twice = synth().repair(&once);
            assert_eq!(once, twice, "repair not idempotent for {input}");
        }
    }

    #[test]
    fn synthesize_falls_back_without_response() {
        let candidate = synth().synthesize(None);
        assert_eq!(candidate.cypher, SAFE_DEFAULT_QUERY);
        assert!(candidate.valid);
    }

    #[test]
    fn synthesize_falls_back_on_unparsable_response() {
        let candidate = synth().synthesize(Some("not json at all"));
        assert_eq!(candidate.cypher, SAFE_DEFAULT_QUERY);
    }

    #[test]
    fn synthesize_falls_back_on_invalid_query() {
        let response = r#"{"cypher": "MATCH (n) DELETE n RETURN n", "description": "bad"}"#;
        let candidate = synth().synthesize(Some(response));
        assert_eq!(candidate.cypher, SAFE_DEFAULT_QUERY);
    }

    #[test]
    fn synthesize_accepts_fenced_json() {
        let response = "```json\n{\"cypher\": \"MATCH (p:Product)-[:MADE_BY]->(b:Brand) RETURN p, b\", \"description\": \"products by brand\"}\n```";
        let candidate = synth().synthesize(Some(response));
        assert!(candidate.valid);
        assert_eq!(
            candidate.cypher,
            "MATCH (p:Product)-[r:MADE_BY]->(b:Brand) RETURN p, b"
        );
        assert_eq!(candidate.description, "products by brand");
    }

    #[test]
    fn safe_default_passes_its_own_validation() {
        assert!(synth().validate(SAFE_DEFAULT_QUERY));
    }
}
