//! Answer composition: result rows plus history into one generation
//! prompt, and light post-processing of the model's text.
//!
//! Results are never truncated before generation - completeness is chosen
//! over prompt economy. That is a scalability risk for large result sets;
//! there is no pagination or summarization fallback.

use std::sync::{Arc, OnceLock};

use lodestone_core::ConversationTurn;
use lodestone_llm::{GenerationOptions, ProviderChain};
use regex::Regex;
use serde_json::Value;
use tracing::{info, warn};

/// Turns retained in the history excerpt.
const HISTORY_TURNS: usize = 2;

/// Characters kept of each prior answer in the excerpt.
const HISTORY_ANSWER_CHARS: usize = 100;

/// Returned when every provider fails; callers must not cache it.
pub const FALLBACK_ANSWER: &str = "Sorry, I cannot produce an answer right now. The database \
is reachable but the language model did not respond; please try again shortly.";

/// Composes natural-language answers from query results.
pub struct AnswerComposer {
    chain: Arc<ProviderChain>,
}

impl AnswerComposer {
    pub fn new(chain: Arc<ProviderChain>) -> Self {
        Self { chain }
    }

    /// Render the rows for the prompt: a single scalar result is shown
    /// directly, everything else is a full untruncated dump.
    pub fn format_results(rows: &[Vec<Value>]) -> String {
        if rows.is_empty() {
            return "No data found.".to_string();
        }
        if rows.len() == 1 && rows[0].len() == 1 {
            return format!("Result: {}", rows[0][0]);
        }
        let dump = serde_json::to_string(rows).unwrap_or_else(|_| format!("{rows:?}"));
        format!("{} results found. All results: {}", rows.len(), dump)
    }

    fn history_excerpt(history: &[ConversationTurn]) -> String {
        let start = history.len().saturating_sub(HISTORY_TURNS);
        let mut excerpt = String::new();
        for turn in &history[start..] {
            let answer: String = turn.answer.chars().take(HISTORY_ANSWER_CHARS).collect();
            excerpt.push_str(&format!(
                "Previous question: {}\nPrevious answer: {}...\n\n",
                turn.question, answer
            ));
        }
        excerpt
    }

    /// Build the composition prompt.
    pub fn build_prompt(
        question: &str,
        cypher: &str,
        rows: &[Vec<Value>],
        history: &[ConversationTurn],
    ) -> String {
        let formatted_results = Self::format_results(rows);
        let history_context = Self::history_excerpt(history);

        format!(
            r#"You are a graph database assistant answering from live query results.

Previous conversation:
{history_context}
Current question: {question}
Executed query: {cypher}
Database results: {formatted_results}

TASK: Answer helpfully and completely:

1. Explain the results in detail - show every item
2. For listing questions, enumerate ALL items as a numbered list
3. Highlight numeric values and format them with thousands separators
   (for example 1558255 -> 1,558,255)
4. Speak in terms of nodes and relationships when describing structure
5. Suggest what the user could ask next
6. Do not omit any row - every record appears on its own line

EXAMPLE FORMAT:
The products made by this brand are:
1. [Product name] - [details]
2. [Product name] - [details]
...and so on for every row.

If there is no data, say so and suggest alternatives."#
        )
    }

    /// Compose the final answer, post-processing the model output. When
    /// every provider fails the apology text is returned instead.
    pub async fn compose(
        &self,
        question: &str,
        cypher: &str,
        rows: &[Vec<Value>],
        history: &[ConversationTurn],
    ) -> String {
        let prompt = Self::build_prompt(question, cypher, rows, history);
        let system_prompt = "You are a helpful graph database assistant. Be thorough, \
format numbers nicely, enumerate every result, and suggest alternatives when there is no data.";

        match self
            .chain
            .generate(&prompt, system_prompt, &GenerationOptions::default())
            .await
        {
            Some(answer) => {
                info!(question, "answer composed");
                Self::post_process(&answer)
            }
            None => {
                warn!(question, "answer generation failed on every provider");
                FALLBACK_ANSWER.to_string()
            }
        }
    }

    /// Collapse runs of blank lines and normalize currency-symbol spacing.
    pub fn post_process(text: &str) -> String {
        static BLANKS: OnceLock<Regex> = OnceLock::new();
        let blanks = BLANKS.get_or_init(|| Regex::new(r"\n{3,}").expect("static pattern compiles"));
        let collapsed = blanks.replace_all(text, "\n\n");

        static CURRENCY: OnceLock<Regex> = OnceLock::new();
        let currency =
            CURRENCY.get_or_init(|| Regex::new(r"(\S)\$").expect("static pattern compiles"));
        currency.replace_all(&collapsed, "${1} $$").into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lodestone_llm::MockTextProvider;
    use serde_json::json;

    fn chain_with(provider: MockTextProvider) -> Arc<ProviderChain> {
        Arc::new(ProviderChain::new(
            Some(Arc::new(provider)),
            None,
            Vec::new(),
        ))
    }

    #[test]
    fn empty_rows_format_as_no_data() {
        assert_eq!(AnswerComposer::format_results(&[]), "No data found.");
    }

    #[test]
    fn single_scalar_formats_directly() {
        let rows = vec![vec![json!(42)]];
        assert_eq!(AnswerComposer::format_results(&rows), "Result: 42");
    }

    #[test]
    fn multiple_rows_dump_everything() {
        let rows = vec![vec![json!("a"), json!(1)], vec![json!("b"), json!(2)]];
        let formatted = AnswerComposer::format_results(&rows);
        assert!(formatted.starts_with("2 results found."));
        assert!(formatted.contains("\"a\""));
        assert!(formatted.contains("\"b\""));
    }

    #[test]
    fn post_process_collapses_blank_runs() {
        assert_eq!(
            AnswerComposer::post_process("a\n\n\n\nb"),
            "a\n\nb"
        );
    }

    #[test]
    fn post_process_spaces_currency_symbols() {
        assert_eq!(AnswerComposer::post_process("costs$100"), "costs $100");
        // already spaced text is left alone
        assert_eq!(AnswerComposer::post_process("costs $100"), "costs $100");
    }

    #[test]
    fn prompt_includes_history_excerpt_truncated() {
        let history = vec![ConversationTurn {
            question: "old question".to_string(),
            answer: "x".repeat(500),
            timestamp: Utc::now(),
        }];
        let prompt = AnswerComposer::build_prompt("new question", "MATCH (n) RETURN n", &[], &history);
        assert!(prompt.contains("Previous question: old question"));
        assert!(prompt.contains(&format!("{}...", "x".repeat(100))));
        assert!(!prompt.contains(&"x".repeat(101)));
    }

    #[tokio::test]
    async fn compose_returns_model_text() {
        let composer = AnswerComposer::new(chain_with(MockTextProvider::with_response(
            "Here are the results.",
        )));
        let answer = composer
            .compose("q", "MATCH (n) RETURN n", &[], &[])
            .await;
        assert_eq!(answer, "Here are the results.");
    }

    #[tokio::test]
    async fn compose_apologizes_when_providers_fail() {
        let composer = AnswerComposer::new(chain_with(MockTextProvider::failing()));
        let answer = composer
            .compose("q", "MATCH (n) RETURN n", &[], &[])
            .await;
        assert!(answer.starts_with("Sorry"));
    }
}
