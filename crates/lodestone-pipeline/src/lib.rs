//! # Lodestone Pipeline
//!
//! The generation half of the pipeline: turn a retrieval-augmented prompt
//! into a validated read-only query, execute it, and compose the results
//! back into natural language.
//!
//! - [`synth`]: cleaning, ordered repair rules, denylist validation and the
//!   always-safe default query
//! - [`render`]: schema digest to prompt text
//! - [`answer`]: result formatting and answer composition
//! - [`engine`]: the request flow wiring it all together
//!
//! The synthesizer guarantees the pipeline always yields some executable
//! query: any generation, parse or validation failure substitutes a fixed
//! safe default.

pub mod answer;
pub mod engine;
pub mod render;
pub mod synth;

pub use answer::{AnswerComposer, FALLBACK_ANSWER};
pub use engine::{AskEngine, AskOutcome};
pub use render::render_schema_prompt;
pub use synth::{QuerySynthesizer, SAFE_DEFAULT_DESCRIPTION, SAFE_DEFAULT_QUERY};
