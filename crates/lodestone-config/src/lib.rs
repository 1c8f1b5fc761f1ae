//! # Lodestone Configuration
//!
//! Type-safe settings for the Lodestone service: TOML file plus
//! `LODESTONE_*` environment overlay, with a single fatal validation gate
//! at startup. Everything else in the system degrades at runtime; missing
//! mandatory credentials are the one thing that halts initialization.

mod settings;

pub use settings::{
    CacheSettings, ConfigError, GraphSettings, LlmSettings, RetrievalSettings, ServerSettings,
    Settings,
};
