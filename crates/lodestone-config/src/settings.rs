//! Settings model and loading.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Configuration errors. [`ConfigError::Invalid`] is fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Graph store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    /// Bolt URI of the store.
    pub uri: String,
    pub user: String,
    /// Mandatory; validated at startup.
    pub password: Option<String>,
    /// Connection attempts before giving up at startup.
    pub connect_retries: u32,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: None,
            connect_retries: 3,
        }
    }
}

/// Language-model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    /// Seconds before a primary-provider call is abandoned.
    pub gemini_timeout_secs: u64,
    pub openrouter_api_key: Option<String>,
    /// Walked in order when the primary provider fails.
    pub fallback_models: Vec<String>,
    pub openrouter_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: "gemini-2.0-flash-exp".to_string(),
            gemini_timeout_secs: 60,
            openrouter_api_key: None,
            fallback_models: vec![
                "google/gemma-3-27b-it:free".to_string(),
                "google/gemma-2-9b-it:free".to_string(),
                "meta-llama/llama-3.1-8b-instruct:free".to_string(),
                "microsoft/phi-3-medium-128k-instruct:free".to_string(),
                "qwen/qwen-2-7b-instruct:free".to_string(),
            ],
            openrouter_timeout_secs: 30,
        }
    }
}

/// Persistent cache and history settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Directory holding the cache and history files.
    pub dir: PathBuf,
    pub cache_file: String,
    pub history_file: String,
    /// Default TTL for persistent cache entries (24h).
    pub entry_ttl_secs: u64,
    /// TTL for the in-memory schema digest.
    pub schema_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            cache_file: "cache.json".to_string(),
            history_file: "history.json".to_string(),
            entry_ttl_secs: 24 * 60 * 60,
            schema_ttl_secs: 300,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Retrieval pipeline tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Semantic matches returned per question.
    pub semantic_k: usize,
    /// Hard cap on nodes scanned by the embedding search.
    pub node_scan_cap: usize,
    /// Hops expanded around each entity-matched node.
    pub entity_depth: u32,
    /// Background schema refresh interval.
    pub refresh_interval_secs: u64,
    /// Shorter re-arm delay after a failed refresh.
    pub refresh_error_backoff_secs: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            semantic_k: 5,
            node_scan_cap: 1000,
            entity_depth: 2,
            refresh_interval_secs: 300,
            refresh_error_backoff_secs: 60,
        }
    }
}

/// Root settings for the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub graph: GraphSettings,
    pub llm: LlmSettings,
    pub cache: CacheSettings,
    pub server: ServerSettings,
    pub retrieval: RetrievalSettings,
}

impl Settings {
    /// Load settings: defaults, then the TOML file if one exists, then the
    /// `LODESTONE_*` environment overlay.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            Some(path) => {
                warn!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Overlay `LODESTONE_*` environment variables onto the settings.
    pub fn apply_env(&mut self) {
        if let Ok(uri) = env::var("LODESTONE_GRAPH_URI") {
            self.graph.uri = uri;
        }
        if let Ok(user) = env::var("LODESTONE_GRAPH_USER") {
            self.graph.user = user;
        }
        if let Ok(password) = env::var("LODESTONE_GRAPH_PASSWORD") {
            self.graph.password = Some(password);
        }
        if let Ok(key) = env::var("LODESTONE_GEMINI_API_KEY") {
            self.llm.gemini_api_key = Some(key);
        }
        if let Ok(model) = env::var("LODESTONE_GEMINI_MODEL") {
            self.llm.gemini_model = model;
        }
        if let Ok(key) = env::var("LODESTONE_OPENROUTER_API_KEY") {
            self.llm.openrouter_api_key = Some(key);
        }
        if let Ok(host) = env::var("LODESTONE_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("LODESTONE_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(%port, "ignoring unparseable LODESTONE_PORT"),
            }
        }
        if let Ok(dir) = env::var("LODESTONE_CACHE_DIR") {
            self.cache.dir = PathBuf::from(dir);
        }
    }

    /// The single fatal-at-startup gate. Missing graph credentials or the
    /// absence of every LLM key halt initialization; everything else in the
    /// system degrades at runtime instead.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.graph.password.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::Invalid(
                "graph password is required (set LODESTONE_GRAPH_PASSWORD)".to_string(),
            ));
        }
        if self.llm.gemini_api_key.is_none() && self.llm.openrouter_api_key.is_none() {
            return Err(ConfigError::Invalid(
                "at least one LLM API key is required (LODESTONE_GEMINI_API_KEY or LODESTONE_OPENROUTER_API_KEY)"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Full path of the persistent cache file.
    pub fn cache_path(&self) -> PathBuf {
        self.cache.dir.join(&self.cache.cache_file)
    }

    /// Full path of the conversation history file.
    pub fn history_path(&self) -> PathBuf {
        self.cache.dir.join(&self.cache.history_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.graph.uri, "bolt://localhost:7687");
        assert_eq!(settings.cache.schema_ttl_secs, 300);
        assert_eq!(settings.retrieval.refresh_error_backoff_secs, 60);
        assert_eq!(settings.retrieval.node_scan_cap, 1000);
    }

    #[test]
    fn validate_requires_graph_password() {
        let settings = Settings::default();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validate_requires_some_llm_key() {
        let mut settings = Settings::default();
        settings.graph.password = Some("secret".to_string());
        assert!(settings.validate().is_err());

        settings.llm.openrouter_api_key = Some("sk-or-...".to_string());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn load_reads_toml_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[graph]\nuri = \"bolt://db:7687\"\npassword = \"pw\"\n\n[server]\nport = 8080"
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.graph.uri, "bolt://db:7687");
        assert_eq!(settings.server.port, 8080);
        // untouched sections keep defaults
        assert_eq!(settings.retrieval.semantic_k, 5);
    }
}
