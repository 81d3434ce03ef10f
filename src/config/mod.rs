//! Configuration management for MediBot
//!
//! Loads a TOML file, applies `MEDIBOT_SECTION__KEY` environment overrides
//! and validates the result. Every tunable of the ingestion and query
//! pipelines is an explicit, typed field here.

use crate::error::{MedibotError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

pub const SCHEMA_VERSION: &str = "1.0.0";

pub const DEFAULT_PROMPT_TEMPLATE: &str = "Use the pieces of information provided in the context to answer user's question.
If you don't know the answer, just say that you don't know, don't try to make up an answer.
Don't provide anything out of the given context.

Context: {context}
Question: {question}

Start the answer directly. No small talk please.
";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub paths: PathsConfig,
    pub embedding: EmbeddingConfig,
    pub indexing: IndexingConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub server: ServerConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory scanned for `.pdf` files during ingestion
    pub data_dir: PathBuf,
    /// Directory holding the persisted vector index
    pub index_dir: PathBuf,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: usize,
}

/// Chunking and HNSW parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Chunk length in words
    pub chunk_size: usize,
    /// Words shared between consecutive chunks
    pub chunk_overlap: usize,
    pub hnsw_m: usize,
    pub hnsw_ef_construction: usize,
    pub ef_search: usize,
}

/// Hosted model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub repo_id: String,
    /// Base URL; the repo id is appended as the last path segment
    pub endpoint_url: String,
    /// Environment variable holding the API token
    pub api_key_env: String,
}

impl LlmConfig {
    /// Read the API token from the configured environment variable.
    pub fn api_token(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(MedibotError::MissingCredential {
                env_var: self.api_key_env.clone(),
            }),
        }
    }

    pub fn model_url(&self) -> String {
        format!("{}/{}", self.endpoint_url.trim_end_matches('/'), self.repo_id)
    }
}

/// How retrieved documents are combined into the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainMode {
    /// All retrieved chunks go into a single prompt
    #[default]
    Stuff,
}

/// Query pipeline parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: usize,
    #[serde(default)]
    pub chain_mode: ChainMode,
    pub temperature: f32,
    pub max_new_tokens: u32,
    /// Template with `{context}` and `{question}` slots
    pub prompt_template: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            chain_mode: ChainMode::Stuff,
            temperature: 0.5,
            max_new_tokens: 512,
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
        }
    }
}

/// Web chat server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// Idle sessions are dropped after this many seconds
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

fn default_session_ttl_secs() -> u64 {
    1800
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MedibotError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| MedibotError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| MedibotError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: MEDIBOT_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("MEDIBOT_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "PATHS__DATA_DIR" => self.paths.data_dir = PathBuf::from(value),
            "PATHS__INDEX_DIR" => self.paths.index_dir = PathBuf::from(value),
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "LLM__REPO_ID" => self.llm.repo_id = value.to_string(),
            "LLM__ENDPOINT_URL" => self.llm.endpoint_url = value.to_string(),
            "LLM__API_KEY_ENV" => self.llm.api_key_env = value.to_string(),
            "RETRIEVAL__TOP_K" => self.retrieval.top_k = parse_value(path, value)?,
            "RETRIEVAL__TEMPERATURE" => self.retrieval.temperature = parse_value(path, value)?,
            "RETRIEVAL__MAX_NEW_TOKENS" => {
                self.retrieval.max_new_tokens = parse_value(path, value)?
            }
            "SERVER__BIND_ADDR" => self.server.bind_addr = value.to_string(),
            "SERVER__SESSION_TTL_SECS" => {
                self.server.session_ttl_secs = parse_value(path, value)?
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| MedibotError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("medibot").join("config.toml"))
    }
}

fn parse_value<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| MedibotError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
            },
            paths: PathsConfig {
                data_dir: PathBuf::from("data"),
                index_dir: PathBuf::from("vectorstore").join("db_index"),
            },
            embedding: EmbeddingConfig {
                model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
                batch_size: 32,
            },
            indexing: IndexingConfig {
                chunk_size: 200,
                chunk_overlap: 30,
                hnsw_m: 16,
                hnsw_ef_construction: 200,
                ef_search: 64,
            },
            llm: LlmConfig {
                repo_id: "mistralai/Mistral-7B-Instruct-v0.3".to_string(),
                endpoint_url: "https://router.huggingface.co/hf-inference/models".to_string(),
                api_key_env: "HF_TOKEN".to_string(),
            },
            retrieval: RetrievalConfig::default(),
            server: ServerConfig {
                bind_addr: "127.0.0.1:8501".to_string(),
                session_ttl_secs: default_session_ttl_secs(),
            },
        }
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| MedibotError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| MedibotError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.chain_mode, ChainMode::Stuff);
        assert_eq!(config.retrieval.temperature, 0.5);
        assert_eq!(config.retrieval.max_new_tokens, 512);
        assert_eq!(
            config.llm.model_url(),
            "https://router.huggingface.co/hf-inference/models/mistralai/Mistral-7B-Instruct-v0.3"
        );
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        let mut config = Config::default();
        config.retrieval.top_k = 5;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.retrieval.top_k, 5);
        assert_eq!(loaded.retrieval.prompt_template, DEFAULT_PROMPT_TEMPLATE);
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = Config::load(&temp.path().join("nope.toml"));
        assert!(matches!(result, Err(MedibotError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_env_value_parsing() {
        let mut config = Config::default();
        config.set_value_from_env("RETRIEVAL__TOP_K", "7").unwrap();
        config.set_value_from_env("LLM__REPO_ID", "org/model").unwrap();
        assert_eq!(config.retrieval.top_k, 7);
        assert_eq!(config.llm.repo_id, "org/model");

        assert!(config
            .set_value_from_env("RETRIEVAL__TEMPERATURE", "warm")
            .is_err());

        config
            .set_value_from_env("SERVER__SESSION_TTL_SECS", "60")
            .unwrap();
        assert_eq!(config.server.session_ttl_secs, 60);
    }

    #[test]
    fn test_server_section_without_ttl_uses_default() {
        let server: ServerConfig = toml::from_str(r#"bind_addr = "127.0.0.1:9000""#).unwrap();
        assert_eq!(server.session_ttl_secs, 1800);
    }

    #[test]
    fn test_missing_token() {
        let mut config = Config::default();
        config.llm.api_key_env = "MEDIBOT_TEST_TOKEN_THAT_IS_NEVER_SET".to_string();
        let err = config.llm.api_token().unwrap_err();
        assert!(matches!(err, MedibotError::MissingCredential { .. }));
    }

    #[test]
    fn test_expand_path_passthrough() {
        let path = PathBuf::from("vectorstore/db_index");
        assert_eq!(expand_path(&path).unwrap(), path);
    }
}
