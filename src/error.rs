use std::path::PathBuf;
use thiserror::Error;

use crate::embedding::{EmbeddingError, VectorIndexError};
use crate::ingest::IngestError;
use crate::llm::LlmError;
use crate::rag::PromptError;
use crate::screening::ScreeningError;

/// Main error type for MediBot
#[derive(Error, Debug)]
pub enum MedibotError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// The hosted model token is not available
    #[error("API token not found. Please set {env_var} in your environment or .env file.")]
    MissingCredential { env_var: String },

    /// Caller supplied unusable input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Session not found
    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    #[error(transparent)]
    Screening(#[from] ScreeningError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    VectorIndex(#[from] VectorIndexError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MedibotError {
    /// Whether the error came from one of the retrieval backends
    /// (index load, embedder, retriever, hosted model).
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            MedibotError::Embedding(_) | MedibotError::VectorIndex(_) | MedibotError::Llm(_)
        )
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for MediBot operations
pub type Result<T> = std::result::Result<T, MedibotError>;
