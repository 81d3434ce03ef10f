use crate::config::{Config, SCHEMA_VERSION};
use crate::error::{MedibotError, Result, ValidationError};
use crate::rag::PromptTemplate;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_paths(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_indexing(config, &mut errors);
        Self::validate_llm(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);

        if config.server.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "server.bind_addr",
                format!("Not a socket address: {}", config.server.bind_addr),
            ));
        }

        if config.server.session_ttl_secs == 0 {
            errors.push(ValidationError::new(
                "server.session_ttl_secs",
                "Session idle timeout must be greater than 0",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(MedibotError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != SCHEMA_VERSION {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_paths(config: &Config, errors: &mut Vec<ValidationError>) {
        // Existence is checked by ingest/query, the data dir may not exist yet
        if config.paths.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "paths.data_dir",
                "Data directory cannot be empty",
            ));
        }

        if config.paths.index_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "paths.index_dir",
                "Index directory cannot be empty",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }
    }

    fn validate_indexing(config: &Config, errors: &mut Vec<ValidationError>) {
        let indexing = &config.indexing;

        if indexing.chunk_size == 0 {
            errors.push(ValidationError::new(
                "indexing.chunk_size",
                "Chunk size must be greater than 0",
            ));
        }

        if indexing.chunk_overlap >= indexing.chunk_size {
            errors.push(ValidationError::new(
                "indexing.chunk_overlap",
                format!(
                    "Chunk overlap ({}) must be less than chunk size ({})",
                    indexing.chunk_overlap, indexing.chunk_size
                ),
            ));
        }

        if indexing.hnsw_ef_construction == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_ef_construction",
                "HNSW ef_construction must be greater than 0",
            ));
        }

        if indexing.hnsw_m == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_m",
                "HNSW M must be greater than 0",
            ));
        }

        if indexing.ef_search == 0 {
            errors.push(ValidationError::new(
                "indexing.ef_search",
                "HNSW ef_search must be greater than 0",
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        // The token itself is checked at query time so ingestion works without it
        if config.llm.api_key_env.is_empty() {
            errors.push(ValidationError::new(
                "llm.api_key_env",
                "API key environment variable name cannot be empty",
            ));
        }

        if config.llm.repo_id.is_empty() {
            errors.push(ValidationError::new(
                "llm.repo_id",
                "Model repository id cannot be empty",
            ));
        }

        let url = &config.llm.endpoint_url;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            errors.push(ValidationError::new(
                "llm.endpoint_url",
                format!("Endpoint must be an http(s) URL, got '{}'", url),
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let retrieval = &config.retrieval;

        if retrieval.top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.top_k",
                "top_k must be greater than 0",
            ));
        }

        let temp = retrieval.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "retrieval.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }

        if retrieval.max_new_tokens == 0 {
            errors.push(ValidationError::new(
                "retrieval.max_new_tokens",
                "max_new_tokens must be greater than 0",
            ));
        }

        if let Err(e) = PromptTemplate::qa(&retrieval.prompt_template) {
            errors.push(ValidationError::new(
                "retrieval.prompt_template",
                e.to_string(),
            ));
        }
    }
}
