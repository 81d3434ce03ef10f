//! Hosted text generation
//!
//! [`TextGenerator`] is the seam the query pipeline talks to;
//! [`HuggingFaceEndpoint`] implements it against the Hugging Face
//! text-generation inference API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::config::{LlmConfig, RetrievalConfig};

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Request to language model failed: {0}")]
    Request(String),

    #[error("Language model returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Failed to parse language model response: {0}")]
    Parse(String),

    #[error("Language model returned no text")]
    EmptyResponse,
}

/// Sampling parameters sent with every prompt
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_new_tokens: u32,
}

impl From<&RetrievalConfig> for GenerationParams {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_new_tokens: config.max_new_tokens,
        }
    }
}

/// Something that completes a prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError>;

    /// Identifier shown in logs
    fn model_id(&self) -> &str;
}

/// Client for a model served by the Hugging Face inference API
pub struct HuggingFaceEndpoint {
    client: reqwest::Client,
    url: String,
    repo_id: String,
    token: String,
}

impl HuggingFaceEndpoint {
    pub fn new(config: &LlmConfig, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.model_url(),
            repo_id: config.repo_id.clone(),
            token: token.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: RequestParameters,
}

#[derive(Serialize)]
struct RequestParameters {
    temperature: f32,
    max_new_tokens: u32,
    return_full_text: bool,
}

#[derive(Deserialize)]
struct Generation {
    generated_text: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GenerationResponse {
    Many(Vec<Generation>),
    One(Generation),
    Error { error: String },
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Pull the generated text out of an inference API response body.
pub fn parse_generation(body: &str) -> Result<String, LlmError> {
    let response: GenerationResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))?;

    match response {
        GenerationResponse::Many(generations) => generations
            .into_iter()
            .next()
            .map(|g| g.generated_text)
            .ok_or(LlmError::EmptyResponse),
        GenerationResponse::One(generation) => Ok(generation.generated_text),
        GenerationResponse::Error { error } => Err(LlmError::Status {
            status: 200,
            detail: error,
        }),
    }
}

#[async_trait]
impl TextGenerator for HuggingFaceEndpoint {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        debug!(
            model = %self.repo_id,
            prompt_len = prompt.len(),
            max_new_tokens = params.max_new_tokens,
            "Calling hosted model"
        );

        let request = GenerationRequest {
            inputs: prompt,
            parameters: RequestParameters {
                temperature: params.temperature,
                max_new_tokens: params.max_new_tokens,
                return_full_text: false,
            },
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(model = %self.repo_id, error = %e, "request failed");
                LlmError::Request(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            error!(model = %self.repo_id, %status, "API error");
            return Err(LlmError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        parse_generation(&body)
    }

    fn model_id(&self) -> &str {
        &self.repo_id
    }
}
