//! Remote embedding provider over a JSON REST API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use smartinsight_core::{KnowledgeError, Result};
use std::env;

use super::provider::EmbeddingModel;

/// Remote provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEmbeddingConfig {
    /// Model name (e.g., text-embedding-3-small)
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Base URL override
    pub base_url: Option<String>,

    /// Fixed output dimensions, when the model supports reduction
    pub dimensions: Option<usize>,
}

impl Default for RemoteEmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            api_key_env: Some("EMBEDDING_API_KEY".to_string()),
            base_url: None,
            dimensions: None,
        }
    }
}

/// Embedding model backed by a remote embeddings endpoint
#[derive(Debug)]
pub struct RemoteEmbeddingModel {
    model: String,
    api_key: String,
    client: Client,
    base_url: String,
    dimensions: Option<usize>,
    default_dimensions: usize,
}

impl RemoteEmbeddingModel {
    /// Create a provider from configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when the API key environment variable is
    /// missing or unset.
    pub fn new(config: &RemoteEmbeddingConfig) -> Result<Self> {
        let api_key = match &config.api_key_env {
            Some(env_var) => env::var(env_var).map_err(|_| {
                KnowledgeError::invalid_argument(format!(
                    "API key environment variable '{env_var}' not set"
                ))
            })?,
            None => {
                return Err(KnowledgeError::invalid_argument(
                    "API key environment variable not configured",
                ))
            }
        };

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        let default_dimensions = match config.model.as_str() {
            "text-embedding-3-large" => 3072,
            _ => 1536,
        };

        Ok(Self {
            model: config.model.clone(),
            api_key,
            client: Client::new(),
            base_url,
            dimensions: config.dimensions,
            default_dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingModel for RemoteEmbeddingModel {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            input: texts.to_vec(),
            model: self.model.clone(),
            dimensions: self.dimensions,
            encoding_format: Some("float".to_string()),
        };
        let url = format!("{}/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| KnowledgeError::Transient {
                message: format!("embedding request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            let message = format!("embedding API error ({status}): {error_text}");
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                KnowledgeError::transient(message)
            } else {
                KnowledgeError::internal(message)
            });
        }

        let result: EmbeddingResponse =
            response.json().await.map_err(|e| KnowledgeError::Internal {
                message: format!("failed to parse embedding response: {e}"),
            })?;

        // Sort by index so results align with the input order
        let mut sorted = result.data;
        sorted.sort_by_key(|d| d.index);
        Ok(sorted.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions.unwrap_or(self.default_dimensions)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    input: Vec<String>,
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding_format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_rejected() {
        let config = RemoteEmbeddingConfig {
            api_key_env: Some("SMARTINSIGHT_TEST_NO_SUCH_KEY".to_string()),
            ..RemoteEmbeddingConfig::default()
        };
        assert!(RemoteEmbeddingModel::new(&config).is_err());
    }

    #[test]
    fn test_model_dimension_defaults() {
        env::set_var("SMARTINSIGHT_TEST_KEY", "test-key");
        let config = RemoteEmbeddingConfig {
            model: "text-embedding-3-large".to_string(),
            api_key_env: Some("SMARTINSIGHT_TEST_KEY".to_string()),
            ..RemoteEmbeddingConfig::default()
        };

        let model = RemoteEmbeddingModel::new(&config).unwrap();
        assert_eq!(model.dimensions(), 3072);
        assert_eq!(model.model_id(), "text-embedding-3-large");
        env::remove_var("SMARTINSIGHT_TEST_KEY");
    }
}
