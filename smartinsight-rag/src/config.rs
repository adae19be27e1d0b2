//! Configuration types for embeddings and the vector index

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Embedding subsystem configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model used when a call names none
    pub default_model: String,

    /// Texts longer than this are truncated (characters)
    pub max_input_length: usize,

    /// Default chunk size handed to the chunker
    pub default_chunk_size: usize,

    /// Default chunk overlap handed to the chunker
    pub default_chunk_overlap: usize,

    /// Largest batch sent to the model in one call
    pub max_batch_size: usize,

    /// Retry attempts for transient model failures
    pub max_retry_attempts: u32,

    /// Base delay between retries
    pub retry_delay_ms: u64,

    /// Scale every returned vector to unit length
    pub normalize_vectors: bool,

    /// Default collection for document embeddings
    pub document_collection: String,

    /// Passthrough model options (provider-specific)
    pub model_options: HashMap<String, Value>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            default_model: "text-embedding-3-small".to_string(),
            max_input_length: 8192,
            default_chunk_size: 1000,
            default_chunk_overlap: 200,
            max_batch_size: 32,
            max_retry_attempts: 3,
            retry_delay_ms: 500,
            normalize_vectors: true,
            document_collection: "documents".to_string(),
            model_options: HashMap::new(),
        }
    }
}

/// Vector index connection and retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    /// Index host
    pub host: String,

    /// REST port
    pub http_port: u16,

    /// gRPC port (reserved; the client speaks REST)
    pub grpc_port: u16,

    /// Use https for the REST endpoint
    pub use_https: bool,

    /// API key sent as a header when set
    pub api_key: Option<String>,

    /// Retry attempts for transient index failures
    pub max_retries: u32,

    /// Cap on the exponential backoff delay
    pub max_retry_delay_ms: u64,

    /// Upsert batch size
    pub batch_size: usize,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            http_port: 6333,
            grpc_port: 6334,
            use_https: false,
            api_key: None,
            max_retries: 3,
            max_retry_delay_ms: 5000,
            batch_size: 100,
        }
    }
}

impl VectorIndexConfig {
    /// Base URL of the REST endpoint
    #[must_use]
    pub fn base_url(&self) -> String {
        let scheme = if self.use_https { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.http_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contract() {
        let embedding = EmbeddingConfig::default();
        assert_eq!(embedding.max_input_length, 8192);
        assert_eq!(embedding.max_batch_size, 32);
        assert!(embedding.normalize_vectors);

        let index = VectorIndexConfig::default();
        assert_eq!(index.batch_size, 100);
        assert_eq!(index.base_url(), "http://localhost:6333");
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = EmbeddingConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: EmbeddingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.default_model, back.default_model);
    }
}
