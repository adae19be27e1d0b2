//! Batched embedding generation with truncation, normalization, and retries

use dashmap::DashMap;
use smartinsight_core::{KnowledgeError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::provider::EmbeddingModel;
use crate::config::EmbeddingConfig;

/// Embedding generator over a set of named models
///
/// Responsibilities beyond delegating to the model: input truncation,
/// batching with order-preserving concatenation, optional L2
/// normalization, retry with backoff on transient failures, and a
/// per-model dimension cache filled by the first successful call.
pub struct EmbeddingGenerator {
    models: HashMap<String, Arc<dyn EmbeddingModel>>,
    config: EmbeddingConfig,
    dimension_cache: DashMap<String, usize>,
}

impl std::fmt::Debug for EmbeddingGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingGenerator")
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .field("default_model", &self.config.default_model)
            .finish()
    }
}

impl EmbeddingGenerator {
    /// Generator with no models registered yet
    #[must_use]
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            models: HashMap::new(),
            config,
            dimension_cache: DashMap::new(),
        }
    }

    /// Register a model under its id
    #[must_use]
    pub fn with_model(mut self, model: Arc<dyn EmbeddingModel>) -> Self {
        self.models.insert(model.model_id().to_string(), model);
        self
    }

    fn resolve(&self, model: Option<&str>) -> Result<(String, Arc<dyn EmbeddingModel>)> {
        let name = model.unwrap_or(&self.config.default_model);
        self.models
            .get(name)
            .map(|m| (name.to_string(), m.clone()))
            .ok_or_else(|| KnowledgeError::not_found(format!("embedding model not registered: {name}")))
    }

    /// Embed one text
    ///
    /// # Errors
    ///
    /// `NotFound` for an unregistered model, `Canceled` when the token
    /// fires, and the model's error after retries are exhausted.
    pub async fn embed(
        &self,
        text: &str,
        model: Option<&str>,
        tenant_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<f32>> {
        let mut vectors = self
            .embed_batch(&[text.to_string()], model, tenant_id, cancel)
            .await?;
        vectors
            .pop()
            .ok_or_else(|| KnowledgeError::internal("embedding call returned no vector"))
    }

    /// Embed a batch, preserving input order
    ///
    /// Inputs beyond `max_batch_size` are split into multiple model calls;
    /// texts beyond `max_input_length` characters are truncated with a
    /// warning.
    ///
    /// # Errors
    ///
    /// See [`EmbeddingGenerator::embed`].
    pub async fn embed_batch(
        &self,
        texts: &[String],
        model: Option<&str>,
        tenant_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let (name, model) = self.resolve(model)?;
        info!(
            model = %name,
            texts = texts.len(),
            tenant_id = tenant_id.unwrap_or("-"),
            "embedding batch started"
        );

        let truncated: Vec<String> = texts.iter().map(|t| self.truncate(t)).collect();
        let mut vectors = Vec::with_capacity(truncated.len());

        for batch in truncated.chunks(self.config.max_batch_size.max(1)) {
            if cancel.is_cancelled() {
                return Err(KnowledgeError::Canceled);
            }
            let batch_vectors = self.call_with_retry(model.as_ref(), batch, cancel).await?;
            if batch_vectors.len() != batch.len() {
                return Err(KnowledgeError::internal(format!(
                    "model returned {} vectors for {} inputs",
                    batch_vectors.len(),
                    batch.len()
                )));
            }
            for vector in batch_vectors {
                self.check_dimension(&name, &vector)?;
                vectors.push(if self.config.normalize_vectors {
                    Self::normalize(vector)
                } else {
                    vector
                });
            }
        }
        Ok(vectors)
    }

    /// Output dimension of a model, probing with a throwaway call on a
    /// cache miss
    ///
    /// # Errors
    ///
    /// See [`EmbeddingGenerator::embed`].
    pub async fn dimension(
        &self,
        model: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let (name, _) = self.resolve(model)?;
        if let Some(cached) = self.dimension_cache.get(&name) {
            return Ok(*cached);
        }
        debug!(model = %name, "dimension cache miss; probing");
        let vector = self.embed("dimension probe", Some(&name), None, cancel).await?;
        Ok(vector.len())
    }

    fn truncate(&self, text: &str) -> String {
        let limit = self.config.max_input_length;
        if text.chars().count() <= limit {
            return text.to_string();
        }
        warn!(
            length = text.chars().count(),
            limit, "input truncated for embedding"
        );
        text.chars().take(limit).collect()
    }

    fn check_dimension(&self, model: &str, vector: &[f32]) -> Result<()> {
        match self.dimension_cache.get(model).map(|d| *d) {
            Some(expected) if expected != vector.len() => Err(KnowledgeError::DimensionMismatch {
                expected,
                actual: vector.len(),
            }),
            Some(_) => Ok(()),
            None => {
                self.dimension_cache.insert(model.to_string(), vector.len());
                Ok(())
            }
        }
    }

    async fn call_with_retry(
        &self,
        model: &dyn EmbeddingModel,
        batch: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0;
        loop {
            match model.embed(batch).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if e.is_transient() && attempt + 1 < self.config.max_retry_attempts => {
                    attempt += 1;
                    let delay =
                        Duration::from_millis(self.config.retry_delay_ms * u64::from(attempt));
                    warn!(attempt, ?delay, error = %e, "transient embedding failure; retrying");
                    tokio::select! {
                        () = cancel.cancelled() => return Err(KnowledgeError::Canceled),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Scale to unit L2 norm; zero vectors pass through unchanged
    #[must_use]
    pub fn normalize(vector: Vec<f32>) -> Vec<f32> {
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            return vector;
        }
        vector.into_iter().map(|v| v / norm).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbeddingModel;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn generator() -> EmbeddingGenerator {
        EmbeddingGenerator::new(EmbeddingConfig {
            default_model: "mock-embedding".to_string(),
            retry_delay_ms: 1,
            ..EmbeddingConfig::default()
        })
        .with_model(Arc::new(MockEmbeddingModel::default()))
    }

    #[tokio::test]
    async fn test_normalized_vectors_have_unit_norm() {
        let generator = generator();
        let vector = generator
            .embed("some text", None, None, &CancellationToken::new())
            .await
            .unwrap();
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_zero_vector_passes_through() {
        let normalized = EmbeddingGenerator::normalize(vec![0.0, 0.0, 0.0]);
        assert_eq!(normalized, vec![0.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn test_batching_preserves_order() {
        let generator = EmbeddingGenerator::new(EmbeddingConfig {
            default_model: "mock-embedding".to_string(),
            max_batch_size: 2,
            ..EmbeddingConfig::default()
        })
        .with_model(Arc::new(MockEmbeddingModel::default()));

        let texts: Vec<String> = (0..5).map(|i| format!("text {i}")).collect();
        let batched = generator
            .embed_batch(&texts, None, None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(batched.len(), 5);

        for (i, text) in texts.iter().enumerate() {
            let single = generator
                .embed(text, None, None, &CancellationToken::new())
                .await
                .unwrap();
            assert_eq!(batched[i], single, "order broken at {i}");
        }
    }

    #[tokio::test]
    async fn test_dimension_cached_after_first_call() {
        let generator = generator();
        let cancel = CancellationToken::new();
        generator.embed("warm up", None, None, &cancel).await.unwrap();
        assert_eq!(generator.dimension(None, &cancel).await.unwrap(), 384);
    }

    #[tokio::test]
    async fn test_unknown_model_not_found() {
        let generator = generator();
        let err = generator
            .embed("text", Some("missing"), None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, KnowledgeError::NotFound { .. }));
    }

    struct FlakyModel {
        failures: AtomicU32,
    }

    #[async_trait]
    impl EmbeddingModel for FlakyModel {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if self.failures.fetch_sub(1, Ordering::SeqCst) > 0 {
                return Err(KnowledgeError::transient("503 from model"));
            }
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn model_id(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let generator = EmbeddingGenerator::new(EmbeddingConfig {
            default_model: "flaky".to_string(),
            retry_delay_ms: 1,
            max_retry_attempts: 3,
            ..EmbeddingConfig::default()
        })
        .with_model(Arc::new(FlakyModel {
            failures: AtomicU32::new(2),
        }));

        let vector = generator
            .embed("text", None, None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(vector.len(), 2);
    }

    #[tokio::test]
    async fn test_truncation_applies() {
        let generator = EmbeddingGenerator::new(EmbeddingConfig {
            default_model: "mock-embedding".to_string(),
            max_input_length: 8,
            ..EmbeddingConfig::default()
        })
        .with_model(Arc::new(MockEmbeddingModel::default()));
        let cancel = CancellationToken::new();

        let long = generator
            .embed("truncate me please", None, None, &cancel)
            .await
            .unwrap();
        let prefix = generator.embed("truncate", None, None, &cancel).await.unwrap();
        assert_eq!(long, prefix);
    }
}
