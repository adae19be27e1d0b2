//! Deterministic mock embedding model for tests and local runs
//!
//! Vectors are seeded from a hash of the input text, so equal texts embed
//! identically across runs and similar workloads stay reproducible.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use smartinsight_core::Result;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::provider::EmbeddingModel;

/// Deterministic pseudo-random embedding model
#[derive(Debug, Clone)]
pub struct MockEmbeddingModel {
    model: String,
    dimensions: usize,
}

impl Default for MockEmbeddingModel {
    fn default() -> Self {
        Self::new("mock-embedding", 384)
    }
}

impl MockEmbeddingModel {
    #[must_use]
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model: model.into(),
            dimensions,
        }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut rng = StdRng::seed_from_u64(hasher.finish());
        (0..self.dimensions).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }
}

#[async_trait]
impl EmbeddingModel for MockEmbeddingModel {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_text_same_vector() {
        let model = MockEmbeddingModel::default();
        let a = model.embed(&["hello".to_string()]).await.unwrap();
        let b = model.embed(&["hello".to_string()]).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 384);
    }

    #[tokio::test]
    async fn test_different_texts_differ() {
        let model = MockEmbeddingModel::default();
        let result = model
            .embed(&["hello".to_string(), "world".to_string()])
            .await
            .unwrap();
        assert_ne!(result[0], result[1]);
    }
}
