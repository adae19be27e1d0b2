//! Embedding model trait

use async_trait::async_trait;
use smartinsight_core::Result;

/// A model that turns texts into fixed-dimension vectors
///
/// For a fixed model, every returned vector has the same dimension; the
/// generator caches that dimension after the first successful call.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Generate one embedding per input text, preserving order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Output dimension of this model
    fn dimensions(&self) -> usize;

    /// Model identifier
    fn model_id(&self) -> &str;
}
