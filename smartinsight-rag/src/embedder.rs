//! Document embedder: chunk, embed, and store whole documents
//!
//! Glues the chunker, the embedding generator, and the vector index into
//! one ingestion path, and exposes similarity search over the stored
//! chunks. Point ids follow `{document_id}_{chunk_index}` so a document's
//! chunks can be addressed and deleted as a unit.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use smartinsight_core::{tenant::ensure_tenant, KnowledgeError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::chunking::{ChunkingConfig, StructureAwareChunker, TextChunk};
use crate::config::EmbeddingConfig;
use crate::embeddings::EmbeddingGenerator;
use crate::vector::{Filter, VectorIndex, VectorPoint};

/// One hit from document similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSearchResult {
    /// Point id (`{document_id}_{chunk_index}`)
    pub id: String,

    /// Similarity score, higher is better
    pub score: f32,

    /// Chunk text
    pub text: String,

    /// Source document id
    pub document_id: Option<String>,

    /// Source document title
    pub document_title: Option<String>,

    /// Section the chunk came from
    pub section: Option<String>,

    /// Chunk position within the document
    pub chunk_index: Option<usize>,
}

/// Whole-document ingestion and search over the vector index
pub struct DocumentEmbedder {
    chunker: StructureAwareChunker,
    generator: Arc<EmbeddingGenerator>,
    index: Arc<dyn VectorIndex>,
    config: EmbeddingConfig,
}

impl std::fmt::Debug for DocumentEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentEmbedder")
            .field("generator", &self.generator)
            .field("collection", &self.config.document_collection)
            .finish()
    }
}

impl DocumentEmbedder {
    #[must_use]
    pub fn new(
        generator: Arc<EmbeddingGenerator>,
        index: Arc<dyn VectorIndex>,
        config: EmbeddingConfig,
    ) -> Self {
        Self {
            chunker: StructureAwareChunker::new(),
            generator,
            index,
            config,
        }
    }

    fn collection_name<'a>(&'a self, collection: Option<&'a str>) -> &'a str {
        collection.unwrap_or(&self.config.document_collection)
    }

    /// Create the collection when missing, sized to the model's dimension
    async fn ensure_collection(
        &self,
        collection: &str,
        model: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if self.index.collection_exists(collection).await? {
            return Ok(());
        }
        let dimension = self.generator.dimension(model, cancel).await?;
        self.index.create_collection(collection, dimension).await
    }

    /// Chunk, embed, and upsert one document
    ///
    /// # Returns
    /// The number of chunks stored
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty tenant or document id, `Internal`
    /// when the embedding count does not match the chunk count, and any
    /// index error after retries.
    #[allow(clippy::too_many_arguments)]
    pub async fn process_document(
        &self,
        document_id: &str,
        text: &str,
        title: &str,
        metadata: Option<&HashMap<String, Value>>,
        tenant_id: &str,
        collection: Option<&str>,
        chunk_size: Option<usize>,
        overlap: Option<usize>,
        model: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        ensure_tenant(tenant_id)?;
        if document_id.trim().is_empty() {
            return Err(KnowledgeError::invalid_argument(
                "document_id must not be empty",
            ));
        }
        let collection = self.collection_name(collection);
        self.ensure_collection(collection, model, cancel).await?;

        let chunk_config = ChunkingConfig {
            max_chunk_size: chunk_size.unwrap_or(self.config.default_chunk_size),
            overlap: overlap.unwrap_or(self.config.default_chunk_overlap),
        };
        let chunks = self
            .chunker
            .chunk_document(text, Some(title), &chunk_config)?;
        if chunks.is_empty() {
            debug!(document_id, "nothing to embed");
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .generator
            .embed_batch(&texts, model, Some(tenant_id), cancel)
            .await?;
        if vectors.len() != chunks.len() {
            return Err(KnowledgeError::internal(format!(
                "embedding count {} does not match chunk count {}",
                vectors.len(),
                chunks.len()
            )));
        }

        let created_at = Utc::now().to_rfc3339();
        let points: Vec<VectorPoint> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                let payload = Self::chunk_payload(
                    chunk,
                    document_id,
                    title,
                    metadata,
                    tenant_id,
                    &created_at,
                );
                VectorPoint::new(format!("{document_id}_{}", chunk.position), vector)
                    .with_payload_map(payload)
            })
            .collect();

        let stored = self.index.upsert(collection, points, cancel).await?;
        info!(document_id, tenant_id, chunks = stored, "document embedded");
        Ok(stored)
    }

    /// Reserved keys first, then caller metadata without overwriting
    fn chunk_payload(
        chunk: &TextChunk,
        document_id: &str,
        title: &str,
        metadata: Option<&HashMap<String, Value>>,
        tenant_id: &str,
        created_at: &str,
    ) -> HashMap<String, Value> {
        let mut payload = HashMap::new();
        payload.insert("text".to_string(), json!(chunk.text));
        payload.insert(
            "section".to_string(),
            json!(chunk.section.as_deref().unwrap_or(title)),
        );
        payload.insert("document_id".to_string(), json!(document_id));
        payload.insert("document_title".to_string(), json!(title));
        payload.insert("chunk_index".to_string(), json!(chunk.position));
        payload.insert("tenant_id".to_string(), json!(tenant_id));
        payload.insert("created_at".to_string(), json!(created_at));

        if let Some(extra) = metadata {
            for (key, value) in extra {
                payload.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        payload
    }

    /// Embed the query and search the tenant's chunks
    ///
    /// # Errors
    ///
    /// Propagates embedding and index errors; an unknown collection
    /// reports `NotFound`.
    #[allow(clippy::too_many_arguments)]
    pub async fn search_similar(
        &self,
        query_text: &str,
        limit: usize,
        tenant_id: &str,
        collection: Option<&str>,
        score_threshold: Option<f32>,
        model: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<DocumentSearchResult>> {
        ensure_tenant(tenant_id)?;
        let collection = self.collection_name(collection);
        let vector = self
            .generator
            .embed(query_text, model, Some(tenant_id), cancel)
            .await?;

        let hits = self
            .index
            .search(collection, &vector, tenant_id, limit, score_threshold, None)
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| {
                let payload = &hit.payload;
                let text = payload
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                DocumentSearchResult {
                    text,
                    document_id: payload
                        .get("document_id")
                        .and_then(Value::as_str)
                        .map(String::from),
                    document_title: payload
                        .get("document_title")
                        .and_then(Value::as_str)
                        .map(String::from),
                    section: payload
                        .get("section")
                        .and_then(Value::as_str)
                        .map(String::from),
                    chunk_index: payload
                        .get("chunk_index")
                        .and_then(Value::as_u64)
                        .and_then(|i| usize::try_from(i).ok()),
                    id: hit.id,
                    score: hit.score,
                }
            })
            .collect())
    }

    /// Remove every chunk of a document for the tenant
    ///
    /// # Errors
    ///
    /// Propagates index errors; an unknown collection reports `NotFound`.
    pub async fn delete_document(
        &self,
        document_id: &str,
        tenant_id: &str,
        collection: Option<&str>,
    ) -> Result<()> {
        ensure_tenant(tenant_id)?;
        let collection = self.collection_name(collection);
        self.index
            .delete_document(collection, document_id, Some(tenant_id))
            .await
    }

    /// Count stored chunks for a tenant, optionally per document
    ///
    /// # Errors
    ///
    /// Propagates index errors.
    pub async fn chunk_count(
        &self,
        tenant_id: &str,
        document_id: Option<&str>,
        collection: Option<&str>,
    ) -> Result<usize> {
        ensure_tenant(tenant_id)?;
        let collection = self.collection_name(collection);
        let mut filter = Filter::for_tenant(tenant_id);
        if let Some(document_id) = document_id {
            filter = filter.and_match("document_id", json!(document_id));
        }
        self.index.count(collection, Some(filter)).await
    }
}
