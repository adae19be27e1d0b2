//! # SmartInsight RAG
//!
//! The vector side of the multi-tenant knowledge platform core:
//! structure-aware chunking, batched embedding generation, and
//! tenant-isolated storage and search in a vector index.
//!
//! ## Architecture
//!
//! ```text
//! text ──► StructureAwareChunker ──► EmbeddingGenerator ──► VectorIndex
//!                                        (batch, retry,       ├── HttpVectorIndex
//!                                         normalize)          └── InMemoryVectorIndex
//!                    DocumentEmbedder glues the three
//! ```
//!
//! Every stored point carries a `tenant_id` payload field and every search
//! injects a must-match condition on it; cross-tenant reads are impossible
//! regardless of similarity scores.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use smartinsight_rag::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> smartinsight_core::Result<()> {
//! let config = EmbeddingConfig::default();
//! let generator = Arc::new(
//!     EmbeddingGenerator::new(config.clone())
//!         .with_model(Arc::new(MockEmbeddingModel::default())),
//! );
//! let index = Arc::new(InMemoryVectorIndex::new());
//! let embedder = DocumentEmbedder::new(generator, index, config);
//!
//! let stored = embedder
//!     .process_document("doc-1", text, "Title", None, "tenant-a",
//!                       None, None, None, None, &cancel)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod chunking;
pub mod config;
pub mod embedder;
pub mod embeddings;
pub mod prelude;
pub mod vector;

pub use chunking::{ChunkingConfig, StructureAwareChunker, TextChunk};
pub use config::{EmbeddingConfig, VectorIndexConfig};
pub use embedder::{DocumentEmbedder, DocumentSearchResult};
pub use embeddings::{EmbeddingGenerator, EmbeddingModel, MockEmbeddingModel};
pub use vector::{Filter, HttpVectorIndex, InMemoryVectorIndex, SearchHit, VectorIndex, VectorPoint};
