//! Common imports for the vector side of the platform

pub use crate::chunking::{ChunkingConfig, StructureAwareChunker, TextChunk};
pub use crate::config::{EmbeddingConfig, VectorIndexConfig};
pub use crate::embedder::{DocumentEmbedder, DocumentSearchResult};
pub use crate::embeddings::{
    EmbeddingGenerator, EmbeddingModel, MockEmbeddingModel, RemoteEmbeddingConfig,
    RemoteEmbeddingModel,
};
pub use crate::vector::{
    CollectionInfo, Filter, HttpVectorIndex, InMemoryVectorIndex, SearchHit, VectorIndex,
    VectorPoint,
};
pub use smartinsight_core::{KnowledgeError, Result};
