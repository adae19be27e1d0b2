//! Structure-aware document chunking

pub mod structure;

pub use structure::{ChunkingConfig, StructureAwareChunker, TextChunk};
