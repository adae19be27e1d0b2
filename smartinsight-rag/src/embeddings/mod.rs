//! Embedding generation: model trait, providers, and the batched generator

pub mod generator;
pub mod mock;
pub mod provider;
pub mod remote;

pub use generator::EmbeddingGenerator;
pub use mock::MockEmbeddingModel;
pub use provider::EmbeddingModel;
pub use remote::{RemoteEmbeddingConfig, RemoteEmbeddingModel};
