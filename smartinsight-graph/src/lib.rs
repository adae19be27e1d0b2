//! # SmartInsight Knowledge Graph
//!
//! Versioned triple storage and relation extraction for the multi-tenant
//! knowledge platform core.
//!
//! ## Architecture
//!
//! ```text
//! text + entities
//!       │
//!       ▼
//! RelationMappingPipeline ──► TripleMapper ──► TripleStore
//!   (ExtractorRegistry)                          ├── structural queries
//!                                                ├── SPARQL subset
//!                                                ├── temporal queries
//!                                                └── snapshots + versions
//! ```
//!
//! Every triple carries a tenant id and every mutation appends a version
//! record, so the store can answer "what did this tenant's graph state look
//! like at time T" and restore any earlier state.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use smartinsight_graph::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<()> {
//! let store = Arc::new(InMemoryTripleStore::default());
//! let registry = Arc::new(ExtractorRegistry::with_defaults());
//! let pipeline = RelationMappingPipeline::new(registry, RelationMappingConfig::default())
//!     .with_store(store.clone());
//!
//! let report = pipeline
//!     .process(text, &entities, Some("doc-1"), "tenant-a", None, &cancel)
//!     .await?;
//! println!("{} relations, {} triples", report.relations.len(), report.triples_created);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extraction;
pub mod mapping;
pub mod prelude;
pub mod sparql;
pub mod storage;
pub mod traits;
pub mod types;

pub use error::{GraphError, Result};
pub use extraction::{
    ExtractorRegistry, PipelineReport, RelationExtractor, RelationMappingConfig,
    RelationMappingPipeline,
};
pub use mapping::TripleMapper;
pub use sparql::{SparqlResult, SparqlTerm};
pub use storage::InMemoryTripleStore;
pub use traits::TripleStore;
