//! Relation extraction from text
//!
//! Extractors turn `(text, entities)` into candidate [`Relation`]s; the
//! [`pipeline::RelationMappingPipeline`] validates, deduplicates, and maps
//! the survivors to triples.
//!
//! # Extractors
//!
//! - [`PatternRelationExtractor`]: linguistic pattern matching over the
//!   closed relation vocabulary
//! - [`CooccurrenceRelationExtractor`]: sentence-window co-occurrence
//! - [`SchemaRelationExtractor`]: attribute-driven extraction for
//!   structured entities (tables, columns, categories)

pub mod cooccurrence;
pub mod patterns;
pub mod pipeline;
pub mod registry;
pub mod schema;

use async_trait::async_trait;
use smartinsight_core::{Entity, Relation, RelationType};

use crate::error::Result;

pub use cooccurrence::CooccurrenceRelationExtractor;
pub use patterns::PatternRelationExtractor;
pub use pipeline::{PipelineReport, RelationMappingConfig, RelationMappingPipeline};
pub use registry::ExtractorRegistry;
pub use schema::SchemaRelationExtractor;

/// A typed relation extractor
///
/// Implementations must be stateless or internally synchronized; the
/// pipeline invokes them concurrently, one task per extractor.
#[async_trait]
pub trait RelationExtractor: Send + Sync {
    /// Stable extractor name, used for filter selection and provenance
    fn name(&self) -> &str;

    /// The relation types this extractor can emit
    fn supported_types(&self) -> &[RelationType];

    /// Whether the entity pair is plausible for the given relation type
    ///
    /// The pipeline consults this when entity-type validation is enabled.
    fn validate(&self, _source: &Entity, _target: &Entity, _relation_type: RelationType) -> bool {
        true
    }

    /// Extract candidate relations from text
    async fn extract(
        &self,
        text: &str,
        entities: &[Entity],
        source_document_id: Option<&str>,
        tenant_id: &str,
    ) -> Result<Vec<Relation>>;
}
