//! Common imports for working with the knowledge graph

pub use crate::error::{GraphError, Result};
pub use crate::extraction::{
    CooccurrenceRelationExtractor, ExtractorRegistry, PatternRelationExtractor, PipelineReport,
    RelationExtractor, RelationMappingConfig, RelationMappingPipeline, SchemaRelationExtractor,
};
pub use crate::mapping::TripleMapper;
pub use crate::sparql::{SparqlResult, SparqlTerm};
pub use crate::storage::InMemoryTripleStore;
pub use crate::traits::TripleStore;
pub use crate::types::{
    GraphStatistics, PropertyChange, Snapshot, SnapshotInfo, TemporalQueryResult,
    TemporalSelector, TemporalTripleQuery, TripleQuery, TripleQueryResult, TripleSortKey,
    TripleStoreConfig, VersionDiff,
};
pub use smartinsight_core::{
    ChangeType, Entity, KnowledgeError, Relation, RelationType, Triple, TripleVersion,
};
