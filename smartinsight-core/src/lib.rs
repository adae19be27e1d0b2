//! # SmartInsight Core Types
//!
//! Shared domain model for the multi-tenant knowledge platform core:
//! entities, relations, triples, version records, the semantic error enum,
//! and tenant/ontology helpers.
//!
//! Every record carries an opaque `tenant_id`; no operation anywhere in the
//! platform may observe or mutate data whose tenant differs from the
//! caller's. The helpers in [`tenant`] keep that boundary uniform.

pub mod error;
pub mod ontology;
pub mod tenant;
pub mod types;

pub use error::{KnowledgeError, Result};
pub use types::{ChangeType, Entity, Relation, RelationType, Triple, TripleVersion};
