//! Relations extracted from text, awaiting mapping to triples

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Closed vocabulary of relation types the extractors may emit
///
/// Each variant except `DomainSpecific` maps to a fixed predicate URI
/// suffix under the ontology base. `DomainSpecific` carries its name in
/// [`Relation::relation_name`] and is encoded under `domain/`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RelationType {
    AssociatedWith,
    WorksFor,
    LocatedIn,
    HeadquarteredIn,
    HasTitle,
    HasSkill,
    Created,
    PartOf,
    Owns,
    SubsidiaryOf,
    AuthorOf,
    Leads,
    ParticipatesIn,
    OccurredBefore,
    OccurredAfter,
    DomainSpecific,
    Uses,
    DependsOn,
    SimilarTo,
    References,
    SynonymOf,
    ParentCategoryOf,
    SubcategoryOf,
    ColumnOf,
    TableOf,
    HasAttribute,
    Other,
}

impl RelationType {
    /// Fixed predicate URI suffix, or `None` for `DomainSpecific`
    ///
    /// `Other` deliberately maps to the generic `hasRelation` suffix.
    #[must_use]
    pub const fn predicate_suffix(self) -> Option<&'static str> {
        match self {
            Self::AssociatedWith => Some("associatedWith"),
            Self::WorksFor => Some("worksFor"),
            Self::LocatedIn => Some("locatedIn"),
            Self::HeadquarteredIn => Some("headquarteredIn"),
            Self::HasTitle => Some("hasTitle"),
            Self::HasSkill => Some("hasSkill"),
            Self::Created => Some("created"),
            Self::PartOf => Some("partOf"),
            Self::Owns => Some("owns"),
            Self::SubsidiaryOf => Some("subsidiaryOf"),
            Self::AuthorOf => Some("authorOf"),
            Self::Leads => Some("leads"),
            Self::ParticipatesIn => Some("participatesIn"),
            Self::OccurredBefore => Some("occurredBefore"),
            Self::OccurredAfter => Some("occurredAfter"),
            Self::DomainSpecific => None,
            Self::Uses => Some("uses"),
            Self::DependsOn => Some("dependsOn"),
            Self::SimilarTo => Some("similarTo"),
            Self::References => Some("references"),
            Self::SynonymOf => Some("synonymOf"),
            Self::ParentCategoryOf => Some("parentCategoryOf"),
            Self::SubcategoryOf => Some("subcategoryOf"),
            Self::ColumnOf => Some("columnOf"),
            Self::TableOf => Some("tableOf"),
            Self::HasAttribute => Some("hasAttribute"),
            Self::Other => Some("hasRelation"),
        }
    }
}

/// A typed assertion between two entities
///
/// Relations are produced by extractors, validated and deduplicated by the
/// mapping pipeline, and either discarded or mapped to one or two triples.
/// They live in memory only; the triple store never sees them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relation {
    /// Unique identifier, reused as the mapped triple's id for traceability
    pub id: String,

    /// Owning tenant
    pub tenant_id: String,

    /// Source entity id
    pub source_entity_id: String,

    /// Target entity id
    pub target_entity_id: String,

    /// Relation type from the closed vocabulary
    pub relation_type: RelationType,

    /// Free-form name, used only when `relation_type` is `DomainSpecific`
    pub relation_name: Option<String>,

    /// Extractor confidence in [0, 1]
    pub confidence: f64,

    /// Whether the relation reads in one direction only
    pub is_directional: bool,

    /// Document the relation was extracted from
    pub source_document_id: Option<String>,

    /// Text span or sentence the relation was extracted from
    pub source_context: Option<String>,

    /// Name of the extractor that produced this relation
    pub extraction_method: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last-update timestamp
    pub updated_at: DateTime<Utc>,

    /// Whether a human or downstream process verified the relation
    pub is_verified: bool,

    /// Version counter, starts at 1
    pub version: u32,

    /// Extractor-specific extension attributes
    pub attributes: HashMap<String, Value>,
}

impl Relation {
    /// Create a new relation with an auto-generated id
    #[must_use]
    pub fn new(
        tenant_id: impl Into<String>,
        source_entity_id: impl Into<String>,
        target_entity_id: impl Into<String>,
        relation_type: RelationType,
        confidence: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            source_entity_id: source_entity_id.into(),
            target_entity_id: target_entity_id.into(),
            relation_type,
            relation_name: None,
            confidence,
            is_directional: true,
            source_document_id: None,
            source_context: None,
            extraction_method: String::new(),
            created_at: now,
            updated_at: now,
            is_verified: false,
            version: 1,
            attributes: HashMap::new(),
        }
    }

    /// Create relation with explicit id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the domain-specific relation name
    #[must_use]
    pub fn with_relation_name(mut self, name: impl Into<String>) -> Self {
        self.relation_name = Some(name.into());
        self
    }

    /// Mark the relation as non-directional (reads both ways)
    #[must_use]
    pub const fn bidirectional(mut self) -> Self {
        self.is_directional = false;
        self
    }

    /// Attach the source document id
    #[must_use]
    pub fn with_source_document(mut self, document_id: impl Into<String>) -> Self {
        self.source_document_id = Some(document_id.into());
        self
    }

    /// Attach the text span the relation was extracted from
    #[must_use]
    pub fn with_source_context(mut self, context: impl Into<String>) -> Self {
        self.source_context = Some(context.into());
        self
    }

    /// Record which extractor produced the relation
    #[must_use]
    pub fn with_extraction_method(mut self, method: impl Into<String>) -> Self {
        self.extraction_method = method.into();
        self
    }

    /// Add an extension attribute
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Deduplication key: source, target, and type identify a relation
    #[must_use]
    pub fn dedup_key(&self) -> (String, String, RelationType) {
        (
            self.source_entity_id.clone(),
            self.target_entity_id.clone(),
            self.relation_type,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_suffix_table() {
        assert_eq!(RelationType::WorksFor.predicate_suffix(), Some("worksFor"));
        assert_eq!(RelationType::Other.predicate_suffix(), Some("hasRelation"));
        assert_eq!(RelationType::DomainSpecific.predicate_suffix(), None);
    }

    #[test]
    fn test_relation_builder() {
        let rel = Relation::new("acme", "e-1", "e-2", RelationType::WorksFor, 0.9)
            .with_id("r-1")
            .with_source_context("Alice works for Globex")
            .with_extraction_method("pattern");

        assert_eq!(rel.id, "r-1");
        assert_eq!(rel.version, 1);
        assert!(rel.is_directional);
        assert_eq!(rel.dedup_key().2, RelationType::WorksFor);
    }
}
