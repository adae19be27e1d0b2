//! Triples and their version records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Kind of mutation a version record captures
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Creation,
    Update,
    Deletion,
    Restoration,
}

/// An RDF-style statement with confidence, provenance, and versioning
///
/// Identity is `(tenant_id, id)`. The live record held by the store always
/// reflects the most recent non-deletion version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Triple {
    /// Unique identifier within the tenant
    pub id: String,

    /// Owning tenant; never mutated after creation
    pub tenant_id: String,

    /// Subject URI (normalized on insertion)
    pub subject_id: String,

    /// Predicate URI
    pub predicate_uri: String,

    /// Object URI, or a lexical form when `is_literal` is set
    pub object_id: String,

    /// Whether the object is a literal rather than a URI
    pub is_literal: bool,

    /// Literal datatype URI (e.g., xsd:string), literals only
    pub literal_data_type: Option<String>,

    /// Literal language tag (e.g., "en"), literals only
    pub language_tag: Option<String>,

    /// Named graph the triple belongs to
    pub graph_uri: String,

    /// Confidence in [0, 1]
    pub confidence: f64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last-update timestamp
    pub updated_at: DateTime<Utc>,

    /// Document the statement was derived from
    pub source_document_id: Option<String>,

    /// Whether a human or downstream process verified the statement
    pub is_verified: bool,

    /// Version counter, starts at 1 and increases with every mutation
    pub version: u32,

    /// Untyped extension data (source context, extraction method, ...)
    pub provenance: HashMap<String, Value>,
}

impl Triple {
    /// Create a new triple with an auto-generated id
    #[must_use]
    pub fn new(
        tenant_id: impl Into<String>,
        subject_id: impl Into<String>,
        predicate_uri: impl Into<String>,
        object_id: impl Into<String>,
        graph_uri: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            subject_id: subject_id.into(),
            predicate_uri: predicate_uri.into(),
            object_id: object_id.into(),
            is_literal: false,
            literal_data_type: None,
            language_tag: None,
            graph_uri: graph_uri.into(),
            confidence: 1.0,
            created_at: now,
            updated_at: now,
            source_document_id: None,
            is_verified: false,
            version: 1,
            provenance: HashMap::new(),
        }
    }

    /// Create triple with explicit id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Mark the object as a literal with an optional datatype
    #[must_use]
    pub fn as_literal(mut self, data_type: Option<String>) -> Self {
        self.is_literal = true;
        self.literal_data_type = data_type;
        self
    }

    /// Set the literal language tag
    #[must_use]
    pub fn with_language_tag(mut self, tag: impl Into<String>) -> Self {
        self.language_tag = Some(tag.into());
        self
    }

    /// Set the confidence score
    #[must_use]
    pub const fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Attach the source document id
    #[must_use]
    pub fn with_source_document(mut self, document_id: impl Into<String>) -> Self {
        self.source_document_id = Some(document_id.into());
        self
    }

    /// Add a provenance entry
    #[must_use]
    pub fn with_provenance(mut self, key: impl Into<String>, value: Value) -> Self {
        self.provenance.insert(key.into(), value);
        self
    }
}

/// Immutable historical record of one triple version
///
/// Versions carry the full triple state at the time of the mutation plus
/// the change metadata. They are leaves keyed by
/// `(tenant_id, triple_id, version_number)`; neither versions nor triples
/// hold references to each other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripleVersion {
    /// The triple this version belongs to
    pub triple_id: String,

    /// Owning tenant
    pub tenant_id: String,

    /// Strictly increasing per-triple version number, starting at 1
    pub version_number: u32,

    /// Kind of mutation that produced this version
    pub change_type: ChangeType,

    /// User responsible for the change, when known
    pub changed_by_user_id: Option<String>,

    /// Free-form change comment
    pub change_comment: Option<String>,

    /// When this version record was created
    pub created_at: DateTime<Utc>,

    // Frozen triple state at this version
    pub subject_id: String,
    pub predicate_uri: String,
    pub object_id: String,
    pub is_literal: bool,
    pub literal_data_type: Option<String>,
    pub language_tag: Option<String>,
    pub graph_uri: String,
    pub confidence: f64,
    pub source_document_id: Option<String>,
    pub is_verified: bool,
    pub provenance: HashMap<String, Value>,
}

impl TripleVersion {
    /// Freeze a triple's state into a version record
    #[must_use]
    pub fn from_triple(
        triple: &Triple,
        version_number: u32,
        change_type: ChangeType,
        changed_by_user_id: Option<String>,
        change_comment: Option<String>,
    ) -> Self {
        Self {
            triple_id: triple.id.clone(),
            tenant_id: triple.tenant_id.clone(),
            version_number,
            change_type,
            changed_by_user_id,
            change_comment,
            created_at: Utc::now(),
            subject_id: triple.subject_id.clone(),
            predicate_uri: triple.predicate_uri.clone(),
            object_id: triple.object_id.clone(),
            is_literal: triple.is_literal,
            literal_data_type: triple.literal_data_type.clone(),
            language_tag: triple.language_tag.clone(),
            graph_uri: triple.graph_uri.clone(),
            confidence: triple.confidence,
            source_document_id: triple.source_document_id.clone(),
            is_verified: triple.is_verified,
            provenance: triple.provenance.clone(),
        }
    }

    /// Rebuild a live triple from this version's frozen state
    ///
    /// The caller assigns the new `version` and restoration provenance.
    #[must_use]
    pub fn to_triple(&self) -> Triple {
        let now = Utc::now();
        Triple {
            id: self.triple_id.clone(),
            tenant_id: self.tenant_id.clone(),
            subject_id: self.subject_id.clone(),
            predicate_uri: self.predicate_uri.clone(),
            object_id: self.object_id.clone(),
            is_literal: self.is_literal,
            literal_data_type: self.literal_data_type.clone(),
            language_tag: self.language_tag.clone(),
            graph_uri: self.graph_uri.clone(),
            confidence: self.confidence,
            created_at: now,
            updated_at: now,
            source_document_id: self.source_document_id.clone(),
            is_verified: self.is_verified,
            version: self.version_number,
            provenance: self.provenance.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_triple_builder() {
        let triple = Triple::new("acme", "e-1", "http://smartinsight.com/ontology/worksFor", "e-2", "g")
            .with_id("t-1")
            .with_confidence(0.8)
            .with_provenance("extraction_method", json!("pattern"));

        assert_eq!(triple.id, "t-1");
        assert!(!triple.is_literal);
        assert_eq!(triple.version, 1);
    }

    #[test]
    fn test_version_round_trip() {
        let triple = Triple::new("acme", "s", "p", "Alice", "g")
            .with_id("t-1")
            .as_literal(Some("xsd:string".to_string()));

        let version =
            TripleVersion::from_triple(&triple, 1, ChangeType::Creation, None, None);
        assert_eq!(version.version_number, 1);
        assert_eq!(version.change_type, ChangeType::Creation);

        let rebuilt = version.to_triple();
        assert_eq!(rebuilt.id, triple.id);
        assert_eq!(rebuilt.object_id, "Alice");
        assert!(rebuilt.is_literal);
    }
}
