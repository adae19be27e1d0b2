//! Entities handed to the relation mapping pipeline

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// An entity recognized in a source document
///
/// Entities are external input to the core: a connector or recognizer
/// produces them alongside the raw text. Identity is `(tenant_id, id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    /// Unique identifier within the tenant
    pub id: String,

    /// Owning tenant; never mutated after creation
    pub tenant_id: String,

    /// Entity type/category (e.g., "person", "organization", "table")
    pub entity_type: String,

    /// Entity name/label as it appears in the source
    pub name: String,

    /// Document the entity was recognized in
    pub source_document_id: Option<String>,

    /// Additional attributes (recognizer-specific)
    pub attributes: HashMap<String, Value>,
}

impl Entity {
    /// Create a new entity with an auto-generated id
    #[must_use]
    pub fn new(
        tenant_id: impl Into<String>,
        name: impl Into<String>,
        entity_type: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            entity_type: entity_type.into(),
            name: name.into(),
            source_document_id: None,
            attributes: HashMap::new(),
        }
    }

    /// Create entity with explicit id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Attach the source document id
    #[must_use]
    pub fn with_source_document(mut self, document_id: impl Into<String>) -> Self {
        self.source_document_id = Some(document_id.into());
        self
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}
