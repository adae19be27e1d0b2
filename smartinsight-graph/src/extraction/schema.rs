//! Attribute-driven extraction for structured entities
//!
//! Connectors for relational sources emit entities typed "table" and
//! "column" whose attributes name their container, and categorized entities
//! whose attributes name a parent category. This extractor turns those
//! attributes into relations without touching the document text.

use async_trait::async_trait;
use serde_json::json;
use smartinsight_core::{Entity, Relation, RelationType};
use std::collections::HashMap;
use tracing::info;

use super::RelationExtractor;
use crate::error::Result;

const SUPPORTED: &[RelationType] = &[
    RelationType::ColumnOf,
    RelationType::TableOf,
    RelationType::SubcategoryOf,
    RelationType::ParentCategoryOf,
    RelationType::PartOf,
];

/// Confidence for attribute-derived relations; the source system stated
/// the link explicitly, so only resolution errors reduce certainty.
const SCHEMA_CONFIDENCE: f64 = 0.95;
const CATEGORY_CONFIDENCE: f64 = 0.85;

/// Structured-entity relation extractor
#[derive(Debug, Default)]
pub struct SchemaRelationExtractor;

impl SchemaRelationExtractor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolve an attribute value to an entity by id, then by name
    fn resolve<'a>(
        value: &str,
        by_id: &HashMap<&str, &'a Entity>,
        by_name: &HashMap<String, &'a Entity>,
    ) -> Option<&'a Entity> {
        by_id
            .get(value)
            .copied()
            .or_else(|| by_name.get(&value.to_lowercase()).copied())
    }

    fn relation(
        tenant_id: &str,
        source: &Entity,
        target: &Entity,
        relation_type: RelationType,
        confidence: f64,
        attribute: &str,
        source_document_id: Option<&str>,
        method: &str,
    ) -> Relation {
        let mut relation = Relation::new(
            tenant_id,
            source.id.clone(),
            target.id.clone(),
            relation_type,
            confidence,
        )
        .with_extraction_method(method)
        .with_attribute("via_attribute", json!(attribute));
        if let Some(document_id) = source_document_id {
            relation = relation.with_source_document(document_id);
        }
        relation
    }
}

#[async_trait]
impl RelationExtractor for SchemaRelationExtractor {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn supported_types(&self) -> &[RelationType] {
        SUPPORTED
    }

    fn validate(&self, source: &Entity, target: &Entity, relation_type: RelationType) -> bool {
        match relation_type {
            RelationType::ColumnOf => {
                source.entity_type.eq_ignore_ascii_case("column")
                    && target.entity_type.eq_ignore_ascii_case("table")
            }
            RelationType::TableOf => {
                source.entity_type.eq_ignore_ascii_case("table")
                    && target.entity_type.eq_ignore_ascii_case("column")
            }
            _ => source.id != target.id,
        }
    }

    async fn extract(
        &self,
        _text: &str,
        entities: &[Entity],
        source_document_id: Option<&str>,
        tenant_id: &str,
    ) -> Result<Vec<Relation>> {
        let by_id: HashMap<&str, &Entity> =
            entities.iter().map(|e| (e.id.as_str(), e)).collect();
        let by_name: HashMap<String, &Entity> = entities
            .iter()
            .map(|e| (e.name.to_lowercase(), e))
            .collect();

        let mut relations = Vec::new();
        for entity in entities {
            if entity.entity_type.eq_ignore_ascii_case("column") {
                if let Some(table_ref) = entity.attributes.get("table").and_then(|v| v.as_str())
                {
                    if let Some(table) = Self::resolve(table_ref, &by_id, &by_name) {
                        relations.push(Self::relation(
                            tenant_id,
                            entity,
                            table,
                            RelationType::ColumnOf,
                            SCHEMA_CONFIDENCE,
                            "table",
                            source_document_id,
                            self.name(),
                        ));
                        relations.push(Self::relation(
                            tenant_id,
                            table,
                            entity,
                            RelationType::TableOf,
                            SCHEMA_CONFIDENCE,
                            "table",
                            source_document_id,
                            self.name(),
                        ));
                    }
                }
            }

            if let Some(category_ref) =
                entity.attributes.get("category").and_then(|v| v.as_str())
            {
                if let Some(category) = Self::resolve(category_ref, &by_id, &by_name) {
                    if category.id != entity.id {
                        relations.push(Self::relation(
                            tenant_id,
                            entity,
                            category,
                            RelationType::SubcategoryOf,
                            CATEGORY_CONFIDENCE,
                            "category",
                            source_document_id,
                            self.name(),
                        ));
                        relations.push(Self::relation(
                            tenant_id,
                            category,
                            entity,
                            RelationType::ParentCategoryOf,
                            CATEGORY_CONFIDENCE,
                            "category",
                            source_document_id,
                            self.name(),
                        ));
                    }
                }
            }

            if let Some(parent_ref) = entity.attributes.get("part_of").and_then(|v| v.as_str()) {
                if let Some(parent) = Self::resolve(parent_ref, &by_id, &by_name) {
                    if parent.id != entity.id {
                        relations.push(Self::relation(
                            tenant_id,
                            entity,
                            parent,
                            RelationType::PartOf,
                            CATEGORY_CONFIDENCE,
                            "part_of",
                            source_document_id,
                            self.name(),
                        ));
                    }
                }
            }
        }

        info!(relations = relations.len(), "schema extraction complete");
        Ok(relations)
    }
}
