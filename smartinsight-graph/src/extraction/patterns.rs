//! Linguistic pattern extraction over the closed relation vocabulary
//!
//! Each pattern pairs a regex with a relation type and a base confidence.
//! Captured names are resolved against the supplied entity set; matches
//! whose names resolve to no known entity are dropped here rather than
//! surfacing unresolvable relations to the pipeline.

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use smartinsight_core::{Entity, Relation, RelationType};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, info, trace};

use super::RelationExtractor;
use crate::error::Result;

/// Capitalized name phrase: "Globex", "Jane Smith", "Acme Corp."
const NAME: &str = r"[A-Z][A-Za-z0-9&.-]*(?:\s+[A-Z][A-Za-z0-9&.-]*)*";

struct RelationPattern {
    regex: Regex,
    relation_type: RelationType,
    confidence: f64,
    label: &'static str,
}

fn pattern(
    verb: &str,
    relation_type: RelationType,
    confidence: f64,
    label: &'static str,
) -> RelationPattern {
    RelationPattern {
        regex: Regex::new(&format!(r"\b(?P<s>{NAME})\s+{verb}\s+(?P<o>{NAME})\b"))
            .expect("pattern regex must compile"),
        relation_type,
        confidence,
        label,
    }
}

static PATTERNS: LazyLock<Vec<RelationPattern>> = LazyLock::new(|| {
    vec![
        pattern(r"works\s+(?:for|at)", RelationType::WorksFor, 0.85, "works_for"),
        pattern(
            r"is\s+a\s+subsidiary\s+of",
            RelationType::SubsidiaryOf,
            0.9,
            "subsidiary_of",
        ),
        pattern(
            r"is\s+(?:headquartered|based)\s+in",
            RelationType::HeadquarteredIn,
            0.85,
            "headquartered_in",
        ),
        pattern(
            r"is\s+located\s+in",
            RelationType::LocatedIn,
            0.8,
            "located_in",
        ),
        pattern(
            r"is\s+(?:a\s+)?part\s+of",
            RelationType::PartOf,
            0.75,
            "part_of",
        ),
        pattern(r"owns", RelationType::Owns, 0.8, "owns"),
        pattern(
            r"(?:leads|heads|manages)",
            RelationType::Leads,
            0.8,
            "leads",
        ),
        pattern(
            r"(?:created|developed|built)",
            RelationType::Created,
            0.7,
            "created",
        ),
        pattern(
            r"(?:authored|wrote)",
            RelationType::AuthorOf,
            0.8,
            "author_of",
        ),
        pattern(r"uses", RelationType::Uses, 0.7, "uses"),
        pattern(r"depends\s+on", RelationType::DependsOn, 0.75, "depends_on"),
    ]
});

const SUPPORTED: &[RelationType] = &[
    RelationType::WorksFor,
    RelationType::SubsidiaryOf,
    RelationType::HeadquarteredIn,
    RelationType::LocatedIn,
    RelationType::PartOf,
    RelationType::Owns,
    RelationType::Leads,
    RelationType::Created,
    RelationType::AuthorOf,
    RelationType::Uses,
    RelationType::DependsOn,
];

/// Pattern-based relation extractor
///
/// English-only, no coreference resolution; precision comes from requiring
/// both captured names to resolve to supplied entities.
#[derive(Debug, Default)]
pub struct PatternRelationExtractor;

impl PatternRelationExtractor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Case-insensitive entity lookup by name
    fn entity_index(entities: &[Entity]) -> HashMap<String, &Entity> {
        entities
            .iter()
            .map(|e| (e.name.to_lowercase(), e))
            .collect()
    }

    /// Types that plausibly occupy the object slot of a relation
    fn type_plausible(entity: &Entity, expected: &[&str]) -> bool {
        let entity_type = entity.entity_type.to_lowercase();
        entity_type.is_empty()
            || entity_type == "entity"
            || entity_type == "unknown"
            || expected.iter().any(|t| entity_type == *t)
    }
}

#[async_trait]
impl RelationExtractor for PatternRelationExtractor {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn supported_types(&self) -> &[RelationType] {
        SUPPORTED
    }

    fn validate(&self, source: &Entity, target: &Entity, relation_type: RelationType) -> bool {
        match relation_type {
            RelationType::WorksFor => {
                Self::type_plausible(source, &["person"])
                    && Self::type_plausible(target, &["organization", "company"])
            }
            RelationType::LocatedIn | RelationType::HeadquarteredIn => {
                Self::type_plausible(target, &["location", "city", "country", "place"])
            }
            RelationType::Leads => Self::type_plausible(source, &["person"]),
            _ => true,
        }
    }

    async fn extract(
        &self,
        text: &str,
        entities: &[Entity],
        source_document_id: Option<&str>,
        tenant_id: &str,
    ) -> Result<Vec<Relation>> {
        info!(text_len = text.len(), entities = entities.len(), "pattern extraction started");
        let index = Self::entity_index(entities);
        let mut relations = Vec::new();

        for pattern in PATTERNS.iter() {
            for captures in pattern.regex.captures_iter(text) {
                let source_name = captures["s"].trim();
                let target_name = captures["o"].trim();

                let (Some(source), Some(target)) = (
                    index.get(&source_name.to_lowercase()),
                    index.get(&target_name.to_lowercase()),
                ) else {
                    trace!(
                        pattern = pattern.label,
                        source_name,
                        target_name,
                        "match dropped: unresolved entity"
                    );
                    continue;
                };

                let matched = captures.get(0).map_or("", |m| m.as_str());
                debug!(pattern = pattern.label, source = %source.name, target = %target.name, "relation matched");

                let mut relation = Relation::new(
                    tenant_id,
                    source.id.clone(),
                    target.id.clone(),
                    pattern.relation_type,
                    pattern.confidence,
                )
                .with_source_context(matched)
                .with_extraction_method(self.name())
                .with_attribute("pattern", json!(pattern.label));
                if let Some(document_id) = source_document_id {
                    relation = relation.with_source_document(document_id);
                }
                relations.push(relation);
            }
        }

        info!(relations = relations.len(), "pattern extraction complete");
        Ok(relations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities(tenant: &str) -> Vec<Entity> {
        vec![
            Entity::new(tenant, "Alice", "person").with_id("e-alice"),
            Entity::new(tenant, "Globex", "organization").with_id("e-globex"),
            Entity::new(tenant, "Springfield", "city").with_id("e-springfield"),
        ]
    }

    #[tokio::test]
    async fn test_works_for_pattern() {
        let extractor = PatternRelationExtractor::new();
        let relations = extractor
            .extract(
                "Alice works for Globex in the platform group.",
                &entities("acme"),
                Some("doc-1"),
                "acme",
            )
            .await
            .unwrap();

        let rel = relations
            .iter()
            .find(|r| r.relation_type == RelationType::WorksFor)
            .expect("works_for relation");
        assert_eq!(rel.source_entity_id, "e-alice");
        assert_eq!(rel.target_entity_id, "e-globex");
        assert_eq!(rel.source_document_id.as_deref(), Some("doc-1"));
        assert!(rel.confidence >= 0.8);
    }

    #[tokio::test]
    async fn test_headquartered_pattern() {
        let extractor = PatternRelationExtractor::new();
        let relations = extractor
            .extract(
                "Globex is headquartered in Springfield.",
                &entities("acme"),
                None,
                "acme",
            )
            .await
            .unwrap();

        assert!(relations
            .iter()
            .any(|r| r.relation_type == RelationType::HeadquarteredIn
                && r.target_entity_id == "e-springfield"));
    }

    #[tokio::test]
    async fn test_unresolved_names_are_dropped() {
        let extractor = PatternRelationExtractor::new();
        let relations = extractor
            .extract(
                "Bob works for Initech.",
                &entities("acme"),
                None,
                "acme",
            )
            .await
            .unwrap();
        assert!(relations.is_empty());
    }

    #[test]
    fn test_validate_type_plausibility() {
        let extractor = PatternRelationExtractor::new();
        let person = Entity::new("acme", "Alice", "person");
        let org = Entity::new("acme", "Globex", "organization");
        let city = Entity::new("acme", "Springfield", "city");

        assert!(extractor.validate(&person, &org, RelationType::WorksFor));
        assert!(!extractor.validate(&city, &person, RelationType::WorksFor));
        assert!(extractor.validate(&org, &city, RelationType::HeadquarteredIn));
    }
}
