//! Sentence-window co-occurrence extraction
//!
//! Two entities mentioned in the same sentence are associated; confidence
//! scales down with the word distance between their mentions.

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;
use smartinsight_core::{Entity, Relation, RelationType};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{info, trace};

use super::RelationExtractor;
use crate::error::Result;

static SENTENCE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("sentence regex must compile"));

const SUPPORTED: &[RelationType] = &[RelationType::AssociatedWith];

/// Maximum characters of sentence kept as source context
const CONTEXT_LIMIT: usize = 200;

/// Co-occurrence relation extractor
#[derive(Debug, Default)]
pub struct CooccurrenceRelationExtractor;

impl CooccurrenceRelationExtractor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Word distance between two byte offsets in the lowercased sentence
    ///
    /// Offsets must come from the same lowercased string being sliced;
    /// lowercasing can change byte lengths.
    fn word_distance(lowered: &str, a: usize, b: usize) -> usize {
        let (start, end) = if a < b { (a, b) } else { (b, a) };
        lowered[start..end].split_whitespace().count()
    }

    fn confidence_for_distance(distance: usize) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let scaled = 0.75 - 0.02 * distance as f64;
        scaled.max(0.5)
    }
}

#[async_trait]
impl RelationExtractor for CooccurrenceRelationExtractor {
    fn name(&self) -> &'static str {
        "cooccurrence"
    }

    fn supported_types(&self) -> &[RelationType] {
        SUPPORTED
    }

    fn validate(&self, source: &Entity, target: &Entity, _relation_type: RelationType) -> bool {
        source.id != target.id
    }

    async fn extract(
        &self,
        text: &str,
        entities: &[Entity],
        source_document_id: Option<&str>,
        tenant_id: &str,
    ) -> Result<Vec<Relation>> {
        let mut best: HashMap<(String, String), Relation> = HashMap::new();

        for sentence in SENTENCE_SPLIT.split(text) {
            let lowered = sentence.to_lowercase();

            // Entities mentioned in this sentence, with their offsets
            let mentions: Vec<(&Entity, usize)> = entities
                .iter()
                .filter_map(|e| {
                    lowered
                        .find(&e.name.to_lowercase())
                        .map(|offset| (e, offset))
                })
                .collect();

            for (i, (source, source_offset)) in mentions.iter().enumerate() {
                for (target, target_offset) in mentions.iter().skip(i + 1) {
                    if source.id == target.id {
                        continue;
                    }
                    let distance =
                        Self::word_distance(&lowered, *source_offset, *target_offset);
                    let confidence = Self::confidence_for_distance(distance);
                    trace!(source = %source.name, target = %target.name, distance, "co-occurrence");

                    let context: String = sentence.chars().take(CONTEXT_LIMIT).collect();
                    let mut relation = Relation::new(
                        tenant_id,
                        source.id.clone(),
                        target.id.clone(),
                        RelationType::AssociatedWith,
                        confidence,
                    )
                    .bidirectional()
                    .with_source_context(context)
                    .with_extraction_method(self.name())
                    .with_attribute("word_distance", json!(distance));
                    if let Some(document_id) = source_document_id {
                        relation = relation.with_source_document(document_id);
                    }

                    // Keep the closest mention pair across sentences
                    let key = (source.id.clone(), target.id.clone());
                    match best.get(&key) {
                        Some(existing) if existing.confidence >= relation.confidence => {}
                        _ => {
                            best.insert(key, relation);
                        }
                    }
                }
            }
        }

        let mut relations: Vec<Relation> = best.into_values().collect();
        relations.sort_by(|a, b| {
            a.source_entity_id
                .cmp(&b.source_entity_id)
                .then(a.target_entity_id.cmp(&b.target_entity_id))
        });
        info!(relations = relations.len(), "co-occurrence extraction complete");
        Ok(relations)
    }
}
