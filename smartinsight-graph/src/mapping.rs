//! Mapping of validated relations to triples
//!
//! Predicate URIs come from the closed vocabulary table on
//! [`RelationType`]; domain-specific relations are percent-encoded under
//! `domain/`. A non-directional relation maps to two triples, the inverse
//! carrying the original id with an `#inverse` suffix.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::json;
use smartinsight_core::{ontology, Relation, RelationType, Triple};
use tracing::debug;

use crate::error::{GraphError, Result};

/// Encode everything except RFC 3986 unreserved characters
const PREDICATE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Relation-to-triple mapper
#[derive(Debug, Clone)]
pub struct TripleMapper {
    ontology_base: String,
}

impl Default for TripleMapper {
    fn default() -> Self {
        Self::new(ontology::ONTOLOGY_BASE)
    }
}

impl TripleMapper {
    /// Mapper rooted at the given ontology base URI
    #[must_use]
    pub fn new(ontology_base: impl Into<String>) -> Self {
        Self {
            ontology_base: ontology_base.into(),
        }
    }

    /// Predicate URI for a relation
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a `DomainSpecific` relation without a
    /// `relation_name`.
    pub fn predicate_uri(&self, relation: &Relation) -> Result<String> {
        match relation.relation_type.predicate_suffix() {
            Some(suffix) => Ok(format!("{}/{suffix}", self.ontology_base)),
            None => {
                let name = relation
                    .relation_name
                    .as_deref()
                    .filter(|n| !n.trim().is_empty())
                    .ok_or_else(|| {
                        GraphError::invalid_argument(
                            "DomainSpecific relation requires a relation_name",
                        )
                    })?;
                let encoded = utf8_percent_encode(name, PREDICATE_ENCODE_SET);
                Ok(format!("{}/domain/{encoded}", self.ontology_base))
            }
        }
    }

    /// Map a relation to one triple, or two for a non-directional relation
    ///
    /// The relation's id is reused as the triple id for traceability; the
    /// inverse triple appends `#inverse`, swaps subject and object, and
    /// keeps the same predicate.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for missing relation names or confidence
    /// outside [0, 1].
    pub fn map_relation(
        &self,
        relation: &Relation,
        graph_uri: Option<&str>,
    ) -> Result<Vec<Triple>> {
        if !(0.0..=1.0).contains(&relation.confidence) {
            return Err(GraphError::invalid_argument(format!(
                "confidence {} outside [0, 1]",
                relation.confidence
            )));
        }
        let predicate = self.predicate_uri(relation)?;
        let graph = graph_uri.map_or_else(
            || ontology::default_graph_uri(&relation.tenant_id),
            String::from,
        );

        let forward = self.build_triple(relation, &predicate, &graph, false);
        let mut triples = vec![forward];
        if !relation.is_directional {
            triples.push(self.build_triple(relation, &predicate, &graph, true));
        }

        debug!(
            relation_id = %relation.id,
            predicate = %predicate,
            count = triples.len(),
            "relation mapped"
        );
        Ok(triples)
    }

    fn build_triple(
        &self,
        relation: &Relation,
        predicate: &str,
        graph_uri: &str,
        inverse: bool,
    ) -> Triple {
        let (subject, object) = if inverse {
            (&relation.target_entity_id, &relation.source_entity_id)
        } else {
            (&relation.source_entity_id, &relation.target_entity_id)
        };

        let mut triple = Triple::new(
            relation.tenant_id.clone(),
            subject.clone(),
            predicate,
            object.clone(),
            graph_uri,
        )
        .with_id(if inverse {
            format!("{}#inverse", relation.id)
        } else {
            relation.id.clone()
        })
        .with_confidence(relation.confidence);
        triple.is_verified = relation.is_verified;

        if let Some(document_id) = &relation.source_document_id {
            triple = triple.with_source_document(document_id.clone());
        }

        // User-supplied attributes first; core provenance keys win on clash
        for (key, value) in &relation.attributes {
            triple.provenance.insert(key.clone(), value.clone());
        }
        if let Some(context) = &relation.source_context {
            triple
                .provenance
                .insert("source_context".to_string(), json!(context));
        }
        if !relation.extraction_method.is_empty() {
            triple.provenance.insert(
                "extraction_method".to_string(),
                json!(relation.extraction_method),
            );
        }
        triple.provenance.insert(
            "relation_type".to_string(),
            json!(format!("{:?}", relation.relation_type)),
        );
        if let Some(name) = &relation.relation_name {
            triple
                .provenance
                .insert("relation_name".to_string(), json!(name));
        }
        if inverse {
            triple
                .provenance
                .insert("inverse_of".to_string(), json!(relation.id));
        }
        triple
    }
}
