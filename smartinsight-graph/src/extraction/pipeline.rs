//! Relation mapping pipeline
//!
//! Fan-out over registered extractors, candidate validation, deduplication,
//! and optional conversion of the survivors into stored triples. A failing
//! extractor is recorded and skipped; only argument-level errors abort the
//! run.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use smartinsight_core::{ontology, tenant::ensure_tenant, Entity, Relation, RelationType};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::registry::ExtractorRegistry;
use crate::error::{GraphError, Result};
use crate::mapping::TripleMapper;
use crate::traits::TripleStore;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationMappingConfig {
    /// Candidates below this confidence are dropped
    pub min_confidence_threshold: f64,

    /// Keep relations whose source and target are the same entity
    pub allow_self_relations: bool,

    /// Consult the producing extractor's `validate` per candidate
    pub validate_entity_types: bool,

    /// Map surviving relations to triples and store them
    pub auto_convert_to_triples: bool,

    /// Graph for converted triples; `None` uses the tenant default
    pub default_graph_uri: Option<String>,
}

impl Default for RelationMappingConfig {
    fn default() -> Self {
        Self {
            min_confidence_threshold: 0.5,
            allow_self_relations: false,
            validate_entity_types: true,
            auto_convert_to_triples: true,
            default_graph_uri: None,
        }
    }
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Validated, deduplicated relations in first-seen order
    pub relations: Vec<Relation>,

    /// Triples stored when auto-conversion is enabled
    pub triples_created: usize,

    /// Per-extractor failures; these never abort the run
    pub extractor_errors: Vec<String>,

    /// Wall-clock duration of the run
    pub duration_ms: u64,
}

/// Relation mapping pipeline over a registry of extractors
pub struct RelationMappingPipeline {
    registry: Arc<ExtractorRegistry>,
    mapper: TripleMapper,
    store: Option<Arc<dyn TripleStore>>,
    config: RelationMappingConfig,
}

impl std::fmt::Debug for RelationMappingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationMappingPipeline")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("has_store", &self.store.is_some())
            .finish()
    }
}

impl RelationMappingPipeline {
    /// Pipeline without a store; relations are returned but never converted
    #[must_use]
    pub fn new(registry: Arc<ExtractorRegistry>, config: RelationMappingConfig) -> Self {
        Self {
            registry,
            mapper: TripleMapper::default(),
            store: None,
            config,
        }
    }

    /// Attach a triple store for auto-conversion
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn TripleStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the mapper (custom ontology base)
    #[must_use]
    pub fn with_mapper(mut self, mapper: TripleMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Run extraction, validation, deduplication, and optional conversion
    ///
    /// # Errors
    ///
    /// Fails fast with `InvalidArgument` on empty text or tenant and with
    /// `Canceled` when the token fires; per-extractor failures are reported
    /// in the returned [`PipelineReport`] instead.
    pub async fn process(
        &self,
        text: &str,
        entities: &[Entity],
        source_document_id: Option<&str>,
        tenant_id: &str,
        extractor_filter: Option<&[String]>,
        cancel: &CancellationToken,
    ) -> Result<PipelineReport> {
        if text.trim().is_empty() {
            return Err(GraphError::invalid_argument("text must not be empty"));
        }
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        let started = Instant::now();

        let extractors = self.registry.select(extractor_filter);
        if extractors.is_empty() {
            return Err(GraphError::Extraction("no extractors registered".to_string()));
        }
        info!(
            tenant_id,
            extractors = extractors.len(),
            entities = entities.len(),
            "pipeline started"
        );

        let mut report = PipelineReport::default();
        let candidates = self
            .run_extractors(
                &extractors,
                text,
                entities,
                source_document_id,
                tenant_id,
                cancel,
                &mut report.extractor_errors,
            )
            .await?;

        let validated = self.validate_relations(candidates, entities);
        let deduplicated = Self::deduplicate(validated);
        info!(
            relations = deduplicated.len(),
            errors = report.extractor_errors.len(),
            "pipeline validation complete"
        );

        if self.config.auto_convert_to_triples {
            if let Some(store) = &self.store {
                report.triples_created = self
                    .convert_to_triples(&deduplicated, tenant_id, store.as_ref())
                    .await?;
            }
        }

        report.relations = deduplicated;
        report.duration_ms =
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(report)
    }

    /// One task per extractor; panics and errors are captured per extractor
    #[allow(clippy::too_many_arguments)]
    async fn run_extractors(
        &self,
        extractors: &[Arc<dyn super::RelationExtractor>],
        text: &str,
        entities: &[Entity],
        source_document_id: Option<&str>,
        tenant_id: &str,
        cancel: &CancellationToken,
        errors: &mut Vec<String>,
    ) -> Result<Vec<Relation>> {
        let handles: Vec<_> = extractors
            .iter()
            .map(|extractor| {
                let extractor = extractor.clone();
                let text = text.to_string();
                let entities = entities.to_vec();
                let document_id = source_document_id.map(String::from);
                let tenant = tenant_id.to_string();
                tokio::spawn(async move {
                    let name = extractor.name().to_string();
                    let result = extractor
                        .extract(&text, &entities, document_id.as_deref(), &tenant)
                        .await;
                    (name, result)
                })
            })
            .collect();

        let joined = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(GraphError::Core(
                smartinsight_core::KnowledgeError::Canceled,
            )),
            joined = join_all(handles) => joined,
        };

        let mut candidates = Vec::new();
        for join_result in joined {
            match join_result {
                Ok((name, Ok(relations))) => {
                    debug!(extractor = %name, relations = relations.len(), "extractor finished");
                    candidates.extend(relations);
                }
                Ok((name, Err(e))) => {
                    warn!(extractor = %name, error = %e, "extractor failed");
                    errors.push(format!("{name}: {e}"));
                }
                Err(join_error) => {
                    warn!(error = %join_error, "extractor task aborted");
                    errors.push(format!("task: {join_error}"));
                }
            }
        }
        Ok(candidates)
    }

    /// Drop candidates that fail the configured checks
    fn validate_relations(&self, candidates: Vec<Relation>, entities: &[Entity]) -> Vec<Relation> {
        let by_id: HashMap<&str, &Entity> =
            entities.iter().map(|e| (e.id.as_str(), e)).collect();
        let mut kept = Vec::new();

        for relation in candidates {
            if relation.confidence < self.config.min_confidence_threshold {
                debug!(relation_id = %relation.id, confidence = relation.confidence, "dropped: below threshold");
                continue;
            }
            let (Some(source), Some(target)) = (
                by_id.get(relation.source_entity_id.as_str()),
                by_id.get(relation.target_entity_id.as_str()),
            ) else {
                debug!(relation_id = %relation.id, "dropped: unknown entity");
                continue;
            };
            if relation.tenant_id.trim().is_empty() {
                debug!(relation_id = %relation.id, "dropped: empty tenant");
                continue;
            }
            if !self.config.allow_self_relations
                && relation.source_entity_id == relation.target_entity_id
            {
                debug!(relation_id = %relation.id, "dropped: self relation");
                continue;
            }
            if self.config.validate_entity_types {
                let plausible = self
                    .registry
                    .get(&relation.extraction_method)
                    .is_none_or(|extractor| {
                        extractor.validate(source, target, relation.relation_type)
                    });
                if !plausible {
                    debug!(relation_id = %relation.id, "dropped: entity types rejected");
                    continue;
                }
            }
            kept.push(relation);
        }
        kept
    }

    /// Keep the highest-confidence relation per `(source, target, type)`;
    /// ties resolve to the first seen, and winners keep first-seen order
    fn deduplicate(relations: Vec<Relation>) -> Vec<Relation> {
        let mut winners: Vec<Relation> = Vec::new();
        let mut slots: HashMap<(String, String, RelationType), usize> = HashMap::new();

        for relation in relations {
            let key = relation.dedup_key();
            match slots.get(&key) {
                Some(&slot) => {
                    if relation.confidence > winners[slot].confidence {
                        winners[slot] = relation;
                    }
                }
                None => {
                    slots.insert(key, winners.len());
                    winners.push(relation);
                }
            }
        }
        winners
    }

    /// Map relations to triples and store them in one batch
    async fn convert_to_triples(
        &self,
        relations: &[Relation],
        tenant_id: &str,
        store: &dyn TripleStore,
    ) -> Result<usize> {
        let graph_uri = self
            .config
            .default_graph_uri
            .clone()
            .unwrap_or_else(|| ontology::default_graph_uri(tenant_id));

        let mut triples = Vec::new();
        for relation in relations {
            match self.mapper.map_relation(relation, Some(&graph_uri)) {
                Ok(mapped) => triples.extend(mapped),
                Err(e) => warn!(relation_id = %relation.id, error = %e, "relation not mapped"),
            }
        }
        if triples.is_empty() {
            return Ok(0);
        }
        store.add_triples(triples, tenant_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::RelationExtractor;
    use async_trait::async_trait;

    struct FixedExtractor {
        name: &'static str,
        relations: Vec<Relation>,
    }

    #[async_trait]
    impl RelationExtractor for FixedExtractor {
        fn name(&self) -> &str {
            self.name
        }

        fn supported_types(&self) -> &[RelationType] {
            &[RelationType::WorksFor]
        }

        async fn extract(
            &self,
            _text: &str,
            _entities: &[Entity],
            _source_document_id: Option<&str>,
            _tenant_id: &str,
        ) -> crate::error::Result<Vec<Relation>> {
            Ok(self.relations.clone())
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl RelationExtractor for FailingExtractor {
        fn name(&self) -> &str {
            "failing"
        }

        fn supported_types(&self) -> &[RelationType] {
            &[]
        }

        async fn extract(
            &self,
            _text: &str,
            _entities: &[Entity],
            _source_document_id: Option<&str>,
            _tenant_id: &str,
        ) -> crate::error::Result<Vec<Relation>> {
            Err(GraphError::Extraction("model unavailable".to_string()))
        }
    }

    fn entities() -> Vec<Entity> {
        vec![
            Entity::new("acme", "Alice", "person").with_id("e-1"),
            Entity::new("acme", "Globex", "organization").with_id("e-2"),
        ]
    }

    fn pipeline_with(
        extractors: Vec<Arc<dyn RelationExtractor>>,
        config: RelationMappingConfig,
    ) -> RelationMappingPipeline {
        let mut registry = ExtractorRegistry::new();
        for extractor in extractors {
            registry.register(extractor);
        }
        RelationMappingPipeline::new(Arc::new(registry), config)
    }

    #[tokio::test]
    async fn test_empty_text_fails_fast() {
        let pipeline = pipeline_with(vec![], RelationMappingConfig::default());
        let err = pipeline
            .process("  ", &entities(), None, "acme", None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::Core(smartinsight_core::KnowledgeError::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn test_failing_extractor_does_not_abort() {
        let good = Relation::new("acme", "e-1", "e-2", RelationType::WorksFor, 0.9);
        let pipeline = pipeline_with(
            vec![
                Arc::new(FailingExtractor),
                Arc::new(FixedExtractor {
                    name: "fixed",
                    relations: vec![good],
                }),
            ],
            RelationMappingConfig {
                auto_convert_to_triples: false,
                ..RelationMappingConfig::default()
            },
        );

        let report = pipeline
            .process("text", &entities(), None, "acme", None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.relations.len(), 1);
        assert_eq!(report.extractor_errors.len(), 1);
        assert!(report.extractor_errors[0].contains("failing"));
    }

    #[tokio::test]
    async fn test_dedup_keeps_highest_confidence() {
        let low = Relation::new("acme", "e-1", "e-2", RelationType::WorksFor, 0.7);
        let high = Relation::new("acme", "e-1", "e-2", RelationType::WorksFor, 0.9);
        let pipeline = pipeline_with(
            vec![Arc::new(FixedExtractor {
                name: "fixed",
                relations: vec![low, high],
            })],
            RelationMappingConfig {
                auto_convert_to_triples: false,
                ..RelationMappingConfig::default()
            },
        );

        let report = pipeline
            .process("text", &entities(), None, "acme", None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.relations.len(), 1);
        assert!((report.relations[0].confidence - 0.9).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_threshold_and_self_relations() {
        let weak = Relation::new("acme", "e-1", "e-2", RelationType::WorksFor, 0.3);
        let self_rel = Relation::new("acme", "e-1", "e-1", RelationType::WorksFor, 0.9);
        let pipeline = pipeline_with(
            vec![Arc::new(FixedExtractor {
                name: "fixed",
                relations: vec![weak, self_rel],
            })],
            RelationMappingConfig {
                auto_convert_to_triples: false,
                ..RelationMappingConfig::default()
            },
        );

        let report = pipeline
            .process("text", &entities(), None, "acme", None, &CancellationToken::new())
            .await
            .unwrap();
        assert!(report.relations.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_entities_dropped() {
        let ghost = Relation::new("acme", "e-404", "e-2", RelationType::WorksFor, 0.9);
        let pipeline = pipeline_with(
            vec![Arc::new(FixedExtractor {
                name: "fixed",
                relations: vec![ghost],
            })],
            RelationMappingConfig {
                auto_convert_to_triples: false,
                ..RelationMappingConfig::default()
            },
        );

        let report = pipeline
            .process("text", &entities(), None, "acme", None, &CancellationToken::new())
            .await
            .unwrap();
        assert!(report.relations.is_empty());
    }

    #[tokio::test]
    async fn test_canceled_before_extraction() {
        let pipeline = pipeline_with(
            vec![Arc::new(FixedExtractor {
                name: "fixed",
                relations: vec![],
            })],
            RelationMappingConfig::default(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = pipeline
            .process("text", &entities(), None, "acme", None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::Core(smartinsight_core::KnowledgeError::Canceled)
        ));
    }
}
