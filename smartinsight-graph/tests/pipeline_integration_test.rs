//! End-to-end pipeline tests: extraction through stored triples

use smartinsight_graph::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("smartinsight_graph=debug")
        .with_test_writer()
        .try_init();
}

fn entities(tenant: &str) -> Vec<Entity> {
    vec![
        Entity::new(tenant, "Alice", "person").with_id("e-alice"),
        Entity::new(tenant, "Globex", "organization").with_id("e-globex"),
        Entity::new(tenant, "Springfield", "city").with_id("e-springfield"),
    ]
}

fn pipeline(store: Arc<InMemoryTripleStore>) -> RelationMappingPipeline {
    RelationMappingPipeline::new(
        Arc::new(ExtractorRegistry::with_defaults()),
        RelationMappingConfig::default(),
    )
    .with_store(store)
}

#[tokio::test]
async fn test_extracted_relations_become_stored_triples() -> anyhow::Result<()> {
    init_tracing();
    let store = Arc::new(InMemoryTripleStore::default());
    let pipeline = pipeline(store.clone());

    let report = pipeline
        .process(
            "Alice works for Globex. Globex is headquartered in Springfield.",
            &entities("acme"),
            Some("doc-1"),
            "acme",
            None,
            &CancellationToken::new(),
        )
        .await?;

    assert!(report
        .relations
        .iter()
        .any(|r| r.relation_type == RelationType::WorksFor));
    assert!(report.triples_created >= report.relations.len());

    // The worksFor triple landed with the fixed predicate URI
    let result = store
        .query(
            &TripleQuery::new()
                .with_predicate("http://smartinsight.com/ontology/worksFor"),
            "acme",
        )
        .await?;
    assert_eq!(result.total_count, 1);
    let triple = &result.triples[0];
    assert_eq!(triple.subject_id, "http://e-alice");
    assert_eq!(triple.object_id, "http://e-globex");
    assert_eq!(triple.provenance["extraction_method"], serde_json::json!("pattern"));
    Ok(())
}

#[tokio::test]
async fn test_bidirectional_association_stores_inverse() {
    let store = Arc::new(InMemoryTripleStore::default());
    let pipeline = pipeline(store.clone());

    let report = pipeline
        .process(
            "Alice visited Globex.",
            &entities("acme"),
            None,
            "acme",
            Some(&["cooccurrence".to_string()]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(report.relations.len(), 1);
    assert_eq!(report.triples_created, 2);

    let result = store
        .query(
            &TripleQuery::new()
                .with_predicate("http://smartinsight.com/ontology/associatedWith"),
            "acme",
        )
        .await
        .unwrap();
    assert_eq!(result.total_count, 2);
    let ids: BTreeSet<&str> = result.triples.iter().map(|t| t.id.as_str()).collect();
    let base = &report.relations[0].id;
    assert!(ids.contains(base.as_str()));
    assert!(ids.contains(format!("{base}#inverse").as_str()));
}

#[tokio::test]
async fn test_pipeline_is_idempotent_by_relation_key() {
    let store = Arc::new(InMemoryTripleStore::default());
    let pipeline = pipeline(store);
    let text = "Alice works for Globex. Alice works for Globex.";

    let keys = |report: &PipelineReport| -> BTreeSet<(String, String, String)> {
        report
            .relations
            .iter()
            .map(|r| {
                (
                    r.source_entity_id.clone(),
                    r.target_entity_id.clone(),
                    format!("{:?}", r.relation_type),
                )
            })
            .collect()
    };

    let first = pipeline
        .process(text, &entities("acme"), None, "acme", None, &CancellationToken::new())
        .await
        .unwrap();
    let second = pipeline
        .process(text, &entities("acme"), None, "acme", None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(keys(&first), keys(&second));
    // The duplicated sentence still yields one relation per key
    let works_for = first
        .relations
        .iter()
        .filter(|r| r.relation_type == RelationType::WorksFor)
        .count();
    assert_eq!(works_for, 1);
}

#[tokio::test]
async fn test_extractor_filter_limits_sources() {
    let store = Arc::new(InMemoryTripleStore::default());
    let pipeline = pipeline(store);

    let report = pipeline
        .process(
            "Alice works for Globex.",
            &entities("acme"),
            None,
            "acme",
            Some(&["pattern".to_string()]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!report.relations.is_empty());
    assert!(report
        .relations
        .iter()
        .all(|r| r.extraction_method == "pattern"));
}

#[tokio::test]
async fn test_tenant_flows_through_to_triples() {
    let store = Arc::new(InMemoryTripleStore::default());
    let pipeline = pipeline(store.clone());

    pipeline
        .process(
            "Alice works for Globex.",
            &entities("tenant-a"),
            None,
            "tenant-a",
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let other = store.query(&TripleQuery::new(), "tenant-b").await.unwrap();
    assert_eq!(other.total_count, 0);
    let own = store.query(&TripleQuery::new(), "tenant-a").await.unwrap();
    assert!(own.total_count > 0);
    assert!(own.triples.iter().all(|t| t.tenant_id == "tenant-a"));
}
