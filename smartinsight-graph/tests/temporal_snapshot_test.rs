//! Temporal query and snapshot restoration tests
//!
//! The lifecycle scenario: insert, update, delete, then query the state as
//! of instants between the mutations; snapshots freeze a tenant's graphs
//! and restore them over a modified store.

use chrono::Utc;
use smartinsight_graph::prelude::*;
use std::collections::BTreeSet;
use std::time::Duration;

fn triple(tenant: &str, id: &str, object: &str) -> Triple {
    Triple::new(
        tenant,
        "http://e/subject",
        "http://smartinsight.com/ontology/references",
        object,
        "",
    )
    .with_id(id)
}

/// Triple identity for snapshot equality checks
fn fingerprint(t: &Triple) -> (String, String, String, bool, String) {
    (
        t.subject_id.clone(),
        t.predicate_uri.clone(),
        t.object_id.clone(),
        t.is_literal,
        t.graph_uri.clone(),
    )
}

#[tokio::test]
async fn test_as_of_walks_the_lifecycle() {
    let store = InMemoryTripleStore::default();
    store
        .add_triple(triple("acme", "t-1", "http://e/v1"), "acme")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let after_create = Utc::now();

    let mut live = store.get_triple("t-1", "acme").await.unwrap();
    live.object_id = "http://e/v2".to_string();
    store.update_triple(live, "acme").await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let after_update = Utc::now();

    store.remove_triple("t-1", "acme").await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let after_delete = Utc::now();

    // Between update and deletion: the v2 state is live
    let result = store
        .query_temporal(
            &TemporalTripleQuery::new(TemporalSelector::AsOf(after_update)),
            "acme",
        )
        .await
        .unwrap();
    assert_eq!(result.triples.len(), 1);
    assert_eq!(result.triples[0].object_id, "http://e/v2");
    assert_eq!(result.versions[0].version_number, 2);

    // After deletion: hidden unless deletions are requested
    let hidden = store
        .query_temporal(
            &TemporalTripleQuery::new(TemporalSelector::AsOf(after_delete)),
            "acme",
        )
        .await
        .unwrap();
    assert!(hidden.versions.is_empty());

    let visible = store
        .query_temporal(
            &TemporalTripleQuery::new(TemporalSelector::AsOf(after_delete)).include_deleted(),
            "acme",
        )
        .await
        .unwrap();
    assert_eq!(visible.versions.len(), 1);
    assert_eq!(visible.versions[0].change_type, ChangeType::Deletion);

    // Before everything: nothing existed
    let nothing = store
        .query_temporal(
            &TemporalTripleQuery::new(TemporalSelector::AsOf(
                after_create - chrono::Duration::seconds(60),
            )),
            "acme",
        )
        .await
        .unwrap();
    assert!(nothing.versions.is_empty());
}

#[tokio::test]
async fn test_range_query_with_all_versions_and_diffs() {
    let store = InMemoryTripleStore::default();
    let start = Utc::now() - chrono::Duration::seconds(1);
    store
        .add_triple(triple("acme", "t-1", "http://e/v1"), "acme")
        .await
        .unwrap();
    let mut live = store.get_triple("t-1", "acme").await.unwrap();
    live.object_id = "http://e/v2".to_string();
    live.confidence = 0.4;
    store.update_triple(live, "acme").await.unwrap();
    let end = Utc::now() + chrono::Duration::seconds(1);

    let diffs = store
        .query_temporal(
            &TemporalTripleQuery::new(TemporalSelector::Range {
                from: start,
                to: end,
            })
            .all_versions(0)
            .diffs_only(),
            "acme",
        )
        .await
        .unwrap();
    assert_eq!(diffs.diffs.len(), 1);
    let diff = &diffs.diffs[0];
    assert_eq!(diff.from_version, 1);
    assert_eq!(diff.to_version, 2);
    assert_eq!(diff.object.as_ref().unwrap().to, "http://e/v2");
    assert!(diff.subject.is_none());
    assert!(diff.confidence.is_some());
}

#[tokio::test]
async fn test_version_selector_exact_match() {
    let store = InMemoryTripleStore::default();
    store
        .add_triple(triple("acme", "t-1", "http://e/v1"), "acme")
        .await
        .unwrap();
    let mut live = store.get_triple("t-1", "acme").await.unwrap();
    live.object_id = "http://e/v2".to_string();
    store.update_triple(live, "acme").await.unwrap();

    let result = store
        .query_temporal(
            &TemporalTripleQuery::new(TemporalSelector::Version(1)),
            "acme",
        )
        .await
        .unwrap();
    assert_eq!(result.versions.len(), 1);
    assert_eq!(result.versions[0].object_id, "http://e/v1");
}

#[tokio::test]
async fn test_snapshot_restore_recovers_frozen_state() {
    let store = InMemoryTripleStore::default();
    store
        .add_triple(triple("acme", "t-1", "http://e/v1"), "acme")
        .await
        .unwrap();
    store
        .add_triple(triple("acme", "t-2", "http://e/other"), "acme")
        .await
        .unwrap();

    let info = store.create_snapshot("baseline", "acme", None).await.unwrap();
    assert_eq!(info.triple_count, 2);
    let frozen: BTreeSet<_> = store
        .query(&TripleQuery::new(), "acme")
        .await
        .unwrap()
        .triples
        .iter()
        .map(fingerprint)
        .collect();

    // Mutate the live state after the snapshot
    store.remove_triple("t-2", "acme").await.unwrap();
    let mut live = store.get_triple("t-1", "acme").await.unwrap();
    live.object_id = "http://e/changed".to_string();
    store.update_triple(live, "acme").await.unwrap();
    store
        .add_triple(triple("acme", "t-3", "http://e/new"), "acme")
        .await
        .unwrap();

    let restored = store.restore_snapshot("baseline", "acme").await.unwrap();
    assert_eq!(restored, 2);

    let current: BTreeSet<_> = store
        .query(&TripleQuery::new(), "acme")
        .await
        .unwrap()
        .triples
        .iter()
        .map(fingerprint)
        .collect();
    assert_eq!(current, frozen, "restored live set must equal the frozen set");

    // Each restored triple carries exactly one trailing Restoration version
    for id in ["t-1", "t-2"] {
        let history = store.history(id, "acme", 0).await.unwrap();
        assert_eq!(history[0].change_type, ChangeType::Restoration);
        assert_eq!(
            history[0].change_comment.as_deref(),
            Some("Restored from snapshot 'baseline'")
        );
        assert_ne!(history[1].change_type, ChangeType::Restoration);
    }
}

#[tokio::test]
async fn test_snapshot_listing_and_unknown_restore() {
    let store = InMemoryTripleStore::default();
    store
        .add_triple(triple("acme", "t-1", "http://e/v1"), "acme")
        .await
        .unwrap();
    store.create_snapshot("s1", "acme", None).await.unwrap();

    let listed = store.list_snapshots("acme").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "s1");

    // Another tenant sees no snapshots and cannot restore this one
    assert!(store.list_snapshots("globex").await.unwrap().is_empty());
    assert!(store.restore_snapshot("s1", "globex").await.is_err());
    assert!(store.restore_snapshot("missing", "acme").await.is_err());
}
