//! In-process vector index with cosine scoring
//!
//! Mirrors the remote client's semantics — dimension enforcement, injected
//! tenant filters, AND-combined conditions — so tests and embedded
//! deployments exercise the same behavior the REST client provides.

use async_trait::async_trait;
use parking_lot::RwLock;
use smartinsight_core::{KnowledgeError, Result};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::types::{CollectionInfo, Filter, SearchHit, VectorPoint};
use super::VectorIndex;

struct Collection {
    dimension: usize,
    points: HashMap<String, VectorPoint>,
}

/// In-memory vector index
#[derive(Default)]
pub struct InMemoryVectorIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl std::fmt::Debug for InMemoryVectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryVectorIndex")
            .field("collections", &self.collections.read().len())
            .finish()
    }
}

impl InMemoryVectorIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let mut dot = 0.0;
        let mut norm_a = 0.0;
        let mut norm_b = 0.0;
        for i in 0..a.len().min(b.len()) {
            dot += a[i] * b[i];
            norm_a += a[i] * a[i];
            norm_b += b[i] * b[i];
        }
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().contains_key(name))
    }

    async fn create_collection(&self, name: &str, dimension: usize) -> Result<()> {
        if dimension == 0 {
            return Err(KnowledgeError::invalid_argument(
                "collection dimension must be positive",
            ));
        }
        let mut collections = self.collections.write();
        collections.entry(name.to_string()).or_insert_with(|| {
            debug!(collection = name, dimension, "collection created");
            Collection {
                dimension,
                points: HashMap::new(),
            }
        });
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        if cancel.is_cancelled() {
            return Err(KnowledgeError::Canceled);
        }
        let mut collections = self.collections.write();
        let data = collections.get_mut(collection).ok_or_else(|| {
            KnowledgeError::not_found(format!("collection not found: {collection}"))
        })?;

        for point in &points {
            if point.vector.len() != data.dimension {
                return Err(KnowledgeError::DimensionMismatch {
                    expected: data.dimension,
                    actual: point.vector.len(),
                });
            }
        }
        let written = points.len();
        for point in points {
            data.points.insert(point.id.clone(), point);
        }
        Ok(written)
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        tenant_id: &str,
        limit: usize,
        score_threshold: Option<f32>,
        extra_filter: Option<Filter>,
    ) -> Result<Vec<SearchHit>> {
        let filter = extra_filter.map_or_else(
            || Filter::for_tenant(tenant_id),
            |f| Filter::for_tenant(tenant_id).and(f),
        );

        let collections = self.collections.read();
        let data = collections.get(collection).ok_or_else(|| {
            KnowledgeError::not_found(format!("collection not found: {collection}"))
        })?;
        if vector.len() != data.dimension {
            return Err(KnowledgeError::DimensionMismatch {
                expected: data.dimension,
                actual: vector.len(),
            });
        }

        let mut hits: Vec<SearchHit> = data
            .points
            .values()
            .filter(|p| filter.matches(&p.payload))
            .map(|p| SearchHit {
                id: p.id.clone(),
                score: Self::cosine_similarity(vector, &p.vector),
                payload: p.payload.clone(),
            })
            .filter(|hit| score_threshold.is_none_or(|t| hit.score >= t))
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn delete_points(
        &self,
        collection: &str,
        ids: &[String],
        tenant_id: Option<&str>,
    ) -> Result<()> {
        let mut collections = self.collections.write();
        let data = collections.get_mut(collection).ok_or_else(|| {
            KnowledgeError::not_found(format!("collection not found: {collection}"))
        })?;

        let tenant_filter = tenant_id.map(Filter::for_tenant);
        for id in ids {
            let owned = data.points.get(id).is_some_and(|p| {
                tenant_filter.as_ref().is_none_or(|f| f.matches(&p.payload))
            });
            if owned {
                data.points.remove(id);
            }
        }
        Ok(())
    }

    async fn delete_by_filter(&self, collection: &str, filter: Filter) -> Result<()> {
        let mut collections = self.collections.write();
        let data = collections.get_mut(collection).ok_or_else(|| {
            KnowledgeError::not_found(format!("collection not found: {collection}"))
        })?;
        data.points.retain(|_, p| !filter.matches(&p.payload));
        Ok(())
    }

    async fn delete_document(
        &self,
        collection: &str,
        document_id: &str,
        tenant_id: Option<&str>,
    ) -> Result<()> {
        let mut filter = Filter::new().and_match(
            "document_id",
            serde_json::Value::String(document_id.to_string()),
        );
        if let Some(tenant) = tenant_id {
            filter = Filter::for_tenant(tenant).and(filter);
        }
        self.delete_by_filter(collection, filter).await
    }

    async fn count(&self, collection: &str, filter: Option<Filter>) -> Result<usize> {
        let collections = self.collections.read();
        let data = collections.get(collection).ok_or_else(|| {
            KnowledgeError::not_found(format!("collection not found: {collection}"))
        })?;
        Ok(match filter {
            Some(filter) => data
                .points
                .values()
                .filter(|p| filter.matches(&p.payload))
                .count(),
            None => data.points.len(),
        })
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn collection_info(&self, name: &str) -> Result<CollectionInfo> {
        let collections = self.collections.read();
        let data = collections
            .get(name)
            .ok_or_else(|| KnowledgeError::not_found(format!("collection not found: {name}")))?;
        Ok(CollectionInfo {
            name: name.to_string(),
            dimension: data.dimension,
            points_count: data.points.len(),
            distance: "Cosine".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(id: &str, vector: Vec<f32>, tenant: &str) -> VectorPoint {
        VectorPoint::new(id, vector).with_payload("tenant_id", json!(tenant))
    }

    #[tokio::test]
    async fn test_dimension_enforced_on_upsert() {
        let index = InMemoryVectorIndex::new();
        index.create_collection("docs", 3).await.unwrap();

        let err = index
            .upsert("docs", vec![point("p-1", vec![1.0, 2.0], "acme")], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            KnowledgeError::DimensionMismatch { expected: 3, actual: 2 }
        ));
    }

    #[tokio::test]
    async fn test_search_is_tenant_isolated() {
        let index = InMemoryVectorIndex::new();
        index.create_collection("docs", 2).await.unwrap();
        index
            .upsert(
                "docs",
                vec![
                    point("a-1", vec![1.0, 0.0], "tenant-a"),
                    point("b-1", vec![1.0, 0.0], "tenant-b"),
                ],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let hits = index
            .search("docs", &[1.0, 0.0], "tenant-a", 10, None, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a-1");
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let index = InMemoryVectorIndex::new();
        index.create_collection("docs", 2).await.unwrap();
        index
            .upsert(
                "docs",
                vec![
                    point("close", vec![1.0, 0.1], "acme"),
                    point("far", vec![0.0, 1.0], "acme"),
                ],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let hits = index
            .search("docs", &[1.0, 0.0], "acme", 10, None, None)
            .await
            .unwrap();
        assert_eq!(hits[0].id, "close");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_score_threshold_filters() {
        let index = InMemoryVectorIndex::new();
        index.create_collection("docs", 2).await.unwrap();
        index
            .upsert(
                "docs",
                vec![point("orthogonal", vec![0.0, 1.0], "acme")],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let hits = index
            .search("docs", &[1.0, 0.0], "acme", 10, Some(0.5), None)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_delete_points_respects_tenant() {
        let index = InMemoryVectorIndex::new();
        index.create_collection("docs", 2).await.unwrap();
        index
            .upsert(
                "docs",
                vec![point("p-1", vec![1.0, 0.0], "tenant-a")],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        index
            .delete_points("docs", &["p-1".to_string()], Some("tenant-b"))
            .await
            .unwrap();
        assert_eq!(index.count("docs", None).await.unwrap(), 1);

        index
            .delete_points("docs", &["p-1".to_string()], Some("tenant-a"))
            .await
            .unwrap();
        assert_eq!(index.count("docs", None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_document_by_filter() {
        let index = InMemoryVectorIndex::new();
        index.create_collection("docs", 2).await.unwrap();
        index
            .upsert(
                "docs",
                vec![
                    point("d1-0", vec![1.0, 0.0], "acme")
                        .with_payload("document_id", json!("d1")),
                    point("d2-0", vec![1.0, 0.0], "acme")
                        .with_payload("document_id", json!("d2")),
                ],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        index.delete_document("docs", "d1", Some("acme")).await.unwrap();
        assert_eq!(index.count("docs", None).await.unwrap(), 1);
    }
}
