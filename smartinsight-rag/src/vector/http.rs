//! REST client for a remote vector index
//!
//! Speaks the wire format of a Qdrant-compatible index: collections hold
//! points with JSON payloads, filters are must-match condition lists, and
//! responses arrive wrapped in a `result` envelope. Transient failures are
//! retried with exponential backoff and jitter; collection creation is
//! serialized behind a mutex with a short-lived membership cache in front
//! of the exists check.

use dashmap::DashMap;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use smartinsight_core::{KnowledgeError, Result};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{CollectionInfo, Filter, SearchHit, VectorPoint};
use super::VectorIndex;
use crate::config::VectorIndexConfig;

/// How long a positive exists-check is trusted
const MEMBERSHIP_TTL: Duration = Duration::from_secs(30);

/// Initial backoff delay before the exponential factor applies
const BASE_RETRY_DELAY_MS: u64 = 500;

/// Remote vector index client
pub struct HttpVectorIndex {
    client: Client,
    config: VectorIndexConfig,
    base_url: String,
    creation_lock: Mutex<()>,
    known_collections: DashMap<String, Instant>,
}

impl std::fmt::Debug for HttpVectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpVectorIndex")
            .field("base_url", &self.base_url)
            .field("batch_size", &self.config.batch_size)
            .finish()
    }
}

/// Response envelope used by the index API
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct ScoredPointWire {
    id: Value,
    score: f32,
    payload: Option<HashMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct CountResult {
    count: usize,
}

#[derive(Debug, Deserialize)]
struct CollectionListing {
    collections: Vec<CollectionName>,
}

#[derive(Debug, Deserialize)]
struct CollectionName {
    name: String,
}

impl HttpVectorIndex {
    /// Client for the configured endpoint
    #[must_use]
    pub fn new(config: VectorIndexConfig) -> Self {
        let base_url = config.base_url();
        Self {
            client: Client::new(),
            config,
            base_url,
            creation_lock: Mutex::new(()),
            known_collections: DashMap::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponential = BASE_RETRY_DELAY_MS.saturating_mul(2_u64.saturating_pow(attempt));
        let capped = exponential.min(self.config.max_retry_delay_ms);
        let jitter = rand::thread_rng().gen_range(0.8..1.2);
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Duration::from_millis((capped as f64 * jitter) as u64)
    }

    /// Issue a request, retrying transient failures per policy
    async fn send_with_retry<T, F>(&self, what: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let result = self.send_once(what, build()).await;
            match result {
                Err(e) if e.is_transient() && attempt + 1 < self.config.max_retries => {
                    let delay = self.backoff_delay(attempt);
                    attempt += 1;
                    warn!(what, attempt, ?delay, error = %e, "transient index failure; retrying");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        what: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|e| KnowledgeError::Transient {
                message: format!("{what}: request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(KnowledgeError::not_found(format!("{what}: not found")));
        }
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(KnowledgeError::transient(format!(
                "{what}: index returned {status}: {body}"
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KnowledgeError::Storage {
                message: format!("{what}: index returned {status}: {body}"),
            });
        }

        response
            .json::<ApiResponse<T>>()
            .await
            .map(|wrapped| wrapped.result)
            .map_err(|e| KnowledgeError::Storage {
                message: format!("{what}: invalid response body: {e}"),
            })
    }

    fn point_to_wire(point: &VectorPoint) -> Value {
        json!({
            "id": point.id,
            "vector": point.vector,
            "payload": point.payload,
        })
    }
}

#[async_trait::async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        if let Some(seen) = self.known_collections.get(name) {
            if seen.elapsed() < MEMBERSHIP_TTL {
                return Ok(true);
            }
        }

        let url = self.url(&format!("/collections/{name}"));
        match self
            .send_with_retry::<Value, _>("collection_exists", || self.client.get(&url))
            .await
        {
            Ok(_) => {
                self.known_collections.insert(name.to_string(), Instant::now());
                Ok(true)
            }
            Err(KnowledgeError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_collection(&self, name: &str, dimension: usize) -> Result<()> {
        let _guard = self.creation_lock.lock().await;
        if self.collection_exists(name).await? {
            debug!(collection = name, "collection already present");
            return Ok(());
        }

        let url = self.url(&format!("/collections/{name}"));
        let body = json!({
            "vectors": { "size": dimension, "distance": "Cosine" }
        });
        self.send_with_retry::<Value, _>("create_collection", || {
            self.client.put(&url).json(&body)
        })
        .await?;

        // Keyword payload indexes keep tenant and document filters cheap
        for field in ["tenant_id", "document_id"] {
            let index_url = self.url(&format!("/collections/{name}/index?wait=true"));
            let index_body = json!({ "field_name": field, "field_schema": "keyword" });
            self.send_with_retry::<Value, _>("create_payload_index", || {
                self.client.put(&index_url).json(&index_body)
            })
            .await?;
        }

        self.known_collections.insert(name.to_string(), Instant::now());
        info!(collection = name, dimension, "collection created");
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let url = self.url(&format!("/collections/{collection}/points?wait=true"));
        let mut written = 0;

        for batch in points.chunks(self.config.batch_size.max(1)) {
            if cancel.is_cancelled() {
                return Err(KnowledgeError::Canceled);
            }
            let wire: Vec<Value> = batch.iter().map(Self::point_to_wire).collect();
            let body = json!({ "points": wire });
            self.send_with_retry::<Value, _>("upsert", || self.client.put(&url).json(&body))
                .await?;
            written += batch.len();
            debug!(collection, written, total = points.len(), "upsert batch applied");
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
        let filter = extra_filter
            .map_or_else(|| Filter::for_tenant(tenant_id), |f| Filter::for_tenant(tenant_id).and(f));

        let mut body = json!({
            "vector": vector,
            "limit": limit,
            "filter": filter,
            "with_payload": true,
        });
        if let Some(threshold) = score_threshold {
            body["score_threshold"] = json!(threshold);
        }

        let url = self.url(&format!("/collections/{collection}/points/search"));
        let hits: Vec<ScoredPointWire> = self
            .send_with_retry("search", || self.client.post(&url).json(&body))
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| SearchHit {
                id: match hit.id {
                    Value::String(s) => s,
                    other => other.to_string(),
                },
                score: hit.score,
                payload: hit.payload.unwrap_or_default(),
            })
            .collect())
    }

    async fn delete_points(
        &self,
        collection: &str,
        ids: &[String],
        tenant_id: Option<&str>,
    ) -> Result<()> {
        let url = self.url(&format!("/collections/{collection}/points/delete?wait=true"));
        let body = match tenant_id {
            // With a tenant, the id list becomes a filter condition so the
            // tenant match applies atomically
            Some(tenant) => json!({
                "filter": {
                    "must": [
                        { "has_id": ids },
                        { "key": "tenant_id", "match": { "value": tenant } },
                    ]
                }
            }),
            None => json!({ "points": ids }),
        };
        self.send_with_retry::<Value, _>("delete_points", || self.client.post(&url).json(&body))
            .await?;
        Ok(())
    }

    async fn delete_by_filter(&self, collection: &str, filter: Filter) -> Result<()> {
        let url = self.url(&format!("/collections/{collection}/points/delete?wait=true"));
        let body = json!({ "filter": filter });
        self.send_with_retry::<Value, _>("delete_by_filter", || {
            self.client.post(&url).json(&body)
        })
        .await?;
        Ok(())
    }

    async fn delete_document(
        &self,
        collection: &str,
        document_id: &str,
        tenant_id: Option<&str>,
    ) -> Result<()> {
        let mut filter =
            Filter::new().and_match("document_id", Value::String(document_id.to_string()));
        if let Some(tenant) = tenant_id {
            filter = Filter::for_tenant(tenant).and(filter);
        }
        self.delete_by_filter(collection, filter).await
    }

    async fn count(&self, collection: &str, filter: Option<Filter>) -> Result<usize> {
        let url = self.url(&format!("/collections/{collection}/points/count"));
        let body = match filter {
            Some(filter) => json!({ "filter": filter, "exact": true }),
            None => json!({ "exact": true }),
        };
        let result: CountResult = self
            .send_with_retry("count", || self.client.post(&url).json(&body))
            .await?;
        Ok(result.count)
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        let url = self.url("/collections");
        let listing: CollectionListing = self
            .send_with_retry("list_collections", || self.client.get(&url))
            .await?;
        Ok(listing.collections.into_iter().map(|c| c.name).collect())
    }

    async fn collection_info(&self, name: &str) -> Result<CollectionInfo> {
        let url = self.url(&format!("/collections/{name}"));
        let info: Value = self
            .send_with_retry("collection_info", || self.client.get(&url))
            .await?;

        let dimension = info
            .pointer("/config/params/vectors/size")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let distance = info
            .pointer("/config/params/vectors/distance")
            .and_then(Value::as_str)
            .unwrap_or("Cosine");
        let points_count = info
            .pointer("/points_count")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        Ok(CollectionInfo {
            name: name.to_string(),
            dimension: usize::try_from(dimension).unwrap_or(0),
            points_count: usize::try_from(points_count).unwrap_or(0),
            distance: distance.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let index = HttpVectorIndex::new(VectorIndexConfig {
            max_retry_delay_ms: 5000,
            ..VectorIndexConfig::default()
        });

        let first = index.backoff_delay(0);
        assert!(first >= Duration::from_millis(400) && first <= Duration::from_millis(600));

        // 500 * 2^6 = 32000ms, capped at 5000 before jitter
        let late = index.backoff_delay(6);
        assert!(late <= Duration::from_millis(6000));
        assert!(late >= Duration::from_millis(4000));
    }

    #[test]
    fn test_point_wire_format() {
        let point = VectorPoint::new("doc-1_0", vec![0.1, 0.2])
            .with_payload("tenant_id", json!("acme"));
        let wire = HttpVectorIndex::point_to_wire(&point);
        assert_eq!(wire["id"], "doc-1_0");
        assert_eq!(wire["payload"]["tenant_id"], "acme");
    }

    #[test]
    fn test_base_url_from_config() {
        let index = HttpVectorIndex::new(VectorIndexConfig {
            host: "vectors.internal".to_string(),
            http_port: 7443,
            use_https: true,
            ..VectorIndexConfig::default()
        });
        assert_eq!(index.url("/collections"), "https://vectors.internal:7443/collections");
    }
}
