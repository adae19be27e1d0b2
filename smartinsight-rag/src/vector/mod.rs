//! Tenant-isolated vector index client
//!
//! The [`VectorIndex`] trait is the single seam between the platform and
//! the index: a remote REST implementation for deployments and an
//! in-process implementation for tests and embedded use. Every search
//! injects a must-match `tenant_id` condition; additional filters are
//! AND-combined, never substituted.

pub mod http;
pub mod memory;
pub mod types;

use async_trait::async_trait;
use smartinsight_core::Result;
use tokio_util::sync::CancellationToken;

pub use http::HttpVectorIndex;
pub use memory::InMemoryVectorIndex;
pub use types::{CollectionInfo, FieldCondition, Filter, MatchValue, SearchHit, VectorPoint};

/// Typed client over a vector index
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Whether a collection exists
    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Create a collection with cosine distance and keyword payload
    /// indexes on `tenant_id` and `document_id`
    ///
    /// Creation is serialized; concurrent callers see the collection
    /// appear exactly once.
    async fn create_collection(&self, name: &str, dimension: usize) -> Result<()>;

    /// Upsert points in batches; applied in input order
    ///
    /// # Returns
    /// The number of points written
    async fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
        cancel: &CancellationToken,
    ) -> Result<usize>;

    /// Similarity search restricted to one tenant
    ///
    /// `extra_filter` conditions are AND-combined with the injected
    /// tenant condition.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        tenant_id: &str,
        limit: usize,
        score_threshold: Option<f32>,
        extra_filter: Option<Filter>,
    ) -> Result<Vec<SearchHit>>;

    /// Delete points by id, optionally restricted to a tenant
    async fn delete_points(
        &self,
        collection: &str,
        ids: &[String],
        tenant_id: Option<&str>,
    ) -> Result<()>;

    /// Delete every point matching a filter
    async fn delete_by_filter(&self, collection: &str, filter: Filter) -> Result<()>;

    /// Delete all chunks of one document
    async fn delete_document(
        &self,
        collection: &str,
        document_id: &str,
        tenant_id: Option<&str>,
    ) -> Result<()>;

    /// Count points, optionally filtered
    async fn count(&self, collection: &str, filter: Option<Filter>) -> Result<usize>;

    /// Names of all collections
    async fn list_collections(&self) -> Result<Vec<String>>;

    /// Collection metadata
    async fn collection_info(&self, name: &str) -> Result<CollectionInfo>;
}
