//! Versioned triple store trait

use async_trait::async_trait;

use crate::error::Result;
use crate::sparql::SparqlResult;
use crate::types::{
    GraphStatistics, SnapshotInfo, TemporalQueryResult, TemporalTripleQuery, TripleQuery,
    TripleQueryResult, VersionDiff,
};
use smartinsight_core::{Triple, TripleVersion};

/// Durable (or in-memory) storage of triples with graphs, versions, and
/// snapshots
///
/// Every operation is scoped to the calling tenant: reads filter by tenant,
/// and a lookup that resolves to another tenant's data reports `NotFound`
/// rather than revealing its existence. Mutations to one triple are
/// serialized per `(tenant_id, triple_id)` so version numbers form a
/// strictly increasing sequence starting at 1.
///
/// Implementations backed by persistent storage should fail a mutation
/// whose version record cannot be written; the in-memory variant instead
/// logs and keeps the structural mutation (availability over auditability).
#[async_trait]
pub trait TripleStore: Send + Sync {
    /// Add a triple, assigning an id when missing
    ///
    /// The triple lands in its named graph (or the configured/tenant
    /// default) and a Creation version with number 1 is recorded.
    ///
    /// # Returns
    /// The id of the stored triple
    async fn add_triple(&self, triple: Triple, tenant_id: &str) -> Result<String>;

    /// Add a batch of triples with per-element semantics
    ///
    /// Elements are applied in input order; a failing element is skipped
    /// and does not abort the batch.
    ///
    /// # Returns
    /// The number of triples stored
    async fn add_triples(&self, triples: Vec<Triple>, tenant_id: &str) -> Result<usize>;

    /// Fetch the live triple by id
    async fn get_triple(&self, triple_id: &str, tenant_id: &str) -> Result<Triple>;

    /// Replace the live record, bumping the version and recording an
    /// Update version
    async fn update_triple(&self, triple: Triple, tenant_id: &str) -> Result<()>;

    /// Remove the live record, recording a Deletion version that freezes
    /// the previously-live values
    async fn remove_triple(&self, triple_id: &str, tenant_id: &str) -> Result<()>;

    /// Structural query over live triples
    async fn query(&self, query: &TripleQuery, tenant_id: &str) -> Result<TripleQueryResult>;

    /// Temporal query over version history
    async fn query_temporal(
        &self,
        query: &TemporalTripleQuery,
        tenant_id: &str,
    ) -> Result<TemporalQueryResult>;

    /// Execute a SPARQL SELECT or CONSTRUCT query over the tenant's graphs
    ///
    /// The dataset is structurally restricted to the calling tenant; the
    /// configured query timeout is honored.
    async fn execute_sparql(&self, query: &str, tenant_id: &str) -> Result<SparqlResult>;

    /// Create a named graph; idempotent
    async fn create_graph(&self, graph_uri: &str, tenant_id: &str) -> Result<()>;

    /// Remove a graph and cascade to all triples within
    ///
    /// # Returns
    /// The number of triples removed
    async fn remove_graph(&self, graph_uri: &str, tenant_id: &str) -> Result<usize>;

    /// List the tenant's graph URIs
    async fn list_graphs(&self, tenant_id: &str) -> Result<Vec<String>>;

    /// Aggregate statistics over the tenant's graphs
    async fn statistics(&self, tenant_id: &str) -> Result<GraphStatistics>;

    /// The `max` newest versions of a triple, newest first
    async fn history(
        &self,
        triple_id: &str,
        tenant_id: &str,
        max: usize,
    ) -> Result<Vec<TripleVersion>>;

    /// A specific version of a triple
    async fn version(
        &self,
        triple_id: &str,
        version_number: u32,
        tenant_id: &str,
    ) -> Result<TripleVersion>;

    /// Field-level diff between two versions; requires `from < to`
    async fn diff(
        &self,
        triple_id: &str,
        from_version: u32,
        to_version: u32,
        tenant_id: &str,
    ) -> Result<VersionDiff>;

    /// Rebuild the live triple from a historical version
    ///
    /// The restored triple gets `version = latest + 1`, provenance keys
    /// `RestoredFromVersion`, `RestorationTime`, and `RestoredByUser`, and
    /// a Restoration version is recorded.
    async fn restore_version(
        &self,
        triple_id: &str,
        version_number: u32,
        tenant_id: &str,
        user_id: Option<&str>,
        comment: Option<&str>,
    ) -> Result<Triple>;

    /// Freeze the given graphs (or all tenant graphs) into a named snapshot
    async fn create_snapshot(
        &self,
        name: &str,
        tenant_id: &str,
        graph_uris: Option<Vec<String>>,
    ) -> Result<SnapshotInfo>;

    /// Replay a snapshot into live storage
    ///
    /// Each graph referenced by the snapshot is cleared, then every frozen
    /// triple is re-inserted with a Restoration version carrying the
    /// comment `Restored from snapshot '<name>'`.
    ///
    /// # Returns
    /// The number of triples restored
    async fn restore_snapshot(&self, name: &str, tenant_id: &str) -> Result<usize>;

    /// Snapshot metadata for the tenant, without frozen triples
    async fn list_snapshots(&self, tenant_id: &str) -> Result<Vec<SnapshotInfo>>;
}
