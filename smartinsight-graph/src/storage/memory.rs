//! In-memory versioned triple store
//!
//! All state lives in tenant-keyed concurrent maps; mutations to one triple
//! are serialized by a per-`(tenant, triple_id)` async lock so version
//! numbers stay strictly increasing. Versioning failures during a
//! structural mutation are logged and swallowed, keeping the store
//! available when the versioning substrate degrades; persistent backends
//! are expected to fail the mutation instead.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::json;
use smartinsight_core::{ontology, tenant::ensure_tenant, ChangeType, Triple, TripleVersion};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{GraphError, Result};
use crate::sparql::{self, SparqlResult};
use crate::traits::TripleStore;
use crate::types::{
    GraphStatistics, Snapshot, SnapshotInfo, TemporalQueryResult, TemporalTripleQuery,
    TripleQuery, TripleQueryResult, TripleSortKey, VersionDiff,
};

use super::temporal;

/// Composite map key: `(tenant_id, local id)`
type Key = (String, String);

/// In-memory triple store with graphs, version logs, and snapshots
pub struct InMemoryTripleStore {
    config: crate::types::TripleStoreConfig,

    /// `(tenant, graph_uri)` -> ids of triples in the graph
    graphs: DashMap<Key, HashSet<String>>,

    /// `(tenant, triple_id)` -> live triple
    triples: DashMap<Key, Triple>,

    /// `(tenant, triple_id)` -> version log sorted by version number
    versions: DashMap<Key, Vec<TripleVersion>>,

    /// `(tenant, snapshot name)` -> frozen snapshot
    snapshots: DashMap<Key, Snapshot>,

    /// Per-`(tenant, triple_id)` mutation locks
    write_locks: DashMap<Key, Arc<Mutex<()>>>,
}

impl Default for InMemoryTripleStore {
    fn default() -> Self {
        Self::new(crate::types::TripleStoreConfig::default())
    }
}

impl std::fmt::Debug for InMemoryTripleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTripleStore")
            .field("triples", &self.triples.len())
            .field("graphs", &self.graphs.len())
            .field("snapshots", &self.snapshots.len())
            .finish()
    }
}

impl InMemoryTripleStore {
    /// Create an empty store with the given configuration
    #[must_use]
    pub fn new(config: crate::types::TripleStoreConfig) -> Self {
        Self {
            config,
            graphs: DashMap::new(),
            triples: DashMap::new(),
            versions: DashMap::new(),
            snapshots: DashMap::new(),
            write_locks: DashMap::new(),
        }
    }

    fn key(tenant_id: &str, local: &str) -> Key {
        (tenant_id.to_string(), local.to_string())
    }

    fn lock_for(&self, tenant_id: &str, triple_id: &str) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(Self::key(tenant_id, triple_id))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Validate and normalize an incoming triple for the given tenant
    fn normalize(&self, mut triple: Triple, tenant_id: &str) -> Result<Triple> {
        if triple.tenant_id.is_empty() {
            triple.tenant_id = tenant_id.to_string();
        } else if triple.tenant_id != tenant_id {
            return Err(GraphError::invalid_argument(
                "triple tenant_id does not match the calling tenant",
            ));
        }
        if triple.subject_id.trim().is_empty() || triple.predicate_uri.trim().is_empty() {
            return Err(GraphError::invalid_argument(
                "subject_id and predicate_uri must not be empty",
            ));
        }
        if !(0.0..=1.0).contains(&triple.confidence) {
            return Err(GraphError::invalid_argument(format!(
                "confidence {} outside [0, 1]",
                triple.confidence
            )));
        }

        triple.subject_id = ontology::normalize_uri(&triple.subject_id);
        triple.predicate_uri = ontology::normalize_uri(&triple.predicate_uri);
        if !triple.is_literal {
            triple.object_id = ontology::normalize_uri(&triple.object_id);
        }
        if triple.graph_uri.trim().is_empty() {
            triple.graph_uri = self.config.default_graph_uri.clone().unwrap_or_else(|| {
                ontology::default_graph_uri(tenant_id)
            });
        }
        Ok(triple)
    }

    /// Append a version record, surfacing any failure to the caller
    ///
    /// Call sites treat a failure as non-fatal for the structural mutation.
    fn record_version(
        &self,
        tenant_id: &str,
        triple: &Triple,
        version_number: u32,
        change_type: ChangeType,
        user_id: Option<&str>,
        comment: Option<&str>,
    ) -> std::result::Result<(), String> {
        let version = TripleVersion::from_triple(
            triple,
            version_number,
            change_type,
            user_id.map(String::from),
            comment.map(String::from),
        );

        let mut log = self
            .versions
            .entry(Self::key(tenant_id, &triple.id))
            .or_default();
        if log.last().is_some_and(|last| last.version_number >= version_number) {
            return Err(format!(
                "version {version_number} not above current head for triple {}",
                triple.id
            ));
        }
        log.push(version);
        Ok(())
    }

    fn record_version_best_effort(
        &self,
        tenant_id: &str,
        triple: &Triple,
        version_number: u32,
        change_type: ChangeType,
        user_id: Option<&str>,
        comment: Option<&str>,
    ) {
        if let Err(e) =
            self.record_version(tenant_id, triple, version_number, change_type, user_id, comment)
        {
            warn!(triple_id = %triple.id, error = %e, "versioning failed; structural mutation kept");
        }
    }

    fn next_version_number(&self, tenant_id: &str, triple_id: &str) -> u32 {
        self.versions
            .get(&Self::key(tenant_id, triple_id))
            .and_then(|log| log.last().map(|v| v.version_number))
            .map_or(1, |n| n + 1)
    }

    fn attach_to_graph(&self, tenant_id: &str, graph_uri: &str, triple_id: &str) {
        self.graphs
            .entry(Self::key(tenant_id, graph_uri))
            .or_default()
            .insert(triple_id.to_string());
    }

    fn detach_from_graph(&self, tenant_id: &str, graph_uri: &str, triple_id: &str) {
        if let Some(mut members) = self.graphs.get_mut(&Self::key(tenant_id, graph_uri)) {
            members.remove(triple_id);
        }
    }

    /// Shared insertion path for add, snapshot restore, and graph rebuilds
    async fn insert_internal(
        &self,
        triple: Triple,
        tenant_id: &str,
        change_type: ChangeType,
        comment: Option<&str>,
    ) -> Result<String> {
        let mut triple = self.normalize(triple, tenant_id)?;
        if triple.id.is_empty() {
            triple.id = Uuid::new_v4().to_string();
        }

        let lock = self.lock_for(tenant_id, &triple.id);
        let _guard = lock.lock().await;

        let key = Self::key(tenant_id, &triple.id);
        if self.triples.contains_key(&key) {
            return Err(GraphError::invalid_argument(format!(
                "triple {} already exists",
                triple.id
            )));
        }

        triple.version = self.next_version_number(tenant_id, &triple.id);
        self.attach_to_graph(tenant_id, &triple.graph_uri, &triple.id);
        self.triples.insert(key, triple.clone());
        self.record_version_best_effort(
            tenant_id,
            &triple,
            triple.version,
            change_type,
            None,
            comment,
        );

        debug!(triple_id = %triple.id, graph = %triple.graph_uri, "triple inserted");
        Ok(triple.id)
    }

    /// Remove one triple while holding its lock, recording a Deletion
    async fn remove_internal(
        &self,
        triple_id: &str,
        tenant_id: &str,
        comment: Option<&str>,
    ) -> Result<Triple> {
        let lock = self.lock_for(tenant_id, triple_id);
        let _guard = lock.lock().await;

        let key = Self::key(tenant_id, triple_id);
        let (_, previous) = self.triples.remove(&key).ok_or_else(|| {
            GraphError::not_found(format!("triple not found: {triple_id}"))
        })?;

        self.detach_from_graph(tenant_id, &previous.graph_uri, triple_id);
        let deletion_version = previous.version + 1;
        self.record_version_best_effort(
            tenant_id,
            &previous,
            deletion_version,
            ChangeType::Deletion,
            None,
            comment,
        );
        Ok(previous)
    }

    fn matches(query: &TripleQuery, triple: &Triple) -> bool {
        if let Some(subject) = &query.subject_id {
            if &triple.subject_id != subject {
                return false;
            }
        }
        if let Some(predicate) = &query.predicate_uri {
            if &triple.predicate_uri != predicate {
                return false;
            }
        }
        if let Some(object) = &query.object_id {
            if &triple.object_id != object {
                return false;
            }
        }
        if let Some(graph) = &query.graph_uri {
            if &triple.graph_uri != graph {
                return false;
            }
        }
        if let Some(min_confidence) = query.min_confidence {
            if triple.confidence < min_confidence {
                return false;
            }
        }
        if let Some(is_verified) = query.is_verified {
            if triple.is_verified != is_verified {
                return false;
            }
        }
        if let Some(document_id) = &query.source_document_id {
            if triple.source_document_id.as_deref() != Some(document_id.as_str()) {
                return false;
            }
        }
        if let Some(after) = query.created_after {
            if triple.created_at <= after {
                return false;
            }
        }
        if let Some(before) = query.created_before {
            if triple.created_at >= before {
                return false;
            }
        }
        true
    }

    fn sort_triples(triples: &mut [Triple], key: TripleSortKey, ascending: bool) {
        triples.sort_by(|a, b| {
            let ordering = match key {
                TripleSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                TripleSortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                TripleSortKey::Confidence => a
                    .confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal),
                TripleSortKey::SubjectId => a.subject_id.cmp(&b.subject_id),
                TripleSortKey::PredicateUri => a.predicate_uri.cmp(&b.predicate_uri),
                TripleSortKey::ObjectId => a.object_id.cmp(&b.object_id),
                TripleSortKey::Id => a.id.cmp(&b.id),
                TripleSortKey::Version => a.version.cmp(&b.version),
            };
            if ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
    }

    fn tenant_triples(&self, tenant_id: &str) -> Vec<Triple> {
        self.triples
            .iter()
            .filter(|entry| entry.key().0 == tenant_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn graph_members(&self, tenant_id: &str, graph_uri: &str) -> Option<Vec<String>> {
        self.graphs
            .get(&Self::key(tenant_id, graph_uri))
            .map(|members| members.iter().cloned().collect())
    }
}

#[async_trait]
impl TripleStore for InMemoryTripleStore {
    async fn add_triple(&self, triple: Triple, tenant_id: &str) -> Result<String> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        self.insert_internal(triple, tenant_id, ChangeType::Creation, None)
            .await
    }

    async fn add_triples(&self, triples: Vec<Triple>, tenant_id: &str) -> Result<usize> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        let total = triples.len();
        let mut stored = 0;
        for triple in triples {
            match self
                .insert_internal(triple, tenant_id, ChangeType::Creation, None)
                .await
            {
                Ok(_) => stored += 1,
                Err(e) => warn!(error = %e, "batch element rejected"),
            }
        }
        info!(stored, total, "triple batch applied");
        Ok(stored)
    }

    async fn get_triple(&self, triple_id: &str, tenant_id: &str) -> Result<Triple> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        self.triples
            .get(&Self::key(tenant_id, triple_id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| GraphError::not_found(format!("triple not found: {triple_id}")))
    }

    async fn update_triple(&self, triple: Triple, tenant_id: &str) -> Result<()> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        if triple.id.is_empty() {
            return Err(GraphError::invalid_argument("triple id required for update"));
        }
        let mut updated = self.normalize(triple, tenant_id)?;

        let lock = self.lock_for(tenant_id, &updated.id);
        let _guard = lock.lock().await;

        let key = Self::key(tenant_id, &updated.id);
        let previous = self
            .triples
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                GraphError::not_found(format!("triple not found: {}", updated.id))
            })?;

        updated.created_at = previous.created_at;
        updated.updated_at = Utc::now();
        updated.version = previous.version + 1;

        if updated.graph_uri != previous.graph_uri {
            self.detach_from_graph(tenant_id, &previous.graph_uri, &updated.id);
            self.attach_to_graph(tenant_id, &updated.graph_uri, &updated.id);
        }
        self.triples.insert(key, updated.clone());
        self.record_version_best_effort(
            tenant_id,
            &updated,
            updated.version,
            ChangeType::Update,
            None,
            None,
        );
        Ok(())
    }

    async fn remove_triple(&self, triple_id: &str, tenant_id: &str) -> Result<()> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        self.remove_internal(triple_id, tenant_id, None).await?;
        Ok(())
    }

    async fn query(&self, query: &TripleQuery, tenant_id: &str) -> Result<TripleQueryResult> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        let started = Instant::now();

        let mut matched: Vec<Triple> = self
            .tenant_triples(tenant_id)
            .into_iter()
            .filter(|t| Self::matches(query, t))
            .collect();
        Self::sort_triples(&mut matched, query.sort_by, query.sort_ascending);

        let total_count = matched.len();
        let has_more = query
            .limit
            .is_some_and(|limit| total_count > query.offset + limit);
        let triples: Vec<Triple> = matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(TripleQueryResult {
            triples,
            total_count,
            has_more,
            query_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }

    async fn query_temporal(
        &self,
        query: &TemporalTripleQuery,
        tenant_id: &str,
    ) -> Result<TemporalQueryResult> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        let started = Instant::now();

        let logs: Vec<Vec<TripleVersion>> = self
            .versions
            .iter()
            .filter(|entry| entry.key().0 == tenant_id)
            .map(|entry| entry.value().clone())
            .collect();

        let mut result = temporal::evaluate(&logs, query);
        result.query_time_ms =
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Ok(result)
    }

    async fn execute_sparql(&self, query: &str, tenant_id: &str) -> Result<SparqlResult> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        let parsed = sparql::parse(query)?;
        let dataset = self.tenant_triples(tenant_id);
        let timeout = Duration::from_secs(self.config.query_timeout_seconds);

        let tenant = tenant_id.to_string();
        let handle =
            tokio::task::spawn_blocking(move || sparql::execute(&parsed, &dataset, &tenant));
        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(GraphError::Query(format!(
                "SPARQL execution aborted: {join_error}"
            ))),
            Err(_) => Err(GraphError::Query(format!(
                "SPARQL query timed out after {}s",
                self.config.query_timeout_seconds
            ))),
        }
    }

    async fn create_graph(&self, graph_uri: &str, tenant_id: &str) -> Result<()> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        if graph_uri.trim().is_empty() {
            return Err(GraphError::invalid_argument("graph_uri must not be empty"));
        }
        let uri = ontology::normalize_uri(graph_uri);
        self.graphs.entry(Self::key(tenant_id, &uri)).or_default();
        Ok(())
    }

    async fn remove_graph(&self, graph_uri: &str, tenant_id: &str) -> Result<usize> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        let uri = ontology::normalize_uri(graph_uri);
        let members = self
            .graph_members(tenant_id, &uri)
            .ok_or_else(|| GraphError::not_found(format!("graph not found: {uri}")))?;

        let mut removed = 0;
        for triple_id in members {
            if self
                .remove_internal(&triple_id, tenant_id, Some("Graph removed"))
                .await
                .is_ok()
            {
                removed += 1;
            }
        }
        self.graphs.remove(&Self::key(tenant_id, &uri));
        info!(graph = %uri, removed, "graph removed");
        Ok(removed)
    }

    async fn list_graphs(&self, tenant_id: &str) -> Result<Vec<String>> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        let mut uris: Vec<String> = self
            .graphs
            .iter()
            .filter(|entry| entry.key().0 == tenant_id)
            .map(|entry| entry.key().1.clone())
            .collect();
        uris.sort();
        Ok(uris)
    }

    async fn statistics(&self, tenant_id: &str) -> Result<GraphStatistics> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        let triples = self.tenant_triples(tenant_id);

        let mut stats = GraphStatistics {
            triple_count: triples.len(),
            ..GraphStatistics::default()
        };
        let mut subjects = HashSet::new();
        let mut predicates = HashSet::new();
        let mut objects = HashSet::new();
        let mut confidence_sum = 0.0;

        for triple in &triples {
            subjects.insert(triple.subject_id.as_str());
            predicates.insert(triple.predicate_uri.as_str());
            objects.insert(triple.object_id.as_str());
            if triple.is_literal {
                stats.literal_count += 1;
            }
            if triple.is_verified {
                stats.verified_count += 1;
            }
            confidence_sum += triple.confidence;
            stats.last_updated = Some(
                stats
                    .last_updated
                    .map_or(triple.updated_at, |t| t.max(triple.updated_at)),
            );
            *stats
                .triples_per_graph
                .entry(triple.graph_uri.clone())
                .or_default() += 1;
        }

        stats.graph_count = self
            .graphs
            .iter()
            .filter(|entry| entry.key().0 == tenant_id)
            .count();
        stats.distinct_subjects = subjects.len();
        stats.distinct_predicates = predicates.len();
        stats.distinct_objects = objects.len();
        #[allow(clippy::cast_precision_loss)]
        if !triples.is_empty() {
            stats.mean_confidence = confidence_sum / triples.len() as f64;
        }
        Ok(stats)
    }

    async fn history(
        &self,
        triple_id: &str,
        tenant_id: &str,
        max: usize,
    ) -> Result<Vec<TripleVersion>> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        let log = self
            .versions
            .get(&Self::key(tenant_id, triple_id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                GraphError::not_found(format!("no history for triple: {triple_id}"))
            })?;

        let mut newest_first: Vec<TripleVersion> = log.into_iter().rev().collect();
        if max > 0 {
            newest_first.truncate(max);
        }
        Ok(newest_first)
    }

    async fn version(
        &self,
        triple_id: &str,
        version_number: u32,
        tenant_id: &str,
    ) -> Result<TripleVersion> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        self.versions
            .get(&Self::key(tenant_id, triple_id))
            .and_then(|log| {
                log.iter()
                    .find(|v| v.version_number == version_number)
                    .cloned()
            })
            .ok_or_else(|| {
                GraphError::not_found(format!(
                    "version {version_number} of triple {triple_id} not found"
                ))
            })
    }

    async fn diff(
        &self,
        triple_id: &str,
        from_version: u32,
        to_version: u32,
        tenant_id: &str,
    ) -> Result<VersionDiff> {
        if from_version >= to_version {
            return Err(GraphError::invalid_argument(format!(
                "from_version {from_version} must be below to_version {to_version}"
            )));
        }
        let from = self.version(triple_id, from_version, tenant_id).await?;
        let to = self.version(triple_id, to_version, tenant_id).await?;
        Ok(VersionDiff::between(&from, &to))
    }

    async fn restore_version(
        &self,
        triple_id: &str,
        version_number: u32,
        tenant_id: &str,
        user_id: Option<&str>,
        comment: Option<&str>,
    ) -> Result<Triple> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;

        let lock = self.lock_for(tenant_id, triple_id);
        let _guard = lock.lock().await;

        let key = Self::key(tenant_id, triple_id);
        let (target, latest) = {
            let log = self.versions.get(&key).ok_or_else(|| {
                GraphError::not_found(format!("no history for triple: {triple_id}"))
            })?;
            let target = log
                .iter()
                .find(|v| v.version_number == version_number)
                .cloned()
                .ok_or_else(|| {
                    GraphError::not_found(format!(
                        "version {version_number} of triple {triple_id} not found"
                    ))
                })?;
            let latest = log.last().map_or(0, |v| v.version_number);
            (target, latest)
        };

        let mut restored = target.to_triple();
        restored.version = latest + 1;
        restored.provenance.insert(
            "RestoredFromVersion".to_string(),
            json!(version_number),
        );
        restored.provenance.insert(
            "RestorationTime".to_string(),
            json!(Utc::now().to_rfc3339()),
        );
        restored
            .provenance
            .insert("RestoredByUser".to_string(), json!(user_id));

        if let Some(previous) = self.triples.get(&key).map(|entry| entry.value().clone()) {
            restored.created_at = previous.created_at;
            if previous.graph_uri != restored.graph_uri {
                self.detach_from_graph(tenant_id, &previous.graph_uri, triple_id);
            }
        }
        self.attach_to_graph(tenant_id, &restored.graph_uri, triple_id);
        self.triples.insert(key, restored.clone());
        self.record_version_best_effort(
            tenant_id,
            &restored,
            restored.version,
            ChangeType::Restoration,
            user_id,
            comment,
        );

        info!(triple_id, from_version = version_number, "version restored");
        Ok(restored)
    }

    async fn create_snapshot(
        &self,
        name: &str,
        tenant_id: &str,
        graph_uris: Option<Vec<String>>,
    ) -> Result<SnapshotInfo> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        if name.trim().is_empty() {
            return Err(GraphError::invalid_argument("snapshot name must not be empty"));
        }
        let key = Self::key(tenant_id, name);
        if self.snapshots.contains_key(&key) {
            return Err(GraphError::invalid_argument(format!(
                "snapshot already exists: {name}"
            )));
        }

        let scope: Vec<String> = match &graph_uris {
            Some(uris) => {
                let normalized: Vec<String> =
                    uris.iter().map(|u| ontology::normalize_uri(u)).collect();
                for uri in &normalized {
                    if !self.graphs.contains_key(&Self::key(tenant_id, uri)) {
                        return Err(GraphError::not_found(format!("graph not found: {uri}")));
                    }
                }
                normalized
            }
            None => self.list_graphs(tenant_id).await?,
        };

        let mut frozen: Vec<Triple> = Vec::new();
        for graph_uri in &scope {
            if let Some(members) = self.graph_members(tenant_id, graph_uri) {
                for triple_id in members {
                    if let Some(triple) = self.triples.get(&Self::key(tenant_id, &triple_id)) {
                        frozen.push(triple.value().clone());
                    }
                }
            }
        }
        frozen.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let snapshot = Snapshot {
            name: name.to_string(),
            tenant_id: tenant_id.to_string(),
            created_at: Utc::now(),
            graph_uris: graph_uris.map(|_| scope.clone()),
            frozen_triples: frozen,
        };
        let info = SnapshotInfo::from(&snapshot);
        self.snapshots.insert(key, snapshot);
        info!(snapshot = name, triples = info.triple_count, "snapshot created");
        Ok(info)
    }

    async fn restore_snapshot(&self, name: &str, tenant_id: &str) -> Result<usize> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        let snapshot = self
            .snapshots
            .get(&Self::key(tenant_id, name))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| GraphError::not_found(format!("snapshot not found: {name}")))?;

        // Clear every graph the snapshot references before replaying it.
        let mut referenced: HashSet<String> = snapshot
            .frozen_triples
            .iter()
            .map(|t| t.graph_uri.clone())
            .collect();
        if let Some(uris) = &snapshot.graph_uris {
            referenced.extend(uris.iter().cloned());
        }
        for graph_uri in &referenced {
            if let Some(members) = self.graph_members(tenant_id, graph_uri) {
                for triple_id in members {
                    let _ = self
                        .remove_internal(
                            &triple_id,
                            tenant_id,
                            Some("Cleared by snapshot restore"),
                        )
                        .await;
                }
            }
        }

        let comment = format!("Restored from snapshot '{name}'");
        let mut restored = 0;
        for triple in snapshot.frozen_triples {
            match self
                .insert_internal(triple, tenant_id, ChangeType::Restoration, Some(&comment))
                .await
            {
                Ok(_) => restored += 1,
                Err(e) => warn!(error = %e, "snapshot triple skipped"),
            }
        }
        info!(snapshot = name, restored, "snapshot restored");
        Ok(restored)
    }

    async fn list_snapshots(&self, tenant_id: &str) -> Result<Vec<SnapshotInfo>> {
        ensure_tenant(tenant_id).map_err(GraphError::Core)?;
        let mut infos: Vec<SnapshotInfo> = self
            .snapshots
            .iter()
            .filter(|entry| entry.key().0 == tenant_id)
            .map(|entry| SnapshotInfo::from(entry.value()))
            .collect();
        infos.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(infos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartinsight_core::KnowledgeError;

    fn store() -> InMemoryTripleStore {
        InMemoryTripleStore::default()
    }

    fn sample(tenant: &str, id: &str, object: &str) -> Triple {
        Triple::new(
            tenant,
            "http://smartinsight.com/entity/e1",
            "http://smartinsight.com/ontology/worksFor",
            object,
            "",
        )
        .with_id(id)
    }

    #[tokio::test]
    async fn test_add_assigns_default_graph_and_version() {
        let store = store();
        let id = store
            .add_triple(sample("acme", "", "e2"), "acme")
            .await
            .unwrap();

        let triple = store.get_triple(&id, "acme").await.unwrap();
        assert_eq!(triple.version, 1);
        assert_eq!(
            triple.graph_uri,
            "http://smartinsight.com/graph/tenant/acme"
        );
        // Bare object URI picks up the default scheme
        assert_eq!(triple.object_id, "http://e2");
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = store();
        store
            .add_triple(sample("acme", "t-1", "e2"), "acme")
            .await
            .unwrap();
        let err = store
            .add_triple(sample("acme", "t-1", "e3"), "acme")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::Core(KnowledgeError::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_records_history() {
        let store = store();
        store
            .add_triple(sample("acme", "t-1", "e2"), "acme")
            .await
            .unwrap();

        let mut updated = store.get_triple("t-1", "acme").await.unwrap();
        updated.object_id = "http://e3".to_string();
        store.update_triple(updated, "acme").await.unwrap();

        let live = store.get_triple("t-1", "acme").await.unwrap();
        assert_eq!(live.version, 2);

        let history = store.history("t-1", "acme", 0).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].change_type, ChangeType::Update);
        assert_eq!(history[1].change_type, ChangeType::Creation);
    }

    #[tokio::test]
    async fn test_remove_records_previous_values() {
        let store = store();
        store
            .add_triple(sample("acme", "t-1", "e2"), "acme")
            .await
            .unwrap();
        store.remove_triple("t-1", "acme").await.unwrap();

        assert!(store.get_triple("t-1", "acme").await.is_err());
        let history = store.history("t-1", "acme", 1).await.unwrap();
        assert_eq!(history[0].change_type, ChangeType::Deletion);
        assert_eq!(history[0].object_id, "http://e2");
        assert_eq!(history[0].version_number, 2);
    }

    #[tokio::test]
    async fn test_cross_tenant_lookup_is_not_found() {
        let store = store();
        store
            .add_triple(sample("acme", "t-1", "e2"), "acme")
            .await
            .unwrap();

        let err = store.get_triple("t-1", "globex").await.unwrap_err();
        assert!(matches!(
            err,
            GraphError::Core(KnowledgeError::NotFound { .. })
        ));
        assert!(store.remove_triple("t-1", "globex").await.is_err());
        assert!(store.get_triple("t-1", "acme").await.is_ok());
    }

    #[tokio::test]
    async fn test_query_filters_sorts_and_paginates() {
        let store = store();
        for i in 0..5 {
            let triple = sample("acme", &format!("t-{i}"), "e2")
                .with_confidence(0.5 + 0.1 * f64::from(i));
            store.add_triple(triple, "acme").await.unwrap();
        }

        let query = TripleQuery::new()
            .with_min_confidence(0.65)
            .sorted_by(TripleSortKey::Confidence, true)
            .paginate(0, 2);
        let result = store.query(&query, "acme").await.unwrap();

        assert_eq!(result.total_count, 3);
        assert_eq!(result.triples.len(), 2);
        assert!(result.has_more);
        assert!(result.triples[0].confidence < result.triples[1].confidence);
    }

    #[tokio::test]
    async fn test_remove_graph_cascades() {
        let store = store();
        store
            .add_triple(sample("acme", "t-1", "e2"), "acme")
            .await
            .unwrap();
        store
            .add_triple(sample("acme", "t-2", "e3"), "acme")
            .await
            .unwrap();

        let graph = "http://smartinsight.com/graph/tenant/acme";
        let removed = store.remove_graph(graph, "acme").await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.get_triple("t-1", "acme").await.is_err());
        assert!(store.list_graphs("acme").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_diff_requires_increasing_versions() {
        let store = store();
        store
            .add_triple(sample("acme", "t-1", "e2"), "acme")
            .await
            .unwrap();
        let err = store.diff("t-1", 2, 1, "acme").await.unwrap_err();
        assert!(matches!(
            err,
            GraphError::Core(KnowledgeError::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn test_restore_version_appends_restoration() {
        let store = store();
        store
            .add_triple(sample("acme", "t-1", "e2"), "acme")
            .await
            .unwrap();
        let mut updated = store.get_triple("t-1", "acme").await.unwrap();
        updated.object_id = "http://e3".to_string();
        store.update_triple(updated, "acme").await.unwrap();

        let restored = store
            .restore_version("t-1", 1, "acme", Some("alice"), Some("rollback"))
            .await
            .unwrap();
        assert_eq!(restored.version, 3);
        assert_eq!(restored.object_id, "http://e2");
        assert_eq!(restored.provenance["RestoredFromVersion"], json!(1));
        assert_eq!(restored.provenance["RestoredByUser"], json!("alice"));

        let history = store.history("t-1", "acme", 1).await.unwrap();
        assert_eq!(history[0].change_type, ChangeType::Restoration);
    }

    #[tokio::test]
    async fn test_statistics_aggregates() {
        let store = store();
        store
            .add_triple(sample("acme", "t-1", "e2").with_confidence(0.8), "acme")
            .await
            .unwrap();
        store
            .add_triple(
                Triple::new("acme", "e1", "p2", "a literal", "")
                    .with_id("t-2")
                    .as_literal(None)
                    .with_confidence(0.4),
                "acme",
            )
            .await
            .unwrap();

        let stats = store.statistics("acme").await.unwrap();
        assert_eq!(stats.triple_count, 2);
        assert_eq!(stats.literal_count, 1);
        assert_eq!(stats.distinct_subjects, 2);
        assert!((stats.mean_confidence - 0.6).abs() < 1e-9);
        assert_eq!(stats.graph_count, 1);
    }
}
