//! Query, result, snapshot, and configuration types for the triple store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smartinsight_core::{ChangeType, Triple, TripleVersion};
use std::collections::HashMap;

/// Sort key for structural queries
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum TripleSortKey {
    #[default]
    CreatedAt,
    UpdatedAt,
    Confidence,
    SubjectId,
    PredicateUri,
    ObjectId,
    Id,
    Version,
}

/// Structural query over live triples
///
/// All fields are optional; unset fields do not constrain the result. The
/// tenant is passed separately to the store operation and is never part of
/// the query itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripleQuery {
    /// Match subject URI exactly
    pub subject_id: Option<String>,

    /// Match predicate URI exactly
    pub predicate_uri: Option<String>,

    /// Match object URI or literal form exactly
    pub object_id: Option<String>,

    /// Restrict to one named graph
    pub graph_uri: Option<String>,

    /// Keep triples with confidence >= this bound
    pub min_confidence: Option<f64>,

    /// Match verification flag
    pub is_verified: Option<bool>,

    /// Match source document
    pub source_document_id: Option<String>,

    /// Keep triples created strictly after this instant
    pub created_after: Option<DateTime<Utc>>,

    /// Keep triples created strictly before this instant
    pub created_before: Option<DateTime<Utc>>,

    /// Sort key (default: creation time)
    pub sort_by: TripleSortKey,

    /// Ascending sort; default is newest-first
    pub sort_ascending: bool,

    /// Pagination offset
    pub offset: usize,

    /// Pagination limit; `None` returns everything past the offset
    pub limit: Option<usize>,
}

impl TripleQuery {
    /// Create an empty query matching all triples of the tenant
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by subject URI
    #[must_use]
    pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }

    /// Filter by predicate URI
    #[must_use]
    pub fn with_predicate(mut self, predicate_uri: impl Into<String>) -> Self {
        self.predicate_uri = Some(predicate_uri.into());
        self
    }

    /// Filter by object URI or literal form
    #[must_use]
    pub fn with_object(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }

    /// Restrict to one named graph
    #[must_use]
    pub fn with_graph(mut self, graph_uri: impl Into<String>) -> Self {
        self.graph_uri = Some(graph_uri.into());
        self
    }

    /// Keep triples at or above a confidence bound
    #[must_use]
    pub const fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }

    /// Filter by verification flag
    #[must_use]
    pub const fn with_verified(mut self, is_verified: bool) -> Self {
        self.is_verified = Some(is_verified);
        self
    }

    /// Filter by source document
    #[must_use]
    pub fn with_source_document(mut self, document_id: impl Into<String>) -> Self {
        self.source_document_id = Some(document_id.into());
        self
    }

    /// Keep triples created within the given window
    #[must_use]
    pub const fn created_between(
        mut self,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Self {
        self.created_after = Some(after);
        self.created_before = Some(before);
        self
    }

    /// Set the sort key and direction
    #[must_use]
    pub const fn sorted_by(mut self, key: TripleSortKey, ascending: bool) -> Self {
        self.sort_by = key;
        self.sort_ascending = ascending;
        self
    }

    /// Paginate the result
    #[must_use]
    pub const fn paginate(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

/// Result of a structural query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripleQueryResult {
    /// Matching triples in sort order, after pagination
    pub triples: Vec<Triple>,

    /// Total matches before pagination
    pub total_count: usize,

    /// Whether more matches exist past `offset + limit`
    pub has_more: bool,

    /// Wall-clock execution time
    pub query_time_ms: u64,
}

/// Time selector for temporal queries; exactly one applies per query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TemporalSelector {
    /// Exact version number match
    Version(u32),

    /// Latest version at or before the given instant
    AsOf(DateTime<Utc>),

    /// Versions created within the closed interval
    Range {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },

    /// Latest version per triple
    Current,
}

/// Temporal query combining a structural sub-query with a time selector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalTripleQuery {
    /// Structural filters applied to version records
    pub base: TripleQuery,

    /// The time dimension of the query
    pub selector: TemporalSelector,

    /// Keep versions changed by this user
    pub changed_by_user_id: Option<String>,

    /// Keep versions whose change type is in this set; empty keeps all
    pub change_types: Vec<ChangeType>,

    /// Include versions whose change type is Deletion
    pub include_deleted: bool,

    /// Return every matching version instead of collapsing per triple
    ///
    /// `max_versions_per_triple` only applies when this is set; with the
    /// per-triple collapse active the cap is ignored.
    pub include_all_versions: bool,

    /// With `include_all_versions`, keep only the N newest versions per
    /// triple; 0 means unlimited
    pub max_versions_per_triple: usize,

    /// With `include_all_versions`, emit consecutive-pair diffs per triple
    /// instead of the version records themselves
    pub diff_only: bool,
}

impl TemporalTripleQuery {
    /// Query against a time selector with no structural filters
    #[must_use]
    pub fn new(selector: TemporalSelector) -> Self {
        Self {
            base: TripleQuery::default(),
            selector,
            changed_by_user_id: None,
            change_types: Vec::new(),
            include_deleted: false,
            include_all_versions: false,
            max_versions_per_triple: 0,
            diff_only: false,
        }
    }

    /// Attach a structural sub-query
    #[must_use]
    pub fn with_base(mut self, base: TripleQuery) -> Self {
        self.base = base;
        self
    }

    /// Keep versions changed by the given user
    #[must_use]
    pub fn changed_by(mut self, user_id: impl Into<String>) -> Self {
        self.changed_by_user_id = Some(user_id.into());
        self
    }

    /// Keep versions with the given change types
    #[must_use]
    pub fn with_change_types(mut self, change_types: Vec<ChangeType>) -> Self {
        self.change_types = change_types;
        self
    }

    /// Include Deletion versions in the result
    #[must_use]
    pub const fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    /// Return every matching version, optionally capped per triple
    #[must_use]
    pub const fn all_versions(mut self, max_per_triple: usize) -> Self {
        self.include_all_versions = true;
        self.max_versions_per_triple = max_per_triple;
        self
    }

    /// Emit consecutive-pair diffs instead of version records
    #[must_use]
    pub const fn diffs_only(mut self) -> Self {
        self.diff_only = true;
        self
    }
}

/// Result of a temporal query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemporalQueryResult {
    /// Version records passing all filters (empty when `diff_only`)
    pub versions: Vec<TripleVersion>,

    /// Live triples implied by an as-of selector
    pub triples: Vec<Triple>,

    /// Consecutive-pair diffs when `diff_only` was requested
    pub diffs: Vec<VersionDiff>,

    /// Number of version records matched before per-triple caps
    pub total_count: usize,

    /// Wall-clock execution time
    pub query_time_ms: u64,
}

/// A single property transition between two versions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyChange<T> {
    pub from: T,
    pub to: T,
}

impl<T: Clone + PartialEq> PropertyChange<T> {
    /// `Some(change)` when the values differ, `None` otherwise
    fn between(from: &T, to: &T) -> Option<Self> {
        if from == to {
            None
        } else {
            Some(Self {
                from: from.clone(),
                to: to.clone(),
            })
        }
    }
}

/// Field-by-field difference between two versions of one triple
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionDiff {
    pub triple_id: String,
    pub from_version: u32,
    pub to_version: u32,
    pub subject: Option<PropertyChange<String>>,
    pub predicate: Option<PropertyChange<String>>,
    pub object: Option<PropertyChange<String>>,
    pub is_literal: Option<PropertyChange<bool>>,
    pub literal_data_type: Option<PropertyChange<Option<String>>>,
    pub language_tag: Option<PropertyChange<Option<String>>>,
    pub graph_uri: Option<PropertyChange<String>>,
    pub confidence: Option<PropertyChange<f64>>,
    pub source_document_id: Option<PropertyChange<Option<String>>>,
    pub is_verified: Option<PropertyChange<bool>>,
}

impl VersionDiff {
    /// Compute the field-level differences between two version records
    #[must_use]
    pub fn between(from: &TripleVersion, to: &TripleVersion) -> Self {
        Self {
            triple_id: to.triple_id.clone(),
            from_version: from.version_number,
            to_version: to.version_number,
            subject: PropertyChange::between(&from.subject_id, &to.subject_id),
            predicate: PropertyChange::between(&from.predicate_uri, &to.predicate_uri),
            object: PropertyChange::between(&from.object_id, &to.object_id),
            is_literal: PropertyChange::between(&from.is_literal, &to.is_literal),
            literal_data_type: PropertyChange::between(
                &from.literal_data_type,
                &to.literal_data_type,
            ),
            language_tag: PropertyChange::between(&from.language_tag, &to.language_tag),
            graph_uri: PropertyChange::between(&from.graph_uri, &to.graph_uri),
            confidence: PropertyChange::between(&from.confidence, &to.confidence),
            source_document_id: PropertyChange::between(
                &from.source_document_id,
                &to.source_document_id,
            ),
            is_verified: PropertyChange::between(&from.is_verified, &to.is_verified),
        }
    }

    /// Whether the two versions differ in any tracked field
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.subject.is_some()
            || self.predicate.is_some()
            || self.object.is_some()
            || self.is_literal.is_some()
            || self.literal_data_type.is_some()
            || self.language_tag.is_some()
            || self.graph_uri.is_some()
            || self.confidence.is_some()
            || self.source_document_id.is_some()
            || self.is_verified.is_some()
    }
}

/// Immutable frozen copy of a tenant's graphs at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot name, unique per tenant
    pub name: String,

    /// Owning tenant
    pub tenant_id: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Graphs frozen into the snapshot; `None` means all tenant graphs
    pub graph_uris: Option<Vec<String>>,

    /// Frozen triples in insertion order
    pub frozen_triples: Vec<Triple>,
}

/// Snapshot metadata without the frozen triples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub name: String,
    pub tenant_id: String,
    pub created_at: DateTime<Utc>,
    pub graph_uris: Option<Vec<String>>,
    pub triple_count: usize,
}

impl From<&Snapshot> for SnapshotInfo {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            name: snapshot.name.clone(),
            tenant_id: snapshot.tenant_id.clone(),
            created_at: snapshot.created_at,
            graph_uris: snapshot.graph_uris.clone(),
            triple_count: snapshot.frozen_triples.len(),
        }
    }
}

/// Aggregate statistics over a tenant's graphs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub graph_count: usize,
    pub triple_count: usize,
    pub distinct_subjects: usize,
    pub distinct_predicates: usize,
    pub distinct_objects: usize,
    pub literal_count: usize,
    pub verified_count: usize,
    pub mean_confidence: f64,
    pub last_updated: Option<DateTime<Utc>>,

    /// Triple count per named graph
    pub triples_per_graph: HashMap<String, usize>,
}

/// Triple store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripleStoreConfig {
    /// Graph used when an inserted triple names none; `None` falls back to
    /// the per-tenant default graph URI
    pub default_graph_uri: Option<String>,

    /// SPARQL execution timeout in seconds
    pub query_timeout_seconds: u64,
}

impl Default for TripleStoreConfig {
    fn default() -> Self {
        Self {
            default_graph_uri: None,
            query_timeout_seconds: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartinsight_core::Triple;

    #[test]
    fn test_query_builder() {
        let query = TripleQuery::new()
            .with_subject("http://a/s")
            .with_min_confidence(0.7)
            .sorted_by(TripleSortKey::Confidence, true)
            .paginate(10, 20);

        assert_eq!(query.subject_id.as_deref(), Some("http://a/s"));
        assert_eq!(query.offset, 10);
        assert_eq!(query.limit, Some(20));
        assert!(query.sort_ascending);
    }

    #[test]
    fn test_version_diff_reports_only_changed_fields() {
        let t1 = Triple::new("acme", "s", "p", "o1", "g").with_id("t-1");
        let mut t2 = t1.clone();
        t2.object_id = "o2".to_string();
        t2.confidence = 0.4;

        let v1 = TripleVersion::from_triple(&t1, 1, ChangeType::Creation, None, None);
        let v2 = TripleVersion::from_triple(&t2, 2, ChangeType::Update, None, None);

        let diff = VersionDiff::between(&v1, &v2);
        assert!(diff.has_changes());
        assert!(diff.subject.is_none());
        assert!(diff.predicate.is_none());
        assert_eq!(diff.object.as_ref().unwrap().to, "o2");
        assert_eq!(diff.confidence.as_ref().unwrap().from, 1.0);
    }

    #[test]
    fn test_snapshot_info_drops_frozen_triples() {
        let snapshot = Snapshot {
            name: "nightly".to_string(),
            tenant_id: "acme".to_string(),
            created_at: Utc::now(),
            graph_uris: None,
            frozen_triples: vec![Triple::new("acme", "s", "p", "o", "g")],
        };

        let info = SnapshotInfo::from(&snapshot);
        assert_eq!(info.triple_count, 1);
        assert_eq!(info.name, "nightly");
    }
}
