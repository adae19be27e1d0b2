//! Temporal query evaluation over per-triple version logs
//!
//! The store keeps one ordered version log per `(tenant, triple_id)`; this
//! module turns a [`TemporalTripleQuery`] into selected version records,
//! materialized triples, and consecutive-pair diffs. Evaluation is pure and
//! non-suspending.

use smartinsight_core::{ChangeType, TripleVersion};
use tracing::trace;

use crate::types::{
    TemporalQueryResult, TemporalSelector, TemporalTripleQuery, TripleQuery, VersionDiff,
};

/// Whether a version record satisfies the structural sub-query fields
fn version_matches_base(version: &TripleVersion, base: &TripleQuery) -> bool {
    if let Some(subject) = &base.subject_id {
        if &version.subject_id != subject {
            return false;
        }
    }
    if let Some(predicate) = &base.predicate_uri {
        if &version.predicate_uri != predicate {
            return false;
        }
    }
    if let Some(object) = &base.object_id {
        if &version.object_id != object {
            return false;
        }
    }
    if let Some(graph) = &base.graph_uri {
        if &version.graph_uri != graph {
            return false;
        }
    }
    if let Some(min_confidence) = base.min_confidence {
        if version.confidence < min_confidence {
            return false;
        }
    }
    if let Some(is_verified) = base.is_verified {
        if version.is_verified != is_verified {
            return false;
        }
    }
    if let Some(document_id) = &base.source_document_id {
        if version.source_document_id.as_deref() != Some(document_id.as_str()) {
            return false;
        }
    }
    if let Some(after) = base.created_after {
        if version.created_at <= after {
            return false;
        }
    }
    if let Some(before) = base.created_before {
        if version.created_at >= before {
            return false;
        }
    }
    true
}

/// A triple participates when any of its versions matches the sub-query;
/// the time selector then operates over the triple's full log.
fn log_matches_base(log: &[TripleVersion], base: &TripleQuery) -> bool {
    log.iter().any(|v| version_matches_base(v, base))
}

/// Apply the time selector to one triple's log (sorted by version number)
fn select_versions<'a>(
    log: &'a [TripleVersion],
    query: &TemporalTripleQuery,
) -> Vec<&'a TripleVersion> {
    match &query.selector {
        TemporalSelector::Version(n) => log
            .iter()
            .filter(|v| v.version_number == *n)
            .collect(),
        TemporalSelector::AsOf(instant) => {
            let latest = log
                .iter()
                .filter(|v| v.created_at <= *instant)
                .max_by_key(|v| v.version_number);
            match latest {
                Some(v) if v.change_type == ChangeType::Deletion && !query.include_deleted => {
                    Vec::new()
                }
                Some(v) => vec![v],
                None => Vec::new(),
            }
        }
        TemporalSelector::Range { from, to } => {
            let in_range: Vec<&TripleVersion> = log
                .iter()
                .filter(|v| v.created_at >= *from && v.created_at <= *to)
                .collect();
            if query.include_all_versions {
                in_range
            } else {
                in_range
                    .into_iter()
                    .max_by_key(|v| v.version_number)
                    .map_or_else(Vec::new, |v| vec![v])
            }
        }
        TemporalSelector::Current => {
            let latest = log.iter().max_by_key(|v| v.version_number);
            match latest {
                Some(v) if v.change_type == ChangeType::Deletion && !query.include_deleted => {
                    Vec::new()
                }
                Some(v) => vec![v],
                None => Vec::new(),
            }
        }
    }
}

/// Change-metadata filters, applied after the time selector
fn passes_change_filters(version: &TripleVersion, query: &TemporalTripleQuery) -> bool {
    if let Some(user_id) = &query.changed_by_user_id {
        if version.changed_by_user_id.as_deref() != Some(user_id.as_str()) {
            return false;
        }
    }
    if !query.change_types.is_empty() && !query.change_types.contains(&version.change_type) {
        return false;
    }
    true
}

/// Evaluate a temporal query over the tenant's version logs
///
/// `logs` holds one sorted log per triple. The caller stamps
/// `query_time_ms` on the returned result.
pub(crate) fn evaluate(
    logs: &[Vec<TripleVersion>],
    query: &TemporalTripleQuery,
) -> TemporalQueryResult {
    let mut result = TemporalQueryResult::default();

    for log in logs {
        if log.is_empty() || !log_matches_base(log, &query.base) {
            continue;
        }

        let mut selected: Vec<&TripleVersion> = select_versions(log, query)
            .into_iter()
            .filter(|v| passes_change_filters(v, query))
            .collect();
        if selected.is_empty() {
            continue;
        }

        result.total_count += selected.len();
        trace!(
            triple_id = %log[0].triple_id,
            selected = selected.len(),
            "temporal selection"
        );

        // The per-triple cap only applies when all versions are requested;
        // the collapsed form already keeps exactly one.
        if query.include_all_versions && query.max_versions_per_triple > 0 {
            selected.sort_by(|a, b| b.version_number.cmp(&a.version_number));
            selected.truncate(query.max_versions_per_triple);
            selected.reverse();
        }

        if matches!(query.selector, TemporalSelector::AsOf(_)) {
            for version in &selected {
                if version.change_type != ChangeType::Deletion {
                    result.triples.push(version.to_triple());
                }
            }
        }

        if query.diff_only && query.include_all_versions {
            for pair in selected.windows(2) {
                result.diffs.push(VersionDiff::between(pair[0], pair[1]));
            }
        } else {
            result
                .versions
                .extend(selected.into_iter().rev().cloned());
        }
    }

    result
}
