//! Point, filter, and result types for the vector index

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A vector index record: id, embedding, and payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, Value>,
}

impl VectorPoint {
    #[must_use]
    pub fn new(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            vector,
            payload: HashMap::new(),
        }
    }

    /// Add a payload field
    #[must_use]
    pub fn with_payload(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Replace the whole payload
    #[must_use]
    pub fn with_payload_map(mut self, payload: HashMap<String, Value>) -> Self {
        self.payload = payload;
        self
    }
}

/// One must-match condition on a payload field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldCondition {
    pub key: String,
    #[serde(rename = "match")]
    pub matches: MatchValue,
}

/// Exact-match value for a keyword-indexed payload field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchValue {
    pub value: Value,
}

/// AND-combined filter over payload fields
///
/// Every tenant-scoped operation injects a `tenant_id` condition here;
/// caller-supplied conditions are appended, never substituted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Filter {
    pub must: Vec<FieldCondition>,
}

impl Filter {
    /// Empty filter matching everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter pinned to one tenant
    #[must_use]
    pub fn for_tenant(tenant_id: &str) -> Self {
        Self::new().and_match("tenant_id", Value::String(tenant_id.to_string()))
    }

    /// Append an exact-match condition
    #[must_use]
    pub fn and_match(mut self, key: impl Into<String>, value: Value) -> Self {
        self.must.push(FieldCondition {
            key: key.into(),
            matches: MatchValue { value },
        });
        self
    }

    /// AND-combine with another filter's conditions
    #[must_use]
    pub fn and(mut self, other: Self) -> Self {
        self.must.extend(other.must);
        self
    }

    /// Whether a payload satisfies every condition
    #[must_use]
    pub fn matches(&self, payload: &HashMap<String, Value>) -> bool {
        self.must
            .iter()
            .all(|c| payload.get(&c.key) == Some(&c.matches.value))
    }
}

/// One search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub payload: HashMap<String, Value>,
}

/// Collection metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub dimension: usize,
    pub points_count: usize,
    pub distance: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_payload() {
        let filter = Filter::for_tenant("acme").and_match("document_id", json!("doc-1"));

        let mut payload = HashMap::new();
        payload.insert("tenant_id".to_string(), json!("acme"));
        payload.insert("document_id".to_string(), json!("doc-1"));
        assert!(filter.matches(&payload));

        payload.insert("tenant_id".to_string(), json!("globex"));
        assert!(!filter.matches(&payload));
    }

    #[test]
    fn test_filter_and_combines_conditions() {
        let combined = Filter::for_tenant("acme").and(Filter::new().and_match("k", json!("v")));
        assert_eq!(combined.must.len(), 2);
    }

    #[test]
    fn test_filter_wire_format_uses_match_key() {
        let filter = Filter::for_tenant("acme");
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["must"][0]["key"], "tenant_id");
        assert_eq!(json["must"][0]["match"]["value"], "acme");
    }
}
