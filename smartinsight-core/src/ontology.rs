//! Ontology constants and URI helpers

/// Base URI for all predicate URIs in the closed relation vocabulary
pub const ONTOLOGY_BASE: &str = "http://smartinsight.com/ontology";

/// Root URI under which tenant graphs are named
pub const ONTOLOGY_ROOT: &str = "http://smartinsight.com";

/// Default graph URI for a tenant
#[must_use]
pub fn default_graph_uri(tenant_id: &str) -> String {
    format!("{ONTOLOGY_ROOT}/graph/tenant/{tenant_id}")
}

/// Normalize a URI by prepending a default scheme when none is present
///
/// Literals are never passed through here; only subject, predicate, and
/// non-literal object identifiers are normalized.
#[must_use]
pub fn normalize_uri(uri: &str) -> String {
    if uri.starts_with("http://") || uri.starts_with("https://") || uri.starts_with("urn:") {
        uri.to_string()
    } else {
        format!("http://{uri}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_graph_uri() {
        assert_eq!(
            default_graph_uri("acme"),
            "http://smartinsight.com/graph/tenant/acme"
        );
    }

    #[test]
    fn test_normalize_uri_prepends_scheme() {
        assert_eq!(normalize_uri("example.org/x"), "http://example.org/x");
        assert_eq!(normalize_uri("https://a/b"), "https://a/b");
        assert_eq!(normalize_uri("urn:uuid:1"), "urn:uuid:1");
    }
}
