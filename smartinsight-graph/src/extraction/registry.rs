//! Registry of relation extractors

use std::sync::Arc;
use tracing::{debug, warn};

use super::{
    CooccurrenceRelationExtractor, PatternRelationExtractor, RelationExtractor,
    SchemaRelationExtractor,
};

/// Ordered collection of relation extractors
///
/// Registration order is preserved; the pipeline invokes extractors in that
/// order and attributes results to them by name.
#[derive(Default)]
pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn RelationExtractor>>,
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("extractors", &self.names())
            .finish()
    }
}

impl ExtractorRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the shipped extractors
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PatternRelationExtractor::new()));
        registry.register(Arc::new(CooccurrenceRelationExtractor::new()));
        registry.register(Arc::new(SchemaRelationExtractor::new()));
        registry
    }

    /// Append an extractor, keeping registration order
    pub fn register(&mut self, extractor: Arc<dyn RelationExtractor>) {
        debug!(name = extractor.name(), "extractor registered");
        self.extractors.push(extractor);
    }

    /// Look up an extractor by exact name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn RelationExtractor>> {
        self.extractors.iter().find(|e| e.name() == name).cloned()
    }

    /// Registered extractor names in order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    /// Select extractors whose name contains any filter token
    ///
    /// Matching is case-insensitive. An empty selection falls back to all
    /// registered extractors with a warning, so a typo in the filter never
    /// silently disables extraction.
    #[must_use]
    pub fn select(&self, filter: Option<&[String]>) -> Vec<Arc<dyn RelationExtractor>> {
        let Some(tokens) = filter else {
            return self.extractors.clone();
        };
        let tokens: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();

        let selected: Vec<Arc<dyn RelationExtractor>> = self
            .extractors
            .iter()
            .filter(|e| {
                let name = e.name().to_lowercase();
                tokens.iter().any(|t| name.contains(t))
            })
            .cloned()
            .collect();

        if selected.is_empty() {
            warn!(?tokens, "extractor filter matched nothing; using all extractors");
            self.extractors.clone()
        } else {
            selected
        }
    }

    /// Number of registered extractors
    #[must_use]
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_preserve_registration_order() {
        let registry = ExtractorRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["pattern", "cooccurrence", "schema"]);
    }

    #[test]
    fn test_select_is_case_insensitive() {
        let registry = ExtractorRegistry::with_defaults();
        let selected = registry.select(Some(&["PATTERN".to_string()]));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name(), "pattern");
    }

    #[test]
    fn test_empty_selection_falls_back_to_all() {
        let registry = ExtractorRegistry::with_defaults();
        let selected = registry.select(Some(&["no-such-extractor".to_string()]));
        assert_eq!(selected.len(), registry.len());
    }
}
