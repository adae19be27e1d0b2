//! Error types for triple store and pipeline operations

use smartinsight_core::KnowledgeError;
use thiserror::Error;

/// Result type alias for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur in the knowledge graph subsystem
#[derive(Debug, Error)]
pub enum GraphError {
    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(String),

    /// SPARQL parse error
    #[error("SPARQL parse error: {0}")]
    SparqlParse(String),

    /// Versioning substrate error
    #[error("Versioning error: {0}")]
    Versioning(String),

    /// Extraction error
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] KnowledgeError),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<String> for GraphError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for GraphError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl GraphError {
    /// Invalid-argument shorthand routed through the core error enum
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::Core(KnowledgeError::invalid_argument(message))
    }

    /// Not-found shorthand routed through the core error enum
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Core(KnowledgeError::not_found(message))
    }

    /// Collapse tenant mismatches before the error leaves the store
    #[must_use]
    pub fn for_caller(self) -> Self {
        match self {
            Self::Core(inner) => Self::Core(inner.for_caller()),
            other => other,
        }
    }
}
