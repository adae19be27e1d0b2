//! Error types shared across the knowledge platform core

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, KnowledgeError>;

/// Semantic error kinds for all knowledge platform operations
///
/// Callers match on the kind, not the message. `TenantMismatch` must be
/// surfaced as `NotFound` at external boundaries so that existence of
/// another tenant's data is never leaked.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    /// Null/empty required inputs, malformed ranges, non-positive sizes
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Unknown triple id, snapshot name, graph uri, or collection
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// A lookup resolved to data owned by a different tenant
    #[error("Tenant mismatch: {message}")]
    TenantMismatch { message: String },

    /// Vector length does not match the collection's dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Network/timeout/5xx failures that are retried according to policy
    #[error("Transient error: {message}")]
    Transient {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Invariant violation, visible only after retries are exhausted
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// The operation's cancellation handle was triggered
    #[error("Operation canceled")]
    Canceled,

    /// Storage backend failure
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl KnowledgeError {
    /// Invalid-argument error from any displayable message
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Not-found error from any displayable message
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Transient error without an underlying source
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            source: None,
        }
    }

    /// Internal error from any displayable message
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether a retry policy may re-attempt the failed operation
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// Collapse `TenantMismatch` into `NotFound` for external callers
    #[must_use]
    pub fn for_caller(self) -> Self {
        match self {
            Self::TenantMismatch { message } => Self::NotFound { message },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_mismatch_not_leaked() {
        let err = KnowledgeError::TenantMismatch {
            message: "triple t-1".to_string(),
        };
        assert!(matches!(
            err.for_caller(),
            KnowledgeError::NotFound { .. }
        ));
    }

    #[test]
    fn test_transient_classification() {
        assert!(KnowledgeError::transient("503").is_transient());
        assert!(!KnowledgeError::internal("bug").is_transient());
    }
}
