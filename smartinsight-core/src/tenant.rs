//! Tenant isolation helpers
//!
//! The platform trusts the `tenant_id` handed to it; every record carries
//! the id verbatim and every read filters by it. These helpers keep the
//! boundary checks uniform across crates.

use crate::error::{KnowledgeError, Result};

/// Fail fast on an empty or whitespace-only tenant id
///
/// # Errors
///
/// Returns `InvalidArgument` when the tenant id is empty.
pub fn ensure_tenant(tenant_id: &str) -> Result<()> {
    if tenant_id.trim().is_empty() {
        return Err(KnowledgeError::invalid_argument("tenant_id must not be empty"));
    }
    Ok(())
}

/// Check record ownership, surfacing a mismatch without leaking existence
///
/// # Errors
///
/// Returns `TenantMismatch` when the owner differs from the caller. Callers
/// at external boundaries convert this via [`KnowledgeError::for_caller`].
pub fn ensure_owner(caller: &str, owner: &str, what: &str) -> Result<()> {
    if caller == owner {
        Ok(())
    } else {
        Err(KnowledgeError::TenantMismatch {
            message: what.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tenant_rejected() {
        assert!(ensure_tenant("").is_err());
        assert!(ensure_tenant("  ").is_err());
        assert!(ensure_tenant("acme").is_ok());
    }

    #[test]
    fn test_owner_check() {
        assert!(ensure_owner("a", "a", "triple t-1").is_ok());
        let err = ensure_owner("a", "b", "triple t-1").unwrap_err();
        assert!(matches!(err, KnowledgeError::TenantMismatch { .. }));
    }
}
