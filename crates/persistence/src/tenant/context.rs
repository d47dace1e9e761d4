//! Tenant context for storage operations.
//!
//! This module defines [`TenantContext`], the resolved tenant a storage call is
//! made on behalf of. Every tenant-scoped storage operation takes one, so no
//! code path can reach tenant data without naming a tenant first.

use super::id::TenantId;
use crate::error::TenantError;

/// A resolved tenant context required for all tenant-scoped storage operations.
///
/// Contexts are built per request and passed by value or reference; nothing
/// about them is stored globally.
///
/// ```
/// use wayfarer_persistence::tenant::{TenantContext, TenantId};
///
/// let ctx = TenantContext::new(TenantId::new(1))
///     .with_correlation_id("req-7")
///     .with_user_id(12);
/// assert_eq!(ctx.tenant_id(), TenantId::new(1));
/// assert_eq!(ctx.user_id(), Some(12));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    /// The tenant identifier.
    tenant_id: TenantId,
    /// Optional correlation ID for request tracing.
    correlation_id: Option<String>,
    /// Optional acting user for audit purposes.
    user_id: Option<i64>,
}

impl TenantContext {
    /// Creates a new tenant context.
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            correlation_id: None,
            user_id: None,
        }
    }

    /// Creates a context with the specified correlation ID for tracing.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Creates a context with the specified acting user.
    pub fn with_user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Returns the tenant ID.
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns the correlation ID, if set.
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Returns the acting user, if set.
    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    /// Checks that a record owned by `owner` may be touched through this context.
    ///
    /// Only an exact tenant match passes; there is no shared or parent tenant.
    pub fn check_access(&self, owner: TenantId, kind: &str, id: &str) -> Result<(), TenantError> {
        if self.tenant_id == owner {
            Ok(())
        } else {
            Err(TenantError::AccessDenied {
                tenant_id: self.tenant_id,
                kind: kind.to_string(),
                id: id.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_tenant_allowed() {
        let ctx = TenantContext::new(TenantId::new(1));
        assert!(ctx.check_access(TenantId::new(1), "Lead", "5").is_ok());
    }

    #[test]
    fn test_other_tenant_denied() {
        let ctx = TenantContext::new(TenantId::new(1));
        let err = ctx.check_access(TenantId::new(2), "Deal", "9").unwrap_err();
        assert!(matches!(
            err,
            TenantError::AccessDenied { tenant_id, .. } if tenant_id == TenantId::new(1)
        ));
    }

    #[test]
    fn test_builders() {
        let ctx = TenantContext::new(TenantId::new(4)).with_correlation_id("abc");
        assert_eq!(ctx.correlation_id(), Some("abc"));
        assert_eq!(ctx.user_id(), None);
    }
}
