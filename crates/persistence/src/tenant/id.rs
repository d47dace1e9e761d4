//! Tenant identifier type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The storage-assigned identifier of a tenant.
///
/// Every tenant-scoped row carries one of these. It is only ever taken from a
/// resolved [`TenantContext`](super::TenantContext), never from a request body.
///
/// # Examples
///
/// ```
/// use wayfarer_persistence::tenant::TenantId;
///
/// let tenant = TenantId::new(42);
/// assert_eq!(tenant.value(), 42);
/// assert_eq!(tenant.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(i64);

impl TenantId {
    /// Creates a tenant ID from its raw value.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TenantId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for TenantId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}
