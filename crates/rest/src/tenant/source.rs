//! Tenant source identification.
//!
//! Defines where in a request the host used for tenant resolution came from.

use std::fmt;

/// Source from which the tenant host was extracted.
///
/// Sources are listed in the order the resolver tries them:
/// 1. `X-Tenant-Domain` header (development only)
/// 2. `Host` header
/// 3. URI authority (HTTP/2 requests without a `Host` header)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenantSource {
    /// Explicit `X-Tenant-Domain` header.
    DomainHeader,
    /// The `Host` header.
    Host,
    /// The authority of the request URI.
    Authority,
}

impl fmt::Display for TenantSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenantSource::DomainHeader => write!(f, "domain_header"),
            TenantSource::Host => write!(f, "host"),
            TenantSource::Authority => write!(f, "authority"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_display() {
        assert_eq!(TenantSource::DomainHeader.to_string(), "domain_header");
        assert_eq!(TenantSource::Host.to_string(), "host");
        assert_eq!(TenantSource::Authority.to_string(), "authority");
    }
}
