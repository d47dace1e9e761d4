//! Host-based tenant resolution.
//!
//! Every request is mapped to at most one tenant by the host it was sent to.
//! The host is taken from the first source that provides one:
//!
//! 1. `X-Tenant-Domain` header, only when
//!    [`ServerConfig::allow_domain_header`](crate::ServerConfig::allow_domain_header)
//!    is set
//! 2. `Host` header
//! 3. URI authority
//!
//! The host is then matched against tenant domains with the configured
//! [`DomainMatch`](wayfarer_persistence::DomainMatch) mode. Not finding a
//! tenant is not an error here: the request carries no tenant, list
//! operations come back empty and object operations are refused.
//!
//! # Example
//!
//! ```rust,ignore
//! use wayfarer_rest::tenant::TenantResolver;
//!
//! let resolver = TenantResolver::new(&config);
//! if let Some(tenant) = resolver.resolve(storage, &parts, config.domain_match).await? {
//!     println!("Tenant: {} ({})", tenant.id, tenant.domain);
//! }
//! ```

mod resolver;
mod source;

pub use resolver::{
    AuthorityTenantExtractor, DomainHeaderTenantExtractor, HostHeaderTenantExtractor,
    TenantResolver, TenantSourceExtractor, X_TENANT_DOMAIN,
};
pub use source::TenantSource;
