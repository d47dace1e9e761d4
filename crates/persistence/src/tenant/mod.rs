//! Tenant identity, records and host matching.
//!
//! Every tenant-scoped storage operation takes a [`TenantContext`]. Contexts
//! are derived per request from the inbound host (see [`DomainMatch`]) and
//! never from request bodies.

mod context;
mod domain;
mod id;
mod record;

pub use context::TenantContext;
pub use domain::{DomainMatch, MAX_HOST_LEN, normalize_domain, normalize_host};
pub use id::TenantId;
pub use record::{DEFAULT_SUBSCRIPTION_TIER, NewTenant, Tenant, TenantUpdate};
