//! Wayfarer Persistence Layer
//!
//! Tenant-scoped storage for the Wayfarer travel-agency CRM: tenants, their
//! users, and the nine CRM record kinds (leads, customers, deals,
//! communications, packages, bookings, integrations, campaigns and
//! conversations).
//!
//! # Architecture
//!
//! - [`tenant`] - tenant identity, records and host matching
//! - [`identity`] - principals, roles and refresh tokens
//! - [`types`] - record kinds, field schema, stored records, pagination
//! - [`error`] - error types for all operations
//! - [`core`] - storage traits
//! - [`scope`] - per-request view of storage that fails closed
//! - [`backends`] - backend implementations
//!
//! # Multitenancy
//!
//! Every record operation takes a [`TenantContext`]. Backends only ever
//! return rows owned by that tenant; a row owned by anyone else is reported
//! as [`TenantError::AccessDenied`](error::TenantError::AccessDenied), which
//! callers treat as "not found".
//!
//! ```
//! use wayfarer_persistence::tenant::{TenantContext, TenantId};
//!
//! let ctx = TenantContext::new(TenantId::new(1)).with_correlation_id("req-1");
//! assert!(ctx.check_access(TenantId::new(1), "Lead", "7").is_ok());
//! assert!(ctx.check_access(TenantId::new(2), "Lead", "7").is_err());
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use serde_json::json;
//! use wayfarer_persistence::backends::sqlite::SqliteBackend;
//! use wayfarer_persistence::core::{RecordStorage, TenantDirectory};
//! use wayfarer_persistence::tenant::{NewTenant, TenantContext};
//! use wayfarer_persistence::types::ResourceKind;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::in_memory()?;
//! backend.init_schema()?;
//!
//! let tenant = backend
//!     .create_tenant(NewTenant::new("Demo Travel Co", "demo.travelco"))
//!     .await?;
//! let ctx = TenantContext::new(tenant.id);
//!
//! let lead = backend
//!     .create(
//!         &ctx,
//!         ResourceKind::Lead,
//!         json!({"first_name": "Ada", "last_name": "Lovelace", "email": "ada@example.com"}),
//!     )
//!     .await?;
//! assert_eq!(lead.content()["status"], "new");
//! # Ok(())
//! # }
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod error;
pub mod identity;
pub mod scope;
pub mod tenant;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{StorageError, StorageResult};
pub use identity::{Role, UserRecord};
pub use scope::TenantScope;
pub use tenant::{DomainMatch, Tenant, TenantContext, TenantId};
pub use types::{ListQuery, Page, ResourceKind, StoredRecord};

// Re-export core traits
pub use core::{CrmStorage, RecordStorage, SessionStore, TenantDirectory, UserDirectory};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
