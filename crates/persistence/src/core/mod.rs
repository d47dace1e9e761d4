//! Storage traits.
//!
//! - [`RecordStorage`]: tenant-scoped CRUD over CRM records
//! - [`TenantDirectory`]: tenant registry and host resolution
//! - [`UserDirectory`]: principals
//! - [`SessionStore`]: refresh tokens
//!
//! [`CrmStorage`] bundles all four and is what the HTTP layer is generic over.

mod directory;
mod session;
mod storage;

pub use directory::{TenantDirectory, UserDirectory};
pub use session::SessionStore;
pub use storage::RecordStorage;

/// Everything the CRM needs from a backend.
pub trait CrmStorage: RecordStorage + TenantDirectory + UserDirectory + SessionStore {}

impl<T> CrmStorage for T where T: RecordStorage + TenantDirectory + UserDirectory + SessionStore {}
