//! HTTP request handlers.
//!
//! - [`health`] - liveness check
//! - [`auth`] - login, refresh, logout and the current principal
//! - [`tenant`] - the current tenant's profile
//! - [`users`] - principals of the current tenant
//! - [`records`] - the CRM record collections

pub mod auth;
pub mod health;
pub mod records;
pub mod tenant;
pub mod users;

// Re-export handlers for convenience
pub use auth::{login_handler, logout_handler, me_handler, refresh_handler};
pub use health::health_handler;
pub use records::{
    create_record_handler, delete_record_handler, list_records_handler, patch_record_handler,
    read_record_handler, update_record_handler,
};
pub use tenant::{get_tenant_handler, patch_tenant_handler};
pub use users::{
    create_user_handler, delete_user_handler, list_users_handler, patch_user_handler,
    read_user_handler, replace_user_handler,
};
