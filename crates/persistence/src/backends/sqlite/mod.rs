//! SQLite backend implementation.
//!
//! Implements every storage trait on top of a pooled SQLite database. Both
//! in-memory databases (for tests) and file databases are supported.
//!
//! # Example
//!
//! ```no_run
//! use wayfarer_persistence::backends::sqlite::SqliteBackend;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::open("./data/wayfarer.db")?;
//! backend.init_schema()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE tenants (id, name, domain UNIQUE, subscription_tier, settings, created_at);
//! CREATE TABLE users   (id, tenant_id -> tenants ON DELETE CASCADE, email UNIQUE, role, ...);
//! CREATE TABLE records (id, tenant_id -> tenants ON DELETE CASCADE, kind, data, created_at, updated_at);
//! CREATE TABLE refresh_tokens (id, user_id -> users ON DELETE CASCADE, expires_at, revoked, replaced_by, created_at);
//! ```
//!
//! Record bodies are JSON in `records.data`. References between records are
//! checked and cascaded by the backend rather than by SQL foreign keys, since
//! they live inside the JSON.

mod backend;
mod directory;
mod schema;
mod session;
mod storage;

pub use backend::{SqliteBackend, SqliteBackendConfig};
pub use schema::SCHEMA_VERSION;
