//! Core record storage trait.
//!
//! This module defines the [`RecordStorage`] trait, which provides CRUD over
//! the tenant-scoped record collections. Every operation requires a
//! [`TenantContext`]; there is no variant that reads or writes records without
//! naming the tenant it acts for.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageResult;
use crate::tenant::{TenantContext, TenantId};
use crate::types::{ListQuery, Page, RefTarget, ResourceKind, StoredRecord};

/// Tenant-scoped CRUD over CRM records.
///
/// # Tenant Isolation
///
/// Implementations must:
///
/// - stamp new records with `tenant.tenant_id()` and never with a value from the body
/// - return only the caller's records, and count only them, from [`list`](Self::list)
/// - answer object operations on another tenant's record with
///   [`TenantError::AccessDenied`](crate::error::TenantError::AccessDenied)
/// - reject references to rows outside the caller's tenant
///
/// # Deletion
///
/// Deleting a record applies the reference rules of the schema transitively
/// in one transaction: cascading referrers are deleted, nullable referrers are
/// cleared.
#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// Returns a human-readable backend name, e.g. `"sqlite"`.
    fn backend_name(&self) -> &'static str;

    /// Confirms the store is reachable and ready to serve requests.
    async fn health_check(&self) -> StorageResult<()>;

    /// Returns the tenant owning the given row, or `None` if it does not exist.
    ///
    /// Only the owner is disclosed so the caller's access gate can compare it
    /// with the request tenant; row content never leaves this call.
    async fn owner_of(
        &self,
        tenant: &TenantContext,
        target: RefTarget,
        id: i64,
    ) -> StorageResult<Option<TenantId>>;

    /// Validates and stores a new record.
    async fn create(
        &self,
        tenant: &TenantContext,
        kind: ResourceKind,
        body: Value,
    ) -> StorageResult<StoredRecord>;

    /// Reads a record by id.
    async fn read(
        &self,
        tenant: &TenantContext,
        kind: ResourceKind,
        id: i64,
    ) -> StorageResult<Option<StoredRecord>>;

    /// Replaces the content of an existing record.
    async fn update(
        &self,
        tenant: &TenantContext,
        kind: ResourceKind,
        id: i64,
        body: Value,
    ) -> StorageResult<StoredRecord>;

    /// Applies a JSON merge patch to an existing record.
    async fn patch(
        &self,
        tenant: &TenantContext,
        kind: ResourceKind,
        id: i64,
        patch: Value,
    ) -> StorageResult<StoredRecord>;

    /// Deletes a record and applies reference rules to its referrers.
    async fn delete(&self, tenant: &TenantContext, kind: ResourceKind, id: i64)
    -> StorageResult<()>;

    /// Lists the caller's records of a kind, oldest first.
    async fn list(
        &self,
        tenant: &TenantContext,
        kind: ResourceKind,
        query: ListQuery,
    ) -> StorageResult<Page<StoredRecord>>;
}
