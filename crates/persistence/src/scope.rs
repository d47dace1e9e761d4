//! Tenant-scoped query layer.
//!
//! [`TenantScope`] is the view of storage a single request gets. It pairs a
//! backend with the request's resolved tenant, which may be absent. With no
//! tenant the scope fails closed: collection reads come back empty and every
//! object operation, including create, is refused.

use serde_json::Value;
use tracing::debug;

use crate::core::{RecordStorage, UserDirectory};
use crate::error::{StorageResult, TenantError};
use crate::identity::{NewUser, UserRecord, UserUpdate};
use crate::tenant::{TenantContext, TenantId};
use crate::types::{ListQuery, Page, RefTarget, ResourceKind, StoredRecord};

/// Storage restricted to one request's tenant.
///
/// ```ignore
/// let scope = TenantScope::new(&backend, ctx.tenant());
/// let page = scope.list(ResourceKind::Lead, ListQuery::default()).await?;
/// ```
pub struct TenantScope<'a, S: ?Sized> {
    storage: &'a S,
    tenant: Option<&'a TenantContext>,
}

impl<'a, S: ?Sized> Clone for TenantScope<'a, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, S: ?Sized> Copy for TenantScope<'a, S> {}

impl<'a, S> TenantScope<'a, S>
where
    S: RecordStorage + UserDirectory + ?Sized,
{
    /// Creates a scope for the given (possibly unresolved) tenant.
    pub fn new(storage: &'a S, tenant: Option<&'a TenantContext>) -> Self {
        Self { storage, tenant }
    }

    /// The tenant this scope is bound to.
    pub fn tenant(&self) -> Option<&'a TenantContext> {
        self.tenant
    }

    fn require(&self) -> StorageResult<&'a TenantContext> {
        self.tenant.ok_or_else(|| TenantError::Unresolved.into())
    }

    /// Lists records. Empty when no tenant is resolved.
    pub async fn list(
        &self,
        kind: ResourceKind,
        query: ListQuery,
    ) -> StorageResult<Page<StoredRecord>> {
        match self.tenant {
            Some(t) => self.storage.list(t, kind, query).await,
            None => {
                debug!(kind = %kind, "no tenant resolved, returning empty list");
                Ok(Page::empty(query))
            }
        }
    }

    /// Returns the owner of a row, for the object access gate.
    pub async fn owner_of(&self, target: RefTarget, id: i64) -> StorageResult<Option<TenantId>> {
        self.storage.owner_of(self.require()?, target, id).await
    }

    pub async fn create(&self, kind: ResourceKind, body: Value) -> StorageResult<StoredRecord> {
        self.storage.create(self.require()?, kind, body).await
    }

    pub async fn read(&self, kind: ResourceKind, id: i64) -> StorageResult<Option<StoredRecord>> {
        self.storage.read(self.require()?, kind, id).await
    }

    pub async fn update(
        &self,
        kind: ResourceKind,
        id: i64,
        body: Value,
    ) -> StorageResult<StoredRecord> {
        self.storage.update(self.require()?, kind, id, body).await
    }

    pub async fn patch(
        &self,
        kind: ResourceKind,
        id: i64,
        patch: Value,
    ) -> StorageResult<StoredRecord> {
        self.storage.patch(self.require()?, kind, id, patch).await
    }

    pub async fn delete(&self, kind: ResourceKind, id: i64) -> StorageResult<()> {
        self.storage.delete(self.require()?, kind, id).await
    }

    /// Lists users. Empty when no tenant is resolved.
    pub async fn list_users(&self, query: ListQuery) -> StorageResult<Page<UserRecord>> {
        match self.tenant {
            Some(t) => self.storage.list_users(t, query).await,
            None => Ok(Page::empty(query)),
        }
    }

    pub async fn create_user(&self, user: NewUser) -> StorageResult<UserRecord> {
        self.storage.create_user(self.require()?, user).await
    }

    pub async fn read_user(&self, id: i64) -> StorageResult<Option<UserRecord>> {
        self.storage.read_user(self.require()?, id).await
    }

    pub async fn update_user(&self, id: i64, update: UserUpdate) -> StorageResult<UserRecord> {
        self.storage.update_user(self.require()?, id, update).await
    }

    pub async fn delete_user(&self, id: i64) -> StorageResult<()> {
        self.storage.delete_user(self.require()?, id).await
    }
}
