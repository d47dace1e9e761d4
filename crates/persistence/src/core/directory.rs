//! Tenant and user directories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageResult;
use crate::identity::{LockoutPolicy, NewUser, UserRecord, UserUpdate};
use crate::tenant::{
    DomainMatch, NewTenant, Tenant, TenantContext, TenantId, TenantUpdate, normalize_host,
};
use crate::types::{ListQuery, Page};

/// Registry of tenants.
///
/// Tenants themselves are not tenant-scoped, so these operations take no
/// [`TenantContext`]. They back host resolution and administrative tooling.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Creates a tenant. Fails with a conflict if the domain is taken.
    async fn create_tenant(&self, tenant: NewTenant) -> StorageResult<Tenant>;

    /// Looks a tenant up by id.
    async fn get_tenant(&self, id: TenantId) -> StorageResult<Option<Tenant>>;

    /// Looks a tenant up by canonical domain.
    async fn find_tenant_by_domain(&self, domain: &str) -> StorageResult<Option<Tenant>>;

    /// Lists all tenants ordered by id.
    async fn list_tenants(&self) -> StorageResult<Vec<Tenant>>;

    /// Applies a profile update.
    async fn update_tenant(&self, id: TenantId, update: TenantUpdate) -> StorageResult<Tenant>;

    /// Deletes a tenant together with all of its users and records.
    async fn delete_tenant(&self, id: TenantId) -> StorageResult<()>;

    /// Maps an inbound `Host` value to a tenant.
    ///
    /// The host is normalized first. An exact domain match wins; in suffix
    /// mode the most specific parent domain is tried next. `Ok(None)` means
    /// no tenant serves this host.
    async fn resolve_host(&self, host: &str, mode: DomainMatch) -> StorageResult<Option<Tenant>> {
        let Some(host) = normalize_host(host) else {
            return Ok(None);
        };
        for candidate in mode.candidates(&host) {
            if let Some(tenant) = self.find_tenant_by_domain(&candidate).await? {
                return Ok(Some(tenant));
            }
        }
        Ok(None)
    }
}

/// Registry of principals.
///
/// Profile operations are tenant-scoped like records. The two lookups used
/// for authentication are not, because they run before the caller's tenant
/// membership is known.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Creates a user in the caller's tenant. Emails are unique system-wide.
    async fn create_user(&self, tenant: &TenantContext, user: NewUser) -> StorageResult<UserRecord>;

    /// Reads a user of the caller's tenant.
    async fn read_user(&self, tenant: &TenantContext, id: i64) -> StorageResult<Option<UserRecord>>;

    /// Lists the caller's users ordered by id.
    async fn list_users(
        &self,
        tenant: &TenantContext,
        query: ListQuery,
    ) -> StorageResult<Page<UserRecord>>;

    /// Updates a user of the caller's tenant.
    async fn update_user(
        &self,
        tenant: &TenantContext,
        id: i64,
        update: UserUpdate,
    ) -> StorageResult<UserRecord>;

    /// Deletes a user and clears record assignments pointing at it.
    async fn delete_user(&self, tenant: &TenantContext, id: i64) -> StorageResult<()>;

    /// Looks up the principal named by a verified token.
    async fn find_user(&self, id: i64) -> StorageResult<Option<UserRecord>>;

    /// Looks up a principal by login email.
    async fn find_user_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>>;

    /// Stamps a successful login and clears failed attempts and any lock.
    async fn record_login(&self, id: i64, at: DateTime<Utc>) -> StorageResult<()>;

    /// Counts a failed login, locking the account once the policy's
    /// threshold is reached.
    ///
    /// Returns the lock expiry when this failure locked (or re-locked) the
    /// account.
    async fn record_failed_login(
        &self,
        id: i64,
        at: DateTime<Utc>,
        policy: LockoutPolicy,
    ) -> StorageResult<Option<DateTime<Utc>>>;
}
