//! TenantDirectory and UserDirectory implementations for SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::core::{TenantDirectory, UserDirectory};
use crate::error::{ResourceError, StorageError, StorageResult, TenantError};
use crate::identity::{LockoutPolicy, NewUser, Role, UserRecord, UserUpdate, normalize_email};
use crate::tenant::{
    DEFAULT_SUBSCRIPTION_TIER, NewTenant, Tenant, TenantContext, TenantId, TenantUpdate,
};
use crate::types::{ListQuery, Page, RefTarget};

use super::SqliteBackend;
use super::backend::{internal_error, serialization_error};
use super::storage::{delete_referrers, is_constraint_violation, parse_ts};

const TENANT_COLUMNS: &str = "id, name, domain, subscription_tier, settings, created_at";
const USER_COLUMNS: &str = "id, tenant_id, email, first_name, last_name, role, is_active, \
     password_hash, last_login, date_joined, failed_logins, locked_until";

fn conflict(kind: &str, field: &str, value: &str) -> StorageError {
    StorageError::Resource(ResourceError::Conflict {
        kind: kind.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn not_found(kind: &str, id: impl ToString) -> StorageError {
    StorageError::Resource(ResourceError::NotFound {
        kind: kind.to_string(),
        id: id.to_string(),
    })
}

struct RawTenant {
    id: i64,
    name: String,
    domain: String,
    subscription_tier: String,
    settings: String,
    created_at: String,
}

fn raw_tenant(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTenant> {
    Ok(RawTenant {
        id: row.get(0)?,
        name: row.get(1)?,
        domain: row.get(2)?,
        subscription_tier: row.get(3)?,
        settings: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl RawTenant {
    fn into_tenant(self) -> StorageResult<Tenant> {
        let settings: Map<String, Value> = serde_json::from_str(&self.settings)
            .map_err(|e| serialization_error(format!("Corrupt tenant settings: {}", e)))?;
        Ok(Tenant {
            id: TenantId::new(self.id),
            name: self.name,
            domain: self.domain,
            subscription_tier: self.subscription_tier,
            settings,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

struct RawUser {
    id: i64,
    tenant_id: i64,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
    is_active: bool,
    password_hash: String,
    last_login: Option<String>,
    date_joined: String,
    failed_logins: u32,
    locked_until: Option<String>,
}

fn raw_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUser> {
    Ok(RawUser {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        role: row.get(5)?,
        is_active: row.get(6)?,
        password_hash: row.get(7)?,
        last_login: row.get(8)?,
        date_joined: row.get(9)?,
        failed_logins: row.get(10)?,
        locked_until: row.get(11)?,
    })
}

impl RawUser {
    fn into_user(self) -> StorageResult<UserRecord> {
        let role: Role = self.role.parse().map_err(serialization_error)?;
        Ok(UserRecord {
            id: self.id,
            tenant_id: TenantId::new(self.tenant_id),
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            role,
            is_active: self.is_active,
            last_login: self.last_login.as_deref().map(parse_ts).transpose()?,
            date_joined: parse_ts(&self.date_joined)?,
            password_hash: self.password_hash,
            failed_logins: self.failed_logins,
            locked_until: self.locked_until.as_deref().map(parse_ts).transpose()?,
        })
    }
}

fn load_tenant(conn: &Connection, sql_where: &str, param: &dyn rusqlite::ToSql) -> StorageResult<Option<Tenant>> {
    conn.query_row(
        &format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE {sql_where}"),
        [param],
        raw_tenant,
    )
    .optional()
    .map_err(|e| internal_error(format!("Failed to read tenant: {}", e)))?
    .map(RawTenant::into_tenant)
    .transpose()
}

fn load_user(conn: &Connection, sql_where: &str, param: &dyn rusqlite::ToSql) -> StorageResult<Option<UserRecord>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE {sql_where}"),
        [param],
        raw_user,
    )
    .optional()
    .map_err(|e| internal_error(format!("Failed to read user: {}", e)))?
    .map(RawUser::into_user)
    .transpose()
}

fn load_owned_user(conn: &Connection, tenant: &TenantContext, id: i64) -> StorageResult<UserRecord> {
    let user = load_user(conn, "id = ?1", &id)?.ok_or_else(|| not_found("User", id))?;
    tenant.check_access(user.tenant_id, "User", &id.to_string())?;
    Ok(user)
}

fn settings_json(settings: &Map<String, Value>) -> StorageResult<String> {
    serde_json::to_string(settings)
        .map_err(|e| serialization_error(format!("Failed to serialize settings: {}", e)))
}

#[async_trait]
impl TenantDirectory for SqliteBackend {
    async fn create_tenant(&self, tenant: NewTenant) -> StorageResult<Tenant> {
        let tenant = tenant.validated()?;
        let tier = tenant
            .subscription_tier
            .unwrap_or_else(|| DEFAULT_SUBSCRIPTION_TIER.to_string());
        let conn = self.get_connection()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO tenants (name, domain, subscription_tier, settings, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                tenant.name,
                tenant.domain,
                tier,
                settings_json(&tenant.settings)?,
                now.to_rfc3339()
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                conflict("Tenant", "domain", &tenant.domain)
            } else {
                internal_error(format!("Failed to insert tenant: {}", e))
            }
        })?;
        let id = TenantId::new(conn.last_insert_rowid());
        info!(tenant = %id, domain = %tenant.domain, "Created tenant");

        Ok(Tenant {
            id,
            name: tenant.name,
            domain: tenant.domain,
            subscription_tier: tier,
            settings: tenant.settings,
            created_at: now,
        })
    }

    async fn get_tenant(&self, id: TenantId) -> StorageResult<Option<Tenant>> {
        let conn = self.get_connection()?;
        load_tenant(&conn, "id = ?1", &id.value())
    }

    async fn find_tenant_by_domain(&self, domain: &str) -> StorageResult<Option<Tenant>> {
        let conn = self.get_connection()?;
        load_tenant(&conn, "domain = ?1", &domain.to_ascii_lowercase())
    }

    async fn list_tenants(&self) -> StorageResult<Vec<Tenant>> {
        let conn = self.get_connection()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {TENANT_COLUMNS} FROM tenants ORDER BY id"))
            .map_err(|e| internal_error(format!("Failed to prepare tenant list: {}", e)))?;
        let raws = stmt
            .query_map([], raw_tenant)
            .map_err(|e| internal_error(format!("Failed to list tenants: {}", e)))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| internal_error(format!("Failed to list tenants: {}", e)))?;
        raws.into_iter().map(RawTenant::into_tenant).collect()
    }

    async fn update_tenant(&self, id: TenantId, update: TenantUpdate) -> StorageResult<Tenant> {
        let conn = self.get_connection()?;
        let mut tenant = load_tenant(&conn, "id = ?1", &id.value())?
            .ok_or(TenantError::UnknownTenant { tenant_id: id })?;
        update.apply(&mut tenant)?;
        conn.execute(
            "UPDATE tenants SET name = ?1, subscription_tier = ?2, settings = ?3 WHERE id = ?4",
            params![
                tenant.name,
                tenant.subscription_tier,
                settings_json(&tenant.settings)?,
                id.value()
            ],
        )
        .map_err(|e| internal_error(format!("Failed to update tenant: {}", e)))?;
        debug!(tenant = %id, "Updated tenant");
        Ok(tenant)
    }

    async fn delete_tenant(&self, id: TenantId) -> StorageResult<()> {
        let conn = self.get_connection()?;
        let deleted = conn
            .execute("DELETE FROM tenants WHERE id = ?1", [id.value()])
            .map_err(|e| internal_error(format!("Failed to delete tenant: {}", e)))?;
        if deleted == 0 {
            return Err(TenantError::UnknownTenant { tenant_id: id }.into());
        }
        info!(tenant = %id, "Deleted tenant with its users and records");
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for SqliteBackend {
    async fn create_user(&self, tenant: &TenantContext, user: NewUser) -> StorageResult<UserRecord> {
        let user = user.validated()?;
        let tenant_id = tenant.tenant_id();
        let conn = self.get_connection()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO users (tenant_id, email, first_name, last_name, role, is_active, password_hash, date_joined)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                tenant_id.value(),
                user.email,
                user.first_name,
                user.last_name,
                user.role.as_str(),
                user.is_active,
                user.password_hash,
                now.to_rfc3339()
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                conflict("User", "email", &user.email)
            } else {
                internal_error(format!("Failed to insert user: {}", e))
            }
        })?;
        let id = conn.last_insert_rowid();
        debug!(tenant = %tenant_id, user = id, role = %user.role, "Created user");

        Ok(UserRecord {
            id,
            tenant_id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            is_active: user.is_active,
            last_login: None,
            date_joined: now,
            password_hash: user.password_hash,
            failed_logins: 0,
            locked_until: None,
        })
    }

    async fn read_user(&self, tenant: &TenantContext, id: i64) -> StorageResult<Option<UserRecord>> {
        let conn = self.get_connection()?;
        match load_user(&conn, "id = ?1", &id)? {
            Some(user) => {
                tenant.check_access(user.tenant_id, "User", &id.to_string())?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn list_users(
        &self,
        tenant: &TenantContext,
        query: ListQuery,
    ) -> StorageResult<Page<UserRecord>> {
        let conn = self.get_connection()?;
        let tenant_id = tenant.tenant_id().value();
        let total: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE tenant_id = ?1",
                [tenant_id],
                |row| row.get(0),
            )
            .map_err(|e| internal_error(format!("Failed to count users: {}", e)))?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users WHERE tenant_id = ?1 ORDER BY id LIMIT ?2 OFFSET ?3"
            ))
            .map_err(|e| internal_error(format!("Failed to prepare user list: {}", e)))?;
        let (limit, offset) = query.sql_bounds();
        let raws = stmt
            .query_map(params![tenant_id, limit, offset], raw_user)
            .map_err(|e| internal_error(format!("Failed to list users: {}", e)))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| internal_error(format!("Failed to list users: {}", e)))?;
        let items = raws
            .into_iter()
            .map(RawUser::into_user)
            .collect::<StorageResult<Vec<_>>>()?;
        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or_default(),
            limit: query.limit,
            offset: query.offset,
        })
    }

    async fn update_user(
        &self,
        tenant: &TenantContext,
        id: i64,
        update: UserUpdate,
    ) -> StorageResult<UserRecord> {
        let conn = self.get_connection()?;
        let mut user = load_owned_user(&conn, tenant, id)?;
        update.apply(&mut user)?;
        conn.execute(
            "UPDATE users SET email = ?1, first_name = ?2, last_name = ?3, role = ?4,
                 is_active = ?5, password_hash = ?6
             WHERE id = ?7 AND tenant_id = ?8",
            params![
                user.email,
                user.first_name,
                user.last_name,
                user.role.as_str(),
                user.is_active,
                user.password_hash,
                id,
                tenant.tenant_id().value()
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                conflict("User", "email", &user.email)
            } else {
                internal_error(format!("Failed to update user: {}", e))
            }
        })?;
        debug!(tenant = %tenant.tenant_id(), user = id, "Updated user");
        Ok(user)
    }

    async fn delete_user(&self, tenant: &TenantContext, id: i64) -> StorageResult<()> {
        let mut conn = self.get_connection()?;
        load_owned_user(&conn, tenant, id)?;

        let tx = conn
            .transaction()
            .map_err(|e| internal_error(format!("Failed to begin transaction: {}", e)))?;
        let now = Utc::now().to_rfc3339();
        delete_referrers(&tx, tenant.tenant_id(), RefTarget::User, id, &now)?;
        tx.execute(
            "DELETE FROM users WHERE id = ?1 AND tenant_id = ?2",
            params![id, tenant.tenant_id().value()],
        )
        .map_err(|e| internal_error(format!("Failed to delete user: {}", e)))?;
        tx.commit()
            .map_err(|e| internal_error(format!("Failed to commit delete: {}", e)))?;
        debug!(tenant = %tenant.tenant_id(), user = id, "Deleted user");
        Ok(())
    }

    async fn find_user(&self, id: i64) -> StorageResult<Option<UserRecord>> {
        let conn = self.get_connection()?;
        load_user(&conn, "id = ?1", &id)
    }

    async fn find_user_by_email(&self, email: &str) -> StorageResult<Option<UserRecord>> {
        let Ok(email) = normalize_email(email) else {
            return Ok(None);
        };
        let conn = self.get_connection()?;
        load_user(&conn, "email = ?1", &email)
    }

    async fn record_login(&self, id: i64, at: DateTime<Utc>) -> StorageResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE users SET last_login = ?1, failed_logins = 0, locked_until = NULL WHERE id = ?2",
            params![at.to_rfc3339(), id],
        )
        .map_err(|e| internal_error(format!("Failed to record login: {}", e)))?;
        Ok(())
    }

    async fn record_failed_login(
        &self,
        id: i64,
        at: DateTime<Utc>,
        policy: LockoutPolicy,
    ) -> StorageResult<Option<DateTime<Utc>>> {
        let conn = self.get_connection()?;
        let lock_until = (at + policy.lock_for).to_rfc3339();
        // One statement, so concurrent failures cannot lose a count
        let updated: Option<(u32, Option<String>)> = conn
            .query_row(
                "UPDATE users SET
                     failed_logins = failed_logins + 1,
                     locked_until = CASE WHEN failed_logins + 1 >= ?2 THEN ?3 ELSE locked_until END
                 WHERE id = ?1
                 RETURNING failed_logins, locked_until",
                params![id, policy.max_failures, lock_until],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| internal_error(format!("Failed to record failed login: {}", e)))?;

        let Some((failures, _)) = updated else {
            return Err(not_found("User", id));
        };
        if failures >= policy.max_failures {
            info!(user = id, failures, until = %lock_until, "Account locked");
            return Ok(Some(at + policy.lock_for));
        }
        debug!(user = id, failures, "Failed login recorded");
        Ok(None)
    }
}
