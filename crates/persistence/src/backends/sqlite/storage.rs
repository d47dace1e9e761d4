//! RecordStorage implementation for SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::RecordStorage;
use crate::error::{ResourceError, StorageError, StorageResult, ValidationError};
use crate::tenant::{TenantContext, TenantId};
use crate::types::{ListQuery, OnDelete, Page, RefTarget, ResourceKind, StoredRecord, referrers};

use super::backend::{internal_error, serialization_error};
use super::{SqliteBackend, schema};

const RECORD_COLUMNS: &str = "id, tenant_id, data, created_at, updated_at";

pub(super) fn parse_ts(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| serialization_error(format!("Invalid timestamp '{}': {}", raw, e)))
}

fn not_found(kind: &str, id: i64) -> StorageError {
    StorageError::Resource(ResourceError::NotFound {
        kind: kind.to_string(),
        id: id.to_string(),
    })
}

fn conflict(kind: ResourceKind, field: &str, value: &str) -> StorageError {
    StorageError::Resource(ResourceError::Conflict {
        kind: kind.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    })
}

pub(super) fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation)
}

/// Row image before JSON decoding.
struct RawRecord {
    id: i64,
    tenant_id: i64,
    data: String,
    created_at: String,
    updated_at: String,
}

fn raw_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        data: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

impl RawRecord {
    fn into_record(self, kind: ResourceKind) -> StorageResult<StoredRecord> {
        let content: Map<String, Value> = serde_json::from_str(&self.data)
            .map_err(|e| serialization_error(format!("Corrupt {} {}: {}", kind, self.id, e)))?;
        Ok(StoredRecord::from_storage(
            kind,
            self.id,
            TenantId::new(self.tenant_id),
            content,
            parse_ts(&self.created_at)?,
            parse_ts(&self.updated_at)?,
        ))
    }
}

fn load_record(conn: &Connection, kind: ResourceKind, id: i64) -> StorageResult<Option<StoredRecord>> {
    conn.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM records WHERE kind = ?1 AND id = ?2"),
        params![kind.as_str(), id],
        raw_record,
    )
    .optional()
    .map_err(|e| internal_error(format!("Failed to read {}: {}", kind, e)))?
    .map(|raw| raw.into_record(kind))
    .transpose()
}

/// Loads a record that must exist and belong to the caller.
fn load_owned(
    conn: &Connection,
    tenant: &TenantContext,
    kind: ResourceKind,
    id: i64,
) -> StorageResult<StoredRecord> {
    let record = load_record(conn, kind, id)?.ok_or_else(|| not_found(kind.as_str(), id))?;
    tenant.check_access(record.tenant_id(), kind.as_str(), &id.to_string())?;
    Ok(record)
}

pub(super) fn row_owner(
    conn: &Connection,
    target: RefTarget,
    id: i64,
) -> StorageResult<Option<TenantId>> {
    let owner = match target {
        RefTarget::User => conn
            .query_row("SELECT tenant_id FROM users WHERE id = ?1", [id], |row| {
                row.get::<_, i64>(0)
            })
            .optional(),
        RefTarget::Record(kind) => conn
            .query_row(
                "SELECT tenant_id FROM records WHERE kind = ?1 AND id = ?2",
                params![kind.as_str(), id],
                |row| row.get::<_, i64>(0),
            )
            .optional(),
    };
    owner
        .map(|o| o.map(TenantId::new))
        .map_err(|e| internal_error(format!("Failed to look up owner: {}", e)))
}

/// Every non-null reference must point at a row of the same tenant.
fn check_references(
    conn: &Connection,
    tenant: TenantId,
    kind: ResourceKind,
    content: &Map<String, Value>,
) -> StorageResult<()> {
    for (field, target, _) in kind.references() {
        let Some(id) = content.get(field).and_then(Value::as_i64) else {
            continue;
        };
        if row_owner(conn, target, id)? != Some(tenant) {
            let target = match target {
                RefTarget::User => "user".to_string(),
                RefTarget::Record(k) => k.to_string(),
            };
            return Err(ValidationError::InvalidReference {
                field: field.to_string(),
                value: id.to_string(),
                target,
            }
            .into());
        }
    }
    Ok(())
}

fn unique_needle(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn check_unique(
    conn: &Connection,
    tenant: TenantId,
    kind: ResourceKind,
    content: &Map<String, Value>,
    exclude: Option<i64>,
) -> StorageResult<()> {
    for field in kind.unique_fields() {
        let Some(value) = content.get(field).filter(|v| !v.is_null()) else {
            continue;
        };
        let needle = unique_needle(value);
        let clash: Option<i64> = conn
            .query_row(
                "SELECT id FROM records
                 WHERE tenant_id = ?1 AND kind = ?2 AND json_extract(data, ?3) = ?4 AND id != ?5
                 LIMIT 1",
                params![
                    tenant.value(),
                    kind.as_str(),
                    format!("$.{field}"),
                    needle,
                    exclude.unwrap_or(0)
                ],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| internal_error(format!("Failed to check uniqueness: {}", e)))?;
        if clash.is_some() {
            return Err(conflict(kind, field, &needle));
        }
    }
    Ok(())
}

fn map_write_error(kind: ResourceKind, content: &Map<String, Value>, e: rusqlite::Error) -> StorageError {
    if is_constraint_violation(&e) {
        if let Some(field) = kind.unique_fields().next() {
            let value = content.get(field).map(unique_needle).unwrap_or_default();
            return conflict(kind, field, &value);
        }
    }
    internal_error(format!("Failed to write {}: {}", kind, e))
}

/// Applies the reference rules for a row that is about to disappear.
///
/// Cascading referrers are removed depth-first; nullable referrers are
/// cleared in place. Must run inside the deleting transaction.
pub(super) fn delete_referrers(
    conn: &Connection,
    tenant: TenantId,
    target: RefTarget,
    id: i64,
    now: &str,
) -> StorageResult<()> {
    for (kind, field, on_delete) in referrers(target) {
        let path = format!("$.{field}");
        match on_delete {
            OnDelete::Cascade => {
                let children = {
                    let mut stmt = conn
                        .prepare(
                            "SELECT id FROM records
                             WHERE tenant_id = ?1 AND kind = ?2 AND json_extract(data, ?3) = ?4",
                        )
                        .map_err(|e| internal_error(format!("Failed to prepare cascade: {}", e)))?;
                    let rows = stmt
                        .query_map(params![tenant.value(), kind.as_str(), path, id], |row| {
                            row.get::<_, i64>(0)
                        })
                        .map_err(|e| internal_error(format!("Failed to query cascade: {}", e)))?;
                    rows.collect::<rusqlite::Result<Vec<i64>>>()
                        .map_err(|e| internal_error(format!("Failed to read cascade: {}", e)))?
                };
                for child in children {
                    delete_referrers(conn, tenant, RefTarget::Record(kind), child, now)?;
                    conn.execute("DELETE FROM records WHERE id = ?1", [child])
                        .map_err(|e| internal_error(format!("Failed to cascade delete: {}", e)))?;
                    debug!(kind = %kind, id = child, "Cascade deleted record");
                }
            }
            OnDelete::SetNull => {
                let cleared = conn
                    .execute(
                        "UPDATE records SET data = json_set(data, ?1, NULL), updated_at = ?2
                         WHERE tenant_id = ?3 AND kind = ?4 AND json_extract(data, ?1) = ?5",
                        params![path, now, tenant.value(), kind.as_str(), id],
                    )
                    .map_err(|e| internal_error(format!("Failed to clear references: {}", e)))?;
                if cleared > 0 {
                    debug!(kind = %kind, field, cleared, "Cleared references");
                }
            }
        }
    }
    Ok(())
}

impl SqliteBackend {
    fn write_content(
        &self,
        conn: &Connection,
        existing: StoredRecord,
        content: Map<String, Value>,
    ) -> StorageResult<StoredRecord> {
        let kind = existing.kind();
        let tenant_id = existing.tenant_id();
        check_references(conn, tenant_id, kind, &content)?;
        check_unique(conn, tenant_id, kind, &content, Some(existing.id()))?;

        let data = serde_json::to_string(&content)
            .map_err(|e| serialization_error(format!("Failed to serialize {}: {}", kind, e)))?;
        let now = Utc::now();
        conn.execute(
            "UPDATE records SET data = ?1, updated_at = ?2 WHERE id = ?3 AND tenant_id = ?4",
            params![data, now.to_rfc3339(), existing.id(), tenant_id.value()],
        )
        .map_err(|e| map_write_error(kind, &content, e))?;

        Ok(StoredRecord::from_storage(
            kind,
            existing.id(),
            tenant_id,
            content,
            existing.created_at(),
            now,
        ))
    }
}

#[async_trait]
impl RecordStorage for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn health_check(&self) -> StorageResult<()> {
        let conn = self.get_connection()?;
        schema::verify_schema(&conn)
    }

    async fn owner_of(
        &self,
        _tenant: &TenantContext,
        target: RefTarget,
        id: i64,
    ) -> StorageResult<Option<TenantId>> {
        let conn = self.get_connection()?;
        row_owner(&conn, target, id)
    }

    async fn create(
        &self,
        tenant: &TenantContext,
        kind: ResourceKind,
        body: Value,
    ) -> StorageResult<StoredRecord> {
        let content = kind.prepare(body)?;
        let tenant_id = tenant.tenant_id();
        let conn = self.get_connection()?;

        check_references(&conn, tenant_id, kind, &content)?;
        check_unique(&conn, tenant_id, kind, &content, None)?;

        let data = serde_json::to_string(&content)
            .map_err(|e| serialization_error(format!("Failed to serialize {}: {}", kind, e)))?;
        let now = Utc::now();
        let stamp = now.to_rfc3339();
        conn.execute(
            "INSERT INTO records (tenant_id, kind, data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![tenant_id.value(), kind.as_str(), data, stamp],
        )
        .map_err(|e| map_write_error(kind, &content, e))?;
        let id = conn.last_insert_rowid();

        debug!(
            tenant = %tenant_id,
            kind = %kind,
            id,
            correlation_id = tenant.correlation_id().unwrap_or("-"),
            "Created record"
        );

        Ok(StoredRecord::from_storage(kind, id, tenant_id, content, now, now))
    }

    async fn read(
        &self,
        tenant: &TenantContext,
        kind: ResourceKind,
        id: i64,
    ) -> StorageResult<Option<StoredRecord>> {
        let conn = self.get_connection()?;
        match load_record(&conn, kind, id)? {
            Some(record) => {
                tenant.check_access(record.tenant_id(), kind.as_str(), &id.to_string())?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        tenant: &TenantContext,
        kind: ResourceKind,
        id: i64,
        body: Value,
    ) -> StorageResult<StoredRecord> {
        let content = kind.prepare(body)?;
        let conn = self.get_connection()?;
        let existing = load_owned(&conn, tenant, kind, id)?;
        self.write_content(&conn, existing, content)
    }

    async fn patch(
        &self,
        tenant: &TenantContext,
        kind: ResourceKind,
        id: i64,
        patch: Value,
    ) -> StorageResult<StoredRecord> {
        let conn = self.get_connection()?;
        let existing = load_owned(&conn, tenant, kind, id)?;
        let content = kind.apply_patch(existing.content(), patch)?;
        self.write_content(&conn, existing, content)
    }

    async fn delete(
        &self,
        tenant: &TenantContext,
        kind: ResourceKind,
        id: i64,
    ) -> StorageResult<()> {
        let mut conn = self.get_connection()?;
        load_owned(&conn, tenant, kind, id)?;

        let tx = conn
            .transaction()
            .map_err(|e| internal_error(format!("Failed to begin transaction: {}", e)))?;
        let now = Utc::now().to_rfc3339();
        delete_referrers(&tx, tenant.tenant_id(), RefTarget::Record(kind), id, &now)?;
        tx.execute(
            "DELETE FROM records WHERE id = ?1 AND tenant_id = ?2",
            params![id, tenant.tenant_id().value()],
        )
        .map_err(|e| internal_error(format!("Failed to delete {}: {}", kind, e)))?;
        tx.commit()
            .map_err(|e| internal_error(format!("Failed to commit delete: {}", e)))?;

        debug!(tenant = %tenant.tenant_id(), kind = %kind, id, "Deleted record");
        Ok(())
    }

    async fn list(
        &self,
        tenant: &TenantContext,
        kind: ResourceKind,
        query: ListQuery,
    ) -> StorageResult<Page<StoredRecord>> {
        let conn = self.get_connection()?;
        let tenant_id = tenant.tenant_id().value();

        let total: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM records WHERE tenant_id = ?1 AND kind = ?2",
                params![tenant_id, kind.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| internal_error(format!("Failed to count {}: {}", kind, e)))?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM records
                 WHERE tenant_id = ?1 AND kind = ?2
                 ORDER BY id LIMIT ?3 OFFSET ?4"
            ))
            .map_err(|e| internal_error(format!("Failed to prepare list: {}", e)))?;
        let (limit, offset) = query.sql_bounds();
        let raws = stmt
            .query_map(params![tenant_id, kind.as_str(), limit, offset], raw_record)
            .map_err(|e| internal_error(format!("Failed to list {}: {}", kind, e)))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| internal_error(format!("Failed to list {}: {}", kind, e)))?;

        let items = raws
            .into_iter()
            .map(|raw| raw.into_record(kind))
            .collect::<StorageResult<Vec<_>>>()?;

        Ok(Page {
            items,
            total: u64::try_from(total).unwrap_or_default(),
            limit: query.limit,
            offset: query.offset,
        })
    }
}
