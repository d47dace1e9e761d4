//! Stored record wrapper.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::kind::ResourceKind;
use super::schema::format_timestamp;
use crate::tenant::TenantId;

/// A tenant-scoped record as held by storage, with its persistence metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    kind: ResourceKind,
    id: i64,
    tenant_id: TenantId,
    content: Map<String, Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StoredRecord {
    /// Assembles a record loaded from storage.
    pub fn from_storage(
        kind: ResourceKind,
        id: i64,
        tenant_id: TenantId,
        content: Map<String, Value>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            id,
            tenant_id,
            content,
            created_at,
            updated_at,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// The tenant that owns this record.
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// The validated field content, including write-only fields.
    pub fn content(&self) -> &Map<String, Value> {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Reads an integer field, e.g. a reference id.
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.content.get(field).and_then(Value::as_i64)
    }

    /// Renders the public JSON representation.
    ///
    /// Metadata is added and write-only fields are removed.
    pub fn to_json(&self) -> Value {
        let mut out = Map::with_capacity(self.content.len() + 4);
        out.insert("id".to_string(), Value::from(self.id));
        out.insert("tenant".to_string(), Value::from(self.tenant_id.value()));
        let mut content = self.content.clone();
        self.kind.redact(&mut content);
        out.extend(content);
        out.insert(
            "created_at".to_string(),
            Value::from(format_timestamp(self.created_at)),
        );
        out.insert(
            "updated_at".to_string(),
            Value::from(format_timestamp(self.updated_at)),
        );
        Value::Object(out)
    }
}
