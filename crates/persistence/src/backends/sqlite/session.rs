//! SessionStore implementation for SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, warn};

use crate::core::SessionStore;
use crate::error::StorageResult;
use crate::identity::RefreshToken;

use super::SqliteBackend;
use super::backend::internal_error;
use super::storage::parse_ts;

const TOKEN_COLUMNS: &str = "id, user_id, expires_at, revoked, replaced_by, created_at";

struct RawToken {
    id: i64,
    user_id: i64,
    expires_at: String,
    revoked: bool,
    replaced_by: Option<i64>,
    created_at: String,
}

fn raw_token(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawToken> {
    Ok(RawToken {
        id: row.get(0)?,
        user_id: row.get(1)?,
        expires_at: row.get(2)?,
        revoked: row.get(3)?,
        replaced_by: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl RawToken {
    fn into_token(self) -> StorageResult<RefreshToken> {
        Ok(RefreshToken {
            id: self.id,
            user_id: self.user_id,
            expires_at: parse_ts(&self.expires_at)?,
            revoked: self.revoked,
            replaced_by: self.replaced_by,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

fn insert_token(
    conn: &Connection,
    user_id: i64,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> StorageResult<RefreshToken> {
    conn.execute(
        "INSERT INTO refresh_tokens (user_id, expires_at, created_at) VALUES (?1, ?2, ?3)",
        params![user_id, expires_at.to_rfc3339(), now.to_rfc3339()],
    )
    .map_err(|e| internal_error(format!("Failed to store refresh token: {}", e)))?;
    Ok(RefreshToken {
        id: conn.last_insert_rowid(),
        user_id,
        expires_at,
        revoked: false,
        replaced_by: None,
        created_at: now,
    })
}

#[async_trait]
impl SessionStore for SqliteBackend {
    async fn create_refresh_token(
        &self,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<RefreshToken> {
        let conn = self.get_connection()?;
        let token = insert_token(&conn, user_id, expires_at, Utc::now())?;
        debug!(user = user_id, token = token.id, "Issued refresh token");
        Ok(token)
    }

    async fn find_refresh_token(&self, id: i64) -> StorageResult<Option<RefreshToken>> {
        let conn = self.get_connection()?;
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE id = ?1"),
            [id],
            raw_token,
        )
        .optional()
        .map_err(|e| internal_error(format!("Failed to read refresh token: {}", e)))?
        .map(RawToken::into_token)
        .transpose()
    }

    async fn rotate_refresh_token(
        &self,
        id: i64,
        at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<Option<RefreshToken>> {
        let mut conn = self.get_connection()?;
        let tx = conn
            .transaction()
            .map_err(|e| internal_error(format!("Failed to begin transaction: {}", e)))?;

        let user_id: Option<i64> = tx
            .query_row(
                "UPDATE refresh_tokens SET revoked = 1
                 WHERE id = ?1 AND revoked = 0 AND expires_at > ?2
                 RETURNING user_id",
                params![id, at.to_rfc3339()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| internal_error(format!("Failed to revoke refresh token: {}", e)))?;
        let Some(user_id) = user_id else {
            warn!(token = id, "Refresh token was not live at rotation");
            return Ok(None);
        };

        let next = insert_token(&tx, user_id, expires_at, at)?;
        tx.execute(
            "UPDATE refresh_tokens SET replaced_by = ?1 WHERE id = ?2",
            params![next.id, id],
        )
        .map_err(|e| internal_error(format!("Failed to link refresh token: {}", e)))?;
        tx.commit()
            .map_err(|e| internal_error(format!("Failed to commit rotation: {}", e)))?;

        debug!(user = user_id, from = id, to = next.id, "Rotated refresh token");
        Ok(Some(next))
    }

    async fn revoke_refresh_token(&self, id: i64) -> StorageResult<bool> {
        let conn = self.get_connection()?;
        let changed = conn
            .execute(
                "UPDATE refresh_tokens SET revoked = 1 WHERE id = ?1 AND revoked = 0",
                [id],
            )
            .map_err(|e| internal_error(format!("Failed to revoke refresh token: {}", e)))?;
        Ok(changed > 0)
    }

    async fn revoke_user_refresh_tokens(&self, user_id: i64) -> StorageResult<u64> {
        let conn = self.get_connection()?;
        let changed = conn
            .execute(
                "UPDATE refresh_tokens SET revoked = 1 WHERE user_id = ?1 AND revoked = 0",
                [user_id],
            )
            .map_err(|e| internal_error(format!("Failed to revoke refresh tokens: {}", e)))?;
        debug!(user = user_id, revoked = changed, "Revoked refresh tokens");
        Ok(changed as u64)
    }
}
