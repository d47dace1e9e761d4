//! Refresh token records.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A stored refresh token.
///
/// Only the row is stored; the signed token handed to the client names it
/// by `id`. Rotation revokes the row and links it to its successor, so a
/// revoked row that is presented again marks a replayed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    /// The token issued when this one was rotated.
    pub replaced_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Returns `true` if the token may still be exchanged at `at`.
    pub fn is_live(&self, at: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > at
    }
}
