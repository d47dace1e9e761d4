//! Refresh token storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageResult;
use crate::identity::RefreshToken;

/// Persistent refresh tokens.
///
/// Like the authentication lookups of
/// [`UserDirectory`](super::UserDirectory), these run before a tenant is
/// trusted and are keyed by user, not by tenant. Tokens go away with their
/// user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stores a new live token for `user_id`.
    async fn create_refresh_token(
        &self,
        user_id: i64,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<RefreshToken>;

    /// Looks a token up by id.
    async fn find_refresh_token(&self, id: i64) -> StorageResult<Option<RefreshToken>>;

    /// Revokes token `id` and stores its successor, atomically.
    ///
    /// Returns `None`, changing nothing, if `id` was no longer live: a
    /// concurrent rotation won, or it was revoked or expired meanwhile.
    async fn rotate_refresh_token(
        &self,
        id: i64,
        at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> StorageResult<Option<RefreshToken>>;

    /// Revokes one token. Returns `false` if it was unknown or already revoked.
    async fn revoke_refresh_token(&self, id: i64) -> StorageResult<bool>;

    /// Revokes every live token of a user and returns how many there were.
    async fn revoke_user_refresh_tokens(&self, user_id: i64) -> StorageResult<u64>;
}
