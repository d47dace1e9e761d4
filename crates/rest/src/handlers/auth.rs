//! Login, session and current-principal handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use wayfarer_persistence::{CrmStorage, UserRecord};

use crate::access::ResourceClass;
use crate::auth::{AuthError, IssuedToken, verify_password_or_dummy};
use crate::context::RequestContext;
use crate::error::{RestError, RestResult};
use crate::state::AppState;

/// Body of `POST /api/auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /api/auth/refresh` and `POST /api/auth/logout`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Issues an access token for `user` together with a new stored refresh token.
async fn issue_session<S>(state: &AppState<S>, user: &UserRecord) -> RestResult<IssuedToken>
where
    S: CrmStorage + 'static,
{
    let expires_at = state.tokens().refresh_expiry(Utc::now());
    let row = state
        .storage()
        .create_refresh_token(user.id, expires_at)
        .await?;
    let mut issued = state.tokens().issue(user)?;
    issued.refresh_token = Some(state.tokens().issue_refresh(&row)?);
    Ok(issued)
}

/// Exchanges email and password for an access and a refresh token.
///
/// # HTTP Request
///
/// `POST /api/auth/login`
///
/// When the request resolves to a tenant, only users of that tenant may log
/// in through it. Unknown emails, wrong passwords and users of other tenants
/// all get the same 401, after the same password hashing work, so none of
/// them can be told apart.
///
/// Every wrong password counts against the account; reaching the configured
/// threshold locks it. A locked account is refused before its password is
/// checked. A successful login clears the count.
///
/// # Response
///
/// - `200 OK` - `{"access_token", "token_type", "expires_in", "refresh_token"}`
/// - `401 Unauthorized` - Bad credentials
/// - `403 Forbidden` - The account is disabled or locked
pub async fn login_handler<S>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> RestResult<Json<IssuedToken>>
where
    S: CrmStorage + 'static,
{
    let Json(request) = payload?;
    debug!(tenant = ?ctx.tenant().map(|t| t.id), "Processing login request");
    let storage = state.storage();

    let mut candidate = storage.find_user_by_email(&request.email).await?;
    if let Some(tenant) = ctx.tenant()
        && let Some(user) = candidate.take_if(|user| user.tenant_id != tenant.id)
    {
        warn!(user = user.id, tenant = %tenant.id, "Login against a foreign tenant");
    }

    let now = Utc::now();
    if let Some(user) = &candidate
        && user.is_locked(now)
    {
        warn!(user = user.id, "Login to a locked account");
        return Err(AuthError::AccountLocked.into());
    }

    let hash = candidate.as_ref().map(|user| user.password_hash.as_str());
    if !verify_password_or_dummy(&request.password, hash) {
        if let Some(user) = &candidate {
            let policy = state.config().lockout_policy();
            if let Some(until) = storage.record_failed_login(user.id, now, policy).await? {
                warn!(user = user.id, until = %until, "Account locked after failed logins");
            }
        }
        return Err(AuthError::InvalidCredentials.into());
    }
    let user = candidate.ok_or(AuthError::InvalidCredentials)?;

    if !user.is_active {
        warn!(user = user.id, "Login by disabled user");
        return Err(RestError::UserDisabled);
    }

    storage.record_login(user.id, now).await?;
    let issued = issue_session(&state, &user).await?;

    info!(user = user.id, tenant = %user.tenant_id, "User logged in");
    Ok(Json(issued))
}

/// Trades a refresh token for a new access and refresh token.
///
/// # HTTP Request
///
/// `POST /api/auth/refresh`
///
/// The presented token is revoked and replaced. Presenting a token that was
/// already revoked, or whose row no longer exists, is taken as a replay:
/// every refresh token of the user is revoked and the user has to log in
/// again.
///
/// # Response
///
/// - `200 OK` - `{"access_token", "token_type", "expires_in", "refresh_token"}`
/// - `401 Unauthorized` - `invalid_refresh`
/// - `403 Forbidden` - The account is disabled
pub async fn refresh_handler<S>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> RestResult<Json<IssuedToken>>
where
    S: CrmStorage + 'static,
{
    let Json(request) = payload?;
    let claims = state.tokens().verify_refresh(&request.refresh_token)?;
    let (user_id, token_id) = (claims.user_id()?, claims.token_id()?);
    let storage = state.storage();
    let now = Utc::now();

    let stored = storage
        .find_refresh_token(token_id)
        .await?
        .filter(|row| row.user_id == user_id);
    let replayed = match &stored {
        None => true,
        Some(row) => row.revoked,
    };
    if replayed {
        let revoked = storage.revoke_user_refresh_tokens(user_id).await?;
        warn!(user = user_id, token = token_id, revoked, "Refresh token replay detected");
        return Err(RestError::InvalidRefreshToken);
    }

    let user = storage
        .find_user(user_id)
        .await?
        .ok_or(RestError::InvalidRefreshToken)?;
    if let Some(tenant) = ctx.tenant()
        && tenant.id != user.tenant_id
    {
        warn!(user = user.id, tenant = %tenant.id, "Refresh against a foreign tenant");
        return Err(RestError::InvalidRefreshToken);
    }
    if !user.is_active {
        return Err(RestError::UserDisabled);
    }

    let expires_at = state.tokens().refresh_expiry(now);
    let Some(next) = storage
        .rotate_refresh_token(token_id, now, expires_at)
        .await?
    else {
        // Expired, or a concurrent request rotated it first
        return Err(RestError::InvalidRefreshToken);
    };

    let mut issued = state.tokens().issue(&user)?;
    issued.refresh_token = Some(state.tokens().issue_refresh(&next)?);
    debug!(user = user.id, token = next.id, "Session refreshed");
    Ok(Json(issued))
}

/// Revokes a refresh token.
///
/// # HTTP Request
///
/// `POST /api/auth/logout`
///
/// Repeating a logout is harmless. Access tokens already issued stay valid
/// until they expire.
///
/// # Response
///
/// - `204 No Content` - The token is revoked
/// - `401 Unauthorized` - `invalid_refresh` (bad signature or expired)
pub async fn logout_handler<S>(
    State(state): State<AppState<S>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> RestResult<StatusCode>
where
    S: CrmStorage + 'static,
{
    let Json(request) = payload?;
    let claims = state.tokens().verify_refresh(&request.refresh_token)?;
    let (user_id, token_id) = (claims.user_id()?, claims.token_id()?);
    let storage = state.storage();

    if let Some(row) = storage.find_refresh_token(token_id).await?
        && row.user_id == user_id
        && storage.revoke_refresh_token(token_id).await?
    {
        info!(user = user_id, token = token_id, "User logged out");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the authenticated principal and its tenant.
///
/// # HTTP Request
///
/// `GET /api/auth/me`
pub async fn me_handler<S>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
) -> RestResult<Json<Value>>
where
    S: CrmStorage + 'static,
{
    let principal = ctx.authorize(ResourceClass::Principal)?;

    let user = state
        .storage()
        .find_user(principal.user_id)
        .await?
        .ok_or_else(|| RestError::not_found("user", principal.user_id))?;

    Ok(Json(json!({
        "user": user,
        "tenant": ctx.tenant(),
    })))
}
