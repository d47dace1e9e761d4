//! Handlers for the principals of the current tenant.
//!
//! Reads are open to every authenticated principal of the tenant; creating,
//! changing and deleting users is reserved for ADMIN.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, info};
use wayfarer_persistence::identity::{NewUser, UserUpdate};
use wayfarer_persistence::types::RefTarget;
use wayfarer_persistence::{CrmStorage, Page, Role, UserRecord};

use crate::access::ResourceClass;
use crate::auth::hash_password;
use crate::context::RequestContext;
use crate::error::{RestError, RestResult};
use crate::extractors::Pagination;
use crate::state::AppState;

/// Body of `POST /api/users`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

/// Body of `PUT /api/users/{id}`.
///
/// Omitted fields are reset to their defaults, except the password which is
/// only changed when given.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplaceUserRequest {
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

/// Body of `PATCH /api/users/{id}`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

fn active_by_default() -> bool {
    true
}

fn parse_id(raw: &str) -> RestResult<i64> {
    raw.parse().map_err(|_| RestError::not_found("user", raw))
}

fn hash_optional(password: Option<String>) -> RestResult<Option<String>> {
    Ok(password.as_deref().map(hash_password).transpose()?)
}

/// Checks that user `id` exists and belongs to the request tenant.
async fn guard_user<S>(state: &AppState<S>, ctx: &RequestContext, id: i64) -> RestResult<()>
where
    S: CrmStorage,
{
    let owner = ctx
        .scope(state.storage())
        .owner_of(RefTarget::User, id)
        .await?
        .ok_or_else(|| RestError::not_found("user", id))?;
    ctx.authorize_object(owner, "user", &id.to_string())
}

/// Lists the users of the current tenant.
///
/// `GET /api/users`
pub async fn list_users_handler<S>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    pagination: Pagination,
) -> RestResult<Json<Page<UserRecord>>>
where
    S: CrmStorage + 'static,
{
    ctx.authorize(ResourceClass::Principal)?;
    let page = ctx
        .scope(state.storage())
        .list_users(pagination.query())
        .await?;
    debug!(total = page.total, "Listed users");
    Ok(Json(page))
}

/// Creates a user in the current tenant.
///
/// `POST /api/users` (ADMIN only)
pub async fn create_user_handler<S>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> RestResult<Response>
where
    S: CrmStorage + 'static,
{
    let admin = ctx.authorize(ResourceClass::Principal)?;
    ctx.require_tenant()?;
    let Json(request) = payload?;

    let new_user = NewUser {
        email: request.email,
        first_name: request.first_name,
        last_name: request.last_name,
        role: request.role,
        is_active: request.is_active,
        password_hash: hash_password(&request.password)?,
    };
    let user = ctx.scope(state.storage()).create_user(new_user).await?;

    info!(user = user.id, role = %user.role, by = admin.user_id, "User created");
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

/// Reads a user of the current tenant.
///
/// `GET /api/users/{id}`
pub async fn read_user_handler<S>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> RestResult<Json<UserRecord>>
where
    S: CrmStorage + 'static,
{
    ctx.authorize(ResourceClass::Principal)?;
    let id = parse_id(&id)?;
    guard_user(&state, &ctx, id).await?;

    let user = ctx
        .scope(state.storage())
        .read_user(id)
        .await?
        .ok_or_else(|| RestError::not_found("user", id))?;
    Ok(Json(user))
}

/// Replaces a user's profile.
///
/// `PUT /api/users/{id}` (ADMIN only)
pub async fn replace_user_handler<S>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    Path(id): Path<String>,
    payload: Result<Json<ReplaceUserRequest>, JsonRejection>,
) -> RestResult<Json<UserRecord>>
where
    S: CrmStorage + 'static,
{
    let admin = ctx.authorize(ResourceClass::Principal)?;
    let id = parse_id(&id)?;
    guard_user(&state, &ctx, id).await?;
    let Json(request) = payload?;

    let update = UserUpdate {
        email: Some(request.email),
        first_name: Some(request.first_name),
        last_name: Some(request.last_name),
        role: Some(request.role),
        is_active: Some(request.is_active),
        password_hash: hash_optional(request.password)?,
    };
    let user = ctx.scope(state.storage()).update_user(id, update).await?;

    info!(user = id, by = admin.user_id, "User replaced");
    Ok(Json(user))
}

/// Partially updates a user.
///
/// `PATCH /api/users/{id}` (ADMIN only)
pub async fn patch_user_handler<S>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    Path(id): Path<String>,
    payload: Result<Json<PatchUserRequest>, JsonRejection>,
) -> RestResult<Json<UserRecord>>
where
    S: CrmStorage + 'static,
{
    let admin = ctx.authorize(ResourceClass::Principal)?;
    let id = parse_id(&id)?;
    guard_user(&state, &ctx, id).await?;
    let Json(request) = payload?;

    let update = UserUpdate {
        email: request.email,
        first_name: request.first_name,
        last_name: request.last_name,
        role: request.role,
        is_active: request.is_active,
        password_hash: hash_optional(request.password)?,
    };
    let user = ctx.scope(state.storage()).update_user(id, update).await?;

    info!(user = id, by = admin.user_id, "User updated");
    Ok(Json(user))
}

/// Deletes a user. Records assigned to it are unassigned.
///
/// `DELETE /api/users/{id}` (ADMIN only)
pub async fn delete_user_handler<S>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> RestResult<StatusCode>
where
    S: CrmStorage + 'static,
{
    let admin = ctx.authorize(ResourceClass::Principal)?;
    let id = parse_id(&id)?;
    guard_user(&state, &ctx, id).await?;

    ctx.scope(state.storage()).delete_user(id).await?;

    info!(user = id, by = admin.user_id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
