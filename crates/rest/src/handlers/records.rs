//! Handlers for the CRM record collections.
//!
//! All nine collections share one set of handlers; the collection segment of
//! the path selects the [`ResourceKind`].
//!
//! | Method | Path | Gate |
//! |--------|------|------|
//! | GET | `/api/{collection}` | any role |
//! | POST | `/api/{collection}` | ADMIN, MANAGER, AGENT |
//! | GET | `/api/{collection}/{id}` | any role, same tenant |
//! | PUT, PATCH, DELETE | `/api/{collection}/{id}` | ADMIN, MANAGER, same tenant |

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, info};
use wayfarer_persistence::types::RefTarget;
use wayfarer_persistence::{CrmStorage, Page, ResourceKind};

use crate::access::ResourceClass;
use crate::context::RequestContext;
use crate::error::{RestError, RestResult};
use crate::extractors::Pagination;
use crate::state::AppState;

fn resolve_kind(collection: &str) -> RestResult<ResourceKind> {
    ResourceKind::from_path(collection).map_err(|_| RestError::not_found("collection", collection))
}

fn parse_id(kind: ResourceKind, raw: &str) -> RestResult<i64> {
    raw.parse().map_err(|_| RestError::not_found(kind.as_str(), raw))
}

/// Runs the object gate for record `id` of `kind`.
///
/// Missing rows are reported as not found before any tenant comparison.
async fn guard_record<S>(
    state: &AppState<S>,
    ctx: &RequestContext,
    kind: ResourceKind,
    id: i64,
) -> RestResult<()>
where
    S: CrmStorage,
{
    let owner = ctx
        .scope(state.storage())
        .owner_of(RefTarget::Record(kind), id)
        .await?
        .ok_or_else(|| RestError::not_found(kind.as_str(), id))?;
    ctx.authorize_object(owner, kind.as_str(), &id.to_string())
}

/// Lists the records of a collection.
///
/// Returns an empty page when the request resolved to no tenant.
///
/// `GET /api/{collection}?limit=&offset=`
pub async fn list_records_handler<S>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    Path(collection): Path<String>,
    pagination: Pagination,
) -> RestResult<Json<Page<Value>>>
where
    S: CrmStorage + 'static,
{
    ctx.authorize(ResourceClass::Record)?;
    let kind = resolve_kind(&collection)?;

    debug!(
        kind = %kind,
        tenant = ?ctx.tenant().map(|t| t.id),
        limit = pagination.limit(),
        offset = pagination.offset(),
        "Processing list request"
    );

    let page = ctx
        .scope(state.storage())
        .list(kind, pagination.query())
        .await?;
    Ok(Json(page.map(|record| record.to_json())))
}

/// Creates a record in the request tenant.
///
/// Any `id` or `tenant` in the body is ignored.
///
/// `POST /api/{collection}`
pub async fn create_record_handler<S>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    Path(collection): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> RestResult<Response>
where
    S: CrmStorage + 'static,
{
    let principal = ctx.authorize(ResourceClass::Record)?;
    let kind = resolve_kind(&collection)?;
    let Json(body) = payload?;

    let record = ctx.scope(state.storage()).create(kind, body).await?;

    debug!(
        kind = %kind,
        id = record.id(),
        tenant = %record.tenant_id(),
        user = principal.user_id,
        "Record created"
    );
    Ok((StatusCode::CREATED, Json(record.to_json())).into_response())
}

/// Reads one record.
///
/// `GET /api/{collection}/{id}`
pub async fn read_record_handler<S>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    Path((collection, id)): Path<(String, String)>,
) -> RestResult<Json<Value>>
where
    S: CrmStorage + 'static,
{
    ctx.authorize(ResourceClass::Record)?;
    let kind = resolve_kind(&collection)?;
    let id = parse_id(kind, &id)?;
    guard_record(&state, &ctx, kind, id).await?;

    let record = ctx
        .scope(state.storage())
        .read(kind, id)
        .await?
        .ok_or_else(|| RestError::not_found(kind.as_str(), id))?;
    Ok(Json(record.to_json()))
}

/// Replaces a record's content.
///
/// `PUT /api/{collection}/{id}`
pub async fn update_record_handler<S>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    Path((collection, id)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> RestResult<Json<Value>>
where
    S: CrmStorage + 'static,
{
    ctx.authorize(ResourceClass::Record)?;
    let kind = resolve_kind(&collection)?;
    let id = parse_id(kind, &id)?;
    guard_record(&state, &ctx, kind, id).await?;
    let Json(body) = payload?;

    let record = ctx.scope(state.storage()).update(kind, id, body).await?;
    debug!(kind = %kind, id, "Record replaced");
    Ok(Json(record.to_json()))
}

/// Applies a JSON merge patch to a record.
///
/// `PATCH /api/{collection}/{id}`
pub async fn patch_record_handler<S>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    Path((collection, id)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> RestResult<Json<Value>>
where
    S: CrmStorage + 'static,
{
    ctx.authorize(ResourceClass::Record)?;
    let kind = resolve_kind(&collection)?;
    let id = parse_id(kind, &id)?;
    guard_record(&state, &ctx, kind, id).await?;
    let Json(patch) = payload?;

    let record = ctx.scope(state.storage()).patch(kind, id, patch).await?;
    debug!(kind = %kind, id, "Record patched");
    Ok(Json(record.to_json()))
}

/// Deletes a record and applies the delete rules to records referencing it.
///
/// `DELETE /api/{collection}/{id}`
pub async fn delete_record_handler<S>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    Path((collection, id)): Path<(String, String)>,
) -> RestResult<StatusCode>
where
    S: CrmStorage + 'static,
{
    let principal = ctx.authorize(ResourceClass::Record)?;
    let kind = resolve_kind(&collection)?;
    let id = parse_id(kind, &id)?;
    guard_record(&state, &ctx, kind, id).await?;

    ctx.scope(state.storage()).delete(kind, id).await?;

    info!(kind = %kind, id, user = principal.user_id, "Record deleted");
    Ok(StatusCode::NO_CONTENT)
}
