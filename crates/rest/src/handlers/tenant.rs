//! Handlers for the current tenant's profile.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::{debug, info};
use wayfarer_persistence::tenant::TenantUpdate;
use wayfarer_persistence::{CrmStorage, Tenant};

use crate::access::ResourceClass;
use crate::context::RequestContext;
use crate::error::{RestError, RestResult};
use crate::state::AppState;

/// Returns the tenant the request resolved to.
///
/// # HTTP Request
///
/// `GET /api/tenant`
pub async fn get_tenant_handler(ctx: RequestContext) -> RestResult<Json<Tenant>> {
    ctx.authorize(ResourceClass::Tenant)?;
    let tenant = ctx.tenant().ok_or(RestError::TenantUnresolved)?;
    debug!(tenant = %tenant.id, "Returning tenant profile");
    Ok(Json(tenant.clone()))
}

/// Updates name, subscription tier or settings of the current tenant.
///
/// # HTTP Request
///
/// `PATCH /api/tenant` (ADMIN only)
pub async fn patch_tenant_handler<S>(
    State(state): State<AppState<S>>,
    ctx: RequestContext,
    payload: Result<Json<TenantUpdate>, JsonRejection>,
) -> RestResult<Json<Tenant>>
where
    S: CrmStorage + 'static,
{
    let principal = ctx.authorize(ResourceClass::Tenant)?;
    let tenant = ctx.tenant().ok_or(RestError::TenantUnresolved)?;
    let Json(update) = payload?;

    let updated = state.storage().update_tenant(tenant.id, update).await?;
    info!(tenant = %updated.id, user = principal.user_id, "Tenant profile updated");
    Ok(Json(updated))
}
