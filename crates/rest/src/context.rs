//! Per-request context.
//!
//! [`RequestContext`] is built once per request by an axum extractor and
//! handed to the handler by value. It carries everything the access gates
//! need: the resolved tenant (if any), the authentication outcome and the
//! request method. Nothing about a request is stored outside of it.
//!
//! Request lifecycle: resolve tenant, authenticate, authorize, scope, execute.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, HeaderName, Method, request::Parts},
};
use tracing::{debug, warn};
use wayfarer_persistence::{
    CrmStorage, StorageResult, Tenant, TenantContext, TenantId, TenantScope,
};

use crate::access::{self, ResourceClass};
use crate::auth::{AuthState, Principal, bearer_token};
use crate::error::{RestError, RestResult};
use crate::state::AppState;
use crate::tenant::TenantResolver;

/// Header carrying the request id set by the request-id layer.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Everything known about the caller of one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    request_id: Option<String>,
    tenant: Option<Tenant>,
    tenant_context: Option<TenantContext>,
    auth: AuthState,
}

impl RequestContext {
    /// Creates a context from already resolved parts.
    pub fn new(method: Method, tenant: Option<Tenant>, auth: AuthState) -> Self {
        let tenant_context = tenant.as_ref().map(|t| {
            let ctx = TenantContext::new(t.id);
            match auth.principal() {
                Some(p) => ctx.with_user_id(p.user_id),
                None => ctx,
            }
        });
        Self {
            method,
            request_id: None,
            tenant,
            tenant_context,
            auth,
        }
    }

    /// Attaches a request id, also used as the storage correlation id.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        let request_id = request_id.into();
        self.tenant_context = self
            .tenant_context
            .map(|ctx| ctx.with_correlation_id(request_id.clone()));
        self.request_id = Some(request_id);
        self
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request id, if the request-id layer is enabled.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// The tenant serving the request, if one was resolved.
    pub fn tenant(&self) -> Option<&Tenant> {
        self.tenant.as_ref()
    }

    /// The storage context of the resolved tenant.
    pub fn tenant_context(&self) -> Option<&TenantContext> {
        self.tenant_context.as_ref()
    }

    /// The resolved tenant context, or `TenantUnresolved`.
    pub fn require_tenant(&self) -> RestResult<&TenantContext> {
        self.tenant_context.as_ref().ok_or(RestError::TenantUnresolved)
    }

    /// The authentication outcome.
    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    /// The authenticated principal, if any.
    pub fn principal(&self) -> Option<&Principal> {
        self.auth.principal()
    }

    /// Storage restricted to this request's tenant.
    pub fn scope<'a, S>(&'a self, storage: &'a S) -> TenantScope<'a, S>
    where
        S: CrmStorage + ?Sized,
    {
        TenantScope::new(storage, self.tenant_context.as_ref())
    }

    /// Runs the method gate for this request's method on `resource`.
    ///
    /// Returns the principal on success.
    pub fn authorize(&self, resource: ResourceClass) -> RestResult<&Principal> {
        let principal = match &self.auth {
            AuthState::Anonymous | AuthState::Invalid => {
                return Err(RestError::AuthenticationRequired {
                    message: "missing or invalid credentials".to_string(),
                });
            }
            AuthState::Disabled(_) => return Err(RestError::UserDisabled),
            AuthState::ForeignTenant(p) => {
                warn!(
                    user = p.user_id,
                    user_tenant = %p.tenant_id,
                    request_tenant = ?self.tenant.as_ref().map(|t| t.id),
                    "Principal used against a foreign tenant"
                );
                return Err(RestError::ForeignPrincipal);
            }
            AuthState::Authenticated(p) => p,
        };
        access::authorize_method(Some(principal), &self.method, resource)?;
        Ok(principal)
    }

    /// Runs the object gate for an object owned by `owner`.
    pub fn authorize_object(&self, owner: TenantId, kind: &str, id: &str) -> RestResult<()> {
        access::authorize_object(self.tenant_context.as_ref(), owner, kind, id)?;
        Ok(())
    }
}

/// Verifies the bearer token and loads the principal it names.
async fn authenticate<S>(
    state: &AppState<S>,
    headers: &HeaderMap,
    tenant: Option<&Tenant>,
) -> StorageResult<AuthState>
where
    S: CrmStorage,
{
    let Some(token) = bearer_token(headers) else {
        return Ok(AuthState::Anonymous);
    };

    let user_id = match state.tokens().verify(token).and_then(|c| c.user_id()) {
        Ok(id) => id,
        Err(e) => {
            debug!(error = %e, "rejected bearer token");
            return Ok(AuthState::Invalid);
        }
    };

    let Some(user) = state.storage().find_user(user_id).await? else {
        debug!(user = user_id, "token names an unknown user");
        return Ok(AuthState::Invalid);
    };

    let principal = Principal::from(&user);
    if !user.is_active {
        return Ok(AuthState::Disabled(principal));
    }
    match tenant {
        Some(t) if t.id != user.tenant_id => Ok(AuthState::ForeignTenant(principal)),
        _ => Ok(AuthState::Authenticated(principal)),
    }
}

impl<S> FromRequestParts<AppState<S>> for RequestContext
where
    S: CrmStorage + 'static,
{
    type Rejection = RestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let config = state.config();
        let resolver = TenantResolver::new(config);
        let tenant = resolver
            .resolve(state.storage(), parts, config.domain_match)
            .await?;

        let auth = authenticate(state, &parts.headers, tenant.as_ref()).await?;

        let ctx = RequestContext::new(parts.method.clone(), tenant, auth);
        let request_id = parts
            .headers
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Ok(match request_id {
            Some(id) => ctx.with_request_id(id),
            None => ctx,
        })
    }
}
