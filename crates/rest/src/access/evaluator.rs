//! The permission table and the two access gates.

use std::fmt;

use axum::http::Method;
use thiserror::Error;
use tracing::warn;
use wayfarer_persistence::{Role, TenantContext, TenantId};

use crate::auth::Principal;

/// Classes of HTTP methods the permission table distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodClass {
    /// GET, HEAD, OPTIONS.
    Read,
    /// POST.
    Create,
    /// PUT, PATCH.
    Update,
    /// DELETE.
    Delete,
}

impl MethodClass {
    /// Classifies an HTTP method. Methods outside the table return `None`
    /// and are always denied.
    pub fn of(method: &Method) -> Option<Self> {
        match *method {
            Method::GET | Method::HEAD | Method::OPTIONS => Some(MethodClass::Read),
            Method::POST => Some(MethodClass::Create),
            Method::PUT | Method::PATCH => Some(MethodClass::Update),
            Method::DELETE => Some(MethodClass::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for MethodClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodClass::Read => write!(f, "read"),
            MethodClass::Create => write!(f, "create"),
            MethodClass::Update => write!(f, "update"),
            MethodClass::Delete => write!(f, "delete"),
        }
    }
}

/// Classes of resources the permission table distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    /// Tenant-scoped CRM records (leads, deals, bookings, ...).
    Record,
    /// User accounts.
    Principal,
    /// The tenant profile itself.
    Tenant,
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceClass::Record => write!(f, "record"),
            ResourceClass::Principal => write!(f, "user"),
            ResourceClass::Tenant => write!(f, "tenant"),
        }
    }
}

const EVERYONE: &[Role] = &Role::ALL;
const WRITERS: &[Role] = &[Role::Admin, Role::Manager, Role::Agent];
const EDITORS: &[Role] = &[Role::Admin, Role::Manager];
const ADMINS: &[Role] = &[Role::Admin];

/// Which roles may perform which method class on which resource class.
///
/// Any combination not listed is denied.
pub const PERMISSIONS: &[(ResourceClass, MethodClass, &[Role])] = &[
    (ResourceClass::Record, MethodClass::Read, EVERYONE),
    (ResourceClass::Record, MethodClass::Create, WRITERS),
    (ResourceClass::Record, MethodClass::Update, EDITORS),
    (ResourceClass::Record, MethodClass::Delete, EDITORS),
    (ResourceClass::Principal, MethodClass::Read, EVERYONE),
    (ResourceClass::Principal, MethodClass::Create, ADMINS),
    (ResourceClass::Principal, MethodClass::Update, ADMINS),
    (ResourceClass::Principal, MethodClass::Delete, ADMINS),
    (ResourceClass::Tenant, MethodClass::Read, EVERYONE),
    (ResourceClass::Tenant, MethodClass::Update, ADMINS),
];

/// Looks a role up in [`PERMISSIONS`].
pub fn role_allows(role: Role, method: MethodClass, resource: ResourceClass) -> bool {
    PERMISSIONS
        .iter()
        .find(|(r, m, _)| *r == resource && *m == method)
        .is_some_and(|(_, _, roles)| roles.contains(&role))
}

/// Why a request was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccessError {
    /// No authenticated principal.
    #[error("authentication required")]
    AuthenticationRequired,

    /// The role does not allow the method on the resource.
    #[error("{role} may not {method} {resource}")]
    PermissionDenied {
        role: Role,
        method: String,
        resource: ResourceClass,
    },

    /// An object operation with no resolved tenant.
    #[error("no tenant resolved")]
    TenantUnresolved,

    /// The object belongs to a different tenant.
    #[error("{kind} {id} belongs to another tenant")]
    TenantMismatch { kind: String, id: String },
}

/// The method gate.
pub fn authorize_method(
    principal: Option<&Principal>,
    method: &Method,
    resource: ResourceClass,
) -> Result<(), AccessError> {
    let Some(principal) = principal else {
        return Err(AccessError::AuthenticationRequired);
    };
    let allowed = MethodClass::of(method).is_some_and(|class| role_allows(principal.role, class, resource));
    if allowed {
        Ok(())
    } else {
        warn!(
            user = principal.user_id,
            role = %principal.role,
            method = %method,
            resource = %resource,
            "Permission denied"
        );
        Err(AccessError::PermissionDenied {
            role: principal.role,
            method: method.to_string(),
            resource,
        })
    }
}

/// The object gate.
pub fn authorize_object(
    tenant: Option<&TenantContext>,
    owner: TenantId,
    kind: &str,
    id: &str,
) -> Result<(), AccessError> {
    let tenant = tenant.ok_or(AccessError::TenantUnresolved)?;
    if tenant.tenant_id() == owner {
        Ok(())
    } else {
        warn!(
            tenant = %tenant.tenant_id(),
            owner = %owner,
            kind,
            id,
            "Object belongs to another tenant"
        );
        Err(AccessError::TenantMismatch {
            kind: kind.to_string(),
            id: id.to_string(),
        })
    }
}
