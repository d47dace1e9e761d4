//! The authenticated caller of a request.

use axum::http::{HeaderMap, header::AUTHORIZATION};
use serde::Serialize;
use wayfarer_persistence::{Role, TenantId, UserRecord};

/// The user a request acts as.
///
/// Rebuilt from the user record on every request, so role changes and
/// deactivations take effect without reissuing tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    /// The user id.
    pub user_id: i64,
    /// The tenant the user belongs to.
    #[serde(rename = "tenant")]
    pub tenant_id: TenantId,
    /// Login email.
    pub email: String,
    /// Role within the tenant.
    pub role: Role,
    /// Whether the account may be used.
    pub is_active: bool,
}

impl From<&UserRecord> for Principal {
    fn from(user: &UserRecord) -> Self {
        Self {
            user_id: user.id,
            tenant_id: user.tenant_id,
            email: user.email.clone(),
            role: user.role,
            is_active: user.is_active,
        }
    }
}

/// Outcome of authenticating a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// No `Authorization` header.
    Anonymous,
    /// A token was presented but is malformed, expired, badly signed or
    /// names a user that no longer exists.
    Invalid,
    /// The user exists but is deactivated.
    Disabled(Principal),
    /// The user belongs to a different tenant than the one the request
    /// resolved to.
    ForeignTenant(Principal),
    /// A usable principal.
    Authenticated(Principal),
}

impl AuthState {
    /// Returns the principal if the request is fully authenticated.
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthState::Authenticated(p) => Some(p),
            _ => None,
        }
    }

    /// Returns `true` if a usable principal is present.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively. Returns `None` for any other
/// scheme or an empty token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
