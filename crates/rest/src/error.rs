//! Error types for the Wayfarer HTTP API.
//!
//! Every failure leaves the server as a JSON body of the form
//! `{"error": "<code>", "message": "<text>"}`.
//!
//! # Error Mapping
//!
//! | Error | HTTP Status | Code |
//! |-------|-------------|------|
//! | AuthenticationRequired | 401 | authentication_required |
//! | InvalidRefreshToken | 401 | invalid_refresh |
//! | UserDisabled | 403 | user_disabled |
//! | AccountLocked | 403 | account_locked |
//! | PermissionDenied | 403 | permission_denied |
//! | ForeignPrincipal | 403 | tenant_mismatch |
//! | TenantUnresolved | 403 | tenant_unresolved |
//! | NotFound (including records of another tenant) | 404 | not_found |
//! | BadRequest | 400 | invalid |
//! | Conflict | 409 | conflict |
//! | InternalError | 500 | internal |

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use tracing::{error, warn};
use wayfarer_persistence::error::{ResourceError, StorageError, TenantError};

use crate::access::AccessError;
use crate::auth::AuthError;

/// The primary error type for API operations.
#[derive(Debug)]
pub enum RestError {
    /// No valid credentials were presented (HTTP 401).
    AuthenticationRequired {
        /// Why authentication failed.
        message: String,
    },

    /// A refresh token was invalid, expired, revoked or replayed (HTTP 401).
    InvalidRefreshToken,

    /// The principal's account is deactivated (HTTP 403).
    UserDisabled,

    /// Too many failed logins; password logins are refused for now (HTTP 403).
    AccountLocked,

    /// The principal's role does not allow the operation (HTTP 403).
    PermissionDenied {
        /// Error message.
        message: String,
    },

    /// The principal belongs to a different tenant than the request (HTTP 403).
    ForeignPrincipal,

    /// No tenant serves the request host (HTTP 403).
    TenantUnresolved,

    /// Resource not found (HTTP 404).
    NotFound {
        /// The kind of object (e.g., "lead").
        kind: String,
        /// The object ID.
        id: String,
    },

    /// Bad request - validation error (HTTP 400).
    BadRequest {
        /// Error message.
        message: String,
    },

    /// A uniqueness rule was violated (HTTP 409).
    Conflict {
        /// Error message.
        message: String,
    },

    /// Internal server error (HTTP 500).
    InternalError {
        /// Error message.
        message: String,
    },
}

impl RestError {
    /// Creates a not found error.
    pub fn not_found(kind: impl Into<String>, id: impl ToString) -> Self {
        RestError::NotFound {
            kind: kind.into(),
            id: id.to_string(),
        }
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        RestError::BadRequest {
            message: message.into(),
        }
    }

    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::AuthenticationRequired { .. } | RestError::InvalidRefreshToken => {
                StatusCode::UNAUTHORIZED
            }
            RestError::UserDisabled
            | RestError::AccountLocked
            | RestError::PermissionDenied { .. }
            | RestError::ForeignPrincipal
            | RestError::TenantUnresolved => StatusCode::FORBIDDEN,
            RestError::NotFound { .. } => StatusCode::NOT_FOUND,
            RestError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            RestError::Conflict { .. } => StatusCode::CONFLICT,
            RestError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            RestError::AuthenticationRequired { .. } => "authentication_required",
            RestError::InvalidRefreshToken => "invalid_refresh",
            RestError::UserDisabled => "user_disabled",
            RestError::AccountLocked => "account_locked",
            RestError::PermissionDenied { .. } => "permission_denied",
            RestError::ForeignPrincipal => "tenant_mismatch",
            RestError::TenantUnresolved => "tenant_unresolved",
            RestError::NotFound { .. } => "not_found",
            RestError::BadRequest { .. } => "invalid",
            RestError::Conflict { .. } => "conflict",
            RestError::InternalError { .. } => "internal",
        }
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::AuthenticationRequired { message } => {
                write!(f, "Authentication required: {}", message)
            }
            RestError::InvalidRefreshToken => {
                write!(f, "Invalid, expired or revoked refresh token")
            }
            RestError::UserDisabled => write!(f, "User account is disabled"),
            RestError::AccountLocked => {
                write!(f, "Account is locked after repeated failed logins")
            }
            RestError::PermissionDenied { message } => {
                write!(f, "Permission denied: {}", message)
            }
            RestError::ForeignPrincipal => {
                write!(f, "User does not belong to this tenant")
            }
            RestError::TenantUnresolved => {
                write!(f, "No tenant is configured for this host")
            }
            RestError::NotFound { kind, id } => write!(f, "{} {} not found", kind, id),
            RestError::BadRequest { message } => write!(f, "Bad request: {}", message),
            RestError::Conflict { message } => write!(f, "Conflict: {}", message),
            RestError::InternalError { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for RestError {}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            // Backend details stay in the log.
            RestError::InternalError { .. } => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let body = serde_json::json!({
            "error": self.code(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for RestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Resource(ResourceError::NotFound { kind, id }) => {
                RestError::NotFound { kind, id }
            }
            StorageError::Resource(conflict @ ResourceError::Conflict { .. }) => {
                RestError::Conflict {
                    message: conflict.to_string(),
                }
            }
            StorageError::Tenant(TenantError::Unresolved) => RestError::TenantUnresolved,
            // Never reveal that the row exists under another tenant.
            StorageError::Tenant(TenantError::AccessDenied { tenant_id, kind, id }) => {
                warn!(tenant = %tenant_id, kind = %kind, id = %id, "Cross-tenant access refused");
                RestError::NotFound { kind, id }
            }
            StorageError::Tenant(TenantError::UnknownTenant { tenant_id }) => {
                RestError::not_found("tenant", tenant_id)
            }
            StorageError::Validation(e) => RestError::BadRequest {
                message: e.to_string(),
            },
            StorageError::Backend(e) => {
                error!(error = %e, "Storage backend failure");
                RestError::InternalError {
                    message: e.to_string(),
                }
            }
        }
    }
}

impl From<AccessError> for RestError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::AuthenticationRequired => RestError::AuthenticationRequired {
                message: "missing or invalid credentials".to_string(),
            },
            denied @ AccessError::PermissionDenied { .. } => RestError::PermissionDenied {
                message: denied.to_string(),
            },
            AccessError::TenantUnresolved => RestError::TenantUnresolved,
            AccessError::TenantMismatch { kind, id } => RestError::NotFound { kind, id },
        }
    }
}

impl From<AuthError> for RestError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::InvalidToken => {
                RestError::AuthenticationRequired {
                    message: err.to_string(),
                }
            }
            AuthError::InvalidRefreshToken => RestError::InvalidRefreshToken,
            AuthError::AccountLocked => RestError::AccountLocked,
            AuthError::UserDisabled => RestError::UserDisabled,
            AuthError::WeakPassword(_) => RestError::BadRequest {
                message: err.to_string(),
            },
            AuthError::TokenCreation(_) | AuthError::PasswordHash(_) => {
                error!(error = %err, "Credential processing failed");
                RestError::InternalError {
                    message: err.to_string(),
                }
            }
        }
    }
}

impl From<JsonRejection> for RestError {
    fn from(rejection: JsonRejection) -> Self {
        RestError::BadRequest {
            message: rejection.body_text(),
        }
    }
}

/// Result type alias for API operations.
pub type RestResult<T> = Result<T, RestError>;
