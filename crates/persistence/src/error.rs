//! Error types for the persistence layer.
//!
//! Errors are grouped by category: resource state, tenant isolation,
//! validation of record bodies, and backend failures.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::tenant::TenantId;

/// The primary error type for all storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Resource state errors
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// Tenant isolation errors
    #[error(transparent)]
    Tenant(#[from] TenantError),

    /// Validation errors
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Backend-specific errors
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Errors related to resource state.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// The requested record was not found in the caller's tenant.
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// A uniqueness constraint was violated.
    #[error("{kind} already exists: {field} = {value}")]
    Conflict {
        kind: String,
        field: String,
        value: String,
    },
}

/// Errors related to tenant isolation.
#[derive(Error, Debug)]
pub enum TenantError {
    /// No tenant could be resolved for the request.
    #[error("no tenant resolved for this request")]
    Unresolved,

    /// The record belongs to a different tenant than the caller.
    #[error("tenant {tenant_id} cannot access {kind}/{id}")]
    AccessDenied {
        tenant_id: TenantId,
        kind: String,
        id: String,
    },

    /// The referenced tenant does not exist.
    #[error("unknown tenant: {tenant_id}")]
    UnknownTenant { tenant_id: TenantId },
}

/// Errors related to record validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The record body is not a JSON object.
    #[error("record body must be a JSON object")]
    NotAnObject,

    /// A required field is missing or null.
    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    /// A field has an unacceptable value.
    #[error("invalid value for {field}: {message}")]
    InvalidField { field: String, message: String },

    /// A reference field does not point at a record of the caller's tenant.
    #[error("invalid reference {field} = {value}: no such {target}")]
    InvalidReference {
        field: String,
        value: String,
        target: String,
    },

    /// The collection name is not a known record kind.
    #[error("unknown collection: {name}")]
    UnknownKind { name: String },

    /// A JSON merge patch could not be applied.
    #[error("invalid patch: {message}")]
    InvalidPatch { message: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::InvalidField`].
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Backend failures.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Connection to the backend failed.
    #[error("connection failed to {backend_name}: {message}")]
    ConnectionFailed {
        backend_name: String,
        message: String,
    },

    /// Schema migration error.
    #[error("schema migration failed: {message}")]
    MigrationError { message: String },

    /// Internal backend error.
    #[error("internal error in {backend_name}: {message}")]
    Internal {
        backend_name: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    SerializationError { message: String },
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Returns `true` if this error means the target does not exist for the caller.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::Resource(ResourceError::NotFound { .. })
                | StorageError::Tenant(TenantError::AccessDenied { .. })
        )
    }
}
