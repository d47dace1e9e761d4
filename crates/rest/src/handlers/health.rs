//! Health check endpoint handler.
//!
//! Provides a health check endpoint for monitoring and load balancers. The
//! storage backend is asked to confirm it can serve requests.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};
use wayfarer_persistence::CrmStorage;

use crate::error::RestResult;
use crate::state::AppState;

/// Handler for the health check endpoint.
///
/// Requires no authentication and no tenant.
///
/// # HTTP Request
///
/// `GET /health`
///
/// # Response
///
/// - `200 OK` - Server and storage are healthy
/// - `503 Service Unavailable` - Storage failed its check
pub async fn health_handler<S>(State(state): State<AppState<S>>) -> RestResult<Response>
where
    S: CrmStorage,
{
    debug!("Processing health check request");

    let (status, label) = match state.storage().health_check().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            error!(error = %e, "Storage health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    let health_response = serde_json::json!({
        "status": label,
        "backend": state.storage().backend_name(),
        "version": crate::VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339()
    });

    Ok((status, Json(health_response)).into_response())
}
