//! # wayfarer-rest - HTTP API for the Wayfarer travel CRM
//!
//! This crate exposes the multi-tenant CRM over JSON/HTTP. Every request is
//! mapped to a tenant by the host it was sent to, authenticated with a bearer
//! token, authorized against a fixed role table and then executed against
//! storage restricted to that tenant.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wayfarer_rest::{create_app_with_config, ServerConfig};
//! use wayfarer_persistence::backends::sqlite::SqliteBackend;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::open("wayfarer.db")?;
//!     backend.init_schema()?;
//!
//!     let config = ServerConfig::default();
//!     let app = create_app_with_config(backend, config.clone());
//!
//!     wayfarer_rest::serve(app, &config).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Method | URL Pattern | Roles |
//! |--------|-------------|-------|
//! | GET | `/health` | none |
//! | POST | `/api/auth/login` | none |
//! | POST | `/api/auth/refresh` | none (refresh token) |
//! | POST | `/api/auth/logout` | none (refresh token) |
//! | GET | `/api/auth/me` | any |
//! | GET, PATCH | `/api/tenant` | any, PATCH ADMIN |
//! | GET, POST | `/api/users` | any, POST ADMIN |
//! | GET, PUT, PATCH, DELETE | `/api/users/{id}` | any, writes ADMIN |
//! | GET, POST | `/api/{collection}` | any, POST ADMIN/MANAGER/AGENT |
//! | GET, PUT, PATCH, DELETE | `/api/{collection}/{id}` | any, writes ADMIN/MANAGER |
//!
//! Collections: `leads`, `customers`, `deals`, `communications`, `packages`,
//! `bookings`, `integrations`, `campaigns`, `conversations`.
//!
//! ## HTTP Headers
//!
//! - `Host` - Selects the tenant
//! - `Authorization: Bearer <token>` - Authenticates the caller
//! - `X-Tenant-Domain` - Selects the tenant explicitly (only with `--allow-domain-header`)
//! - `X-Request-Id` - Propagated, or generated when absent
//!
//! ## Architecture
//!
//! - [`config`] - Server configuration
//! - [`error`] - Error types and their JSON form
//! - [`state`] - Application state (storage, configuration, tokens)
//! - [`tenant`] - Host-based tenant resolution
//! - [`auth`] - Tokens, passwords and principals
//! - [`access`] - The permission table and access gates
//! - [`context`] - The per-request context extractor
//! - [`extractors`] - Other axum extractors
//! - [`handlers`] - HTTP request handlers
//! - [`routing`] - Route configuration

#![warn(rustdoc::missing_crate_level_docs)]

pub mod access;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routing;
pub mod state;
pub mod tenant;

// Re-export commonly used types
pub use config::ServerConfig;
pub use context::RequestContext;
pub use error::{RestError, RestResult};
pub use state::AppState;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use http::StatusCode;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use wayfarer_persistence::CrmStorage;

use crate::context::X_REQUEST_ID;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Creates the Axum application with default configuration.
///
/// For more control, use [`create_app_with_config`].
pub fn create_app<S>(storage: S) -> Router
where
    S: CrmStorage + 'static,
{
    create_app_with_config(storage, ServerConfig::default())
}

/// Creates the Axum application with custom configuration.
///
/// This function sets up all routes together with tracing, timeout,
/// request id and CORS middleware.
///
/// # Example
///
/// ```rust,ignore
/// use wayfarer_rest::{create_app_with_config, ServerConfig};
/// use wayfarer_persistence::backends::sqlite::SqliteBackend;
///
/// let backend = SqliteBackend::in_memory()?;
/// backend.init_schema()?;
/// let app = create_app_with_config(backend, ServerConfig::for_testing());
/// ```
pub fn create_app_with_config<S>(storage: S, config: ServerConfig) -> Router
where
    S: CrmStorage + 'static,
{
    info!(
        "Creating API server with backend: {}",
        storage.backend_name()
    );
    if config.uses_development_secret() {
        warn!("Access tokens are signed with the built-in development secret");
    }
    if config.allow_domain_header {
        warn!("X-Tenant-Domain is honored; clients can choose their tenant");
    }

    // Create application state
    let state = AppState::new(Arc::new(storage), config.clone());

    // Build the router with all API routes
    let router = routing::create_routes(state);

    // Build middleware stack
    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout),
        ));

    // Add CORS if enabled
    let router = if config.enable_cors {
        let cors = build_cors_layer(&config);
        router.layer(cors)
    } else {
        router
    };

    // Apply remaining middleware
    let router = router.layer(service_builder);

    // Outermost, so the id is set before tracing and handlers see the request
    if config.enable_request_id {
        router
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone()))
            .layer(SetRequestIdLayer::new(
                X_REQUEST_ID.clone(),
                MakeRequestUuid,
            ))
    } else {
        router
    }
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    // Configure origins
    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    // Configure methods
    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    // Configure headers
    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors
}

/// Binds the configured address and serves `app` until Ctrl-C.
pub async fn serve(app: Router, config: &ServerConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
    info!(
        address = %listener.local_addr()?,
        domain_match = %config.domain_match,
        "Wayfarer API listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup. `RUST_LOG` overrides
/// the filter derived from `level`.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "wayfarer={level},wayfarer_rest={level},wayfarer_persistence={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
