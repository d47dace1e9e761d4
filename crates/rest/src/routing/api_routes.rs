//! API route configuration.
//!
//! Defines all routes of the Wayfarer HTTP API.

use axum::{
    Router,
    routing::{get, post},
};
use wayfarer_persistence::CrmStorage;

use crate::handlers;
use crate::state::AppState;

/// Creates all API routes.
///
/// # Routes
///
/// ## Unauthenticated
/// - `GET /health` - Health check
/// - `POST /api/auth/login` - Issue an access and a refresh token
/// - `POST /api/auth/refresh` - Rotate a refresh token
/// - `POST /api/auth/logout` - Revoke a refresh token
///
/// ## Principal and tenant
/// - `GET /api/auth/me` - Current principal
/// - `GET, PATCH /api/tenant` - Current tenant
/// - `GET, POST /api/users` - List, create users
/// - `GET, PUT, PATCH, DELETE /api/users/{id}` - User object
///
/// ## Records
/// - `GET, POST /api/{collection}` - List, create
/// - `GET, PUT, PATCH, DELETE /api/{collection}/{id}` - Record object
///
/// Static segments take precedence over `{collection}`, so `users` and
/// `tenant` never reach the record handlers.
pub fn create_routes<S>(state: AppState<S>) -> Router
where
    S: CrmStorage + 'static,
{
    Router::new()
        .route("/health", get(handlers::health_handler::<S>))
        // Authentication
        .route("/api/auth/login", post(handlers::login_handler::<S>))
        .route("/api/auth/refresh", post(handlers::refresh_handler::<S>))
        .route("/api/auth/logout", post(handlers::logout_handler::<S>))
        .route("/api/auth/me", get(handlers::me_handler::<S>))
        // Tenant profile
        .route(
            "/api/tenant",
            get(handlers::get_tenant_handler).patch(handlers::patch_tenant_handler::<S>),
        )
        // Principals
        .route(
            "/api/users",
            get(handlers::list_users_handler::<S>).post(handlers::create_user_handler::<S>),
        )
        .route(
            "/api/users/{id}",
            get(handlers::read_user_handler::<S>)
                .put(handlers::replace_user_handler::<S>)
                .patch(handlers::patch_user_handler::<S>)
                .delete(handlers::delete_user_handler::<S>),
        )
        // Records
        .route(
            "/api/{collection}",
            get(handlers::list_records_handler::<S>).post(handlers::create_record_handler::<S>),
        )
        .route(
            "/api/{collection}/{id}",
            get(handlers::read_record_handler::<S>)
                .put(handlers::update_record_handler::<S>)
                .patch(handlers::patch_record_handler::<S>)
                .delete(handlers::delete_record_handler::<S>),
        )
        // State
        .with_state(state)
}
