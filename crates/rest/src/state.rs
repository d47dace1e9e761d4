//! Application state for the Wayfarer HTTP API.
//!
//! This module defines the shared application state that is available to all
//! request handlers: the storage backend, configuration and the token
//! service. All of it is immutable after startup; per-request data lives in
//! [`RequestContext`](crate::context::RequestContext).

use std::sync::Arc;

use wayfarer_persistence::CrmStorage;

use crate::auth::TokenService;
use crate::config::ServerConfig;

/// Shared application state for the REST API.
///
/// # Type Parameters
///
/// * `S` - The storage backend type (must implement [`CrmStorage`])
///
/// # Example
///
/// ```rust,ignore
/// use wayfarer_rest::{AppState, ServerConfig};
/// use wayfarer_persistence::backends::sqlite::SqliteBackend;
/// use std::sync::Arc;
///
/// let backend = SqliteBackend::in_memory()?;
/// let config = ServerConfig::default();
/// let state = AppState::new(Arc::new(backend), config);
/// ```
pub struct AppState<S> {
    /// The storage backend.
    storage: Arc<S>,

    /// Server configuration.
    config: Arc<ServerConfig>,

    /// Issues and verifies access tokens.
    tokens: Arc<TokenService>,
}

// Manually implement Clone since S is wrapped in Arc and doesn't need to be Clone
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            config: Arc::clone(&self.config),
            tokens: Arc::clone(&self.tokens),
        }
    }
}

impl<S: CrmStorage> AppState<S> {
    /// Creates a new AppState with the given storage and configuration.
    pub fn new(storage: Arc<S>, config: ServerConfig) -> Self {
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_minutes)
            .with_refresh_ttl_days(config.refresh_ttl_days);
        Self {
            storage,
            config: Arc::new(config),
            tokens: Arc::new(tokens),
        }
    }

    /// Returns a reference to the storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns a reference to the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the token service.
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Returns the default page size for list results.
    pub fn default_page_size(&self) -> usize {
        self.config.default_page_size
    }

    /// Returns the maximum page size for list results.
    pub fn max_page_size(&self) -> usize {
        self.config.max_page_size
    }
}
