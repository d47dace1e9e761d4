//! Server configuration for the Wayfarer HTTP API.
//!
//! This module provides configuration types for the server, supporting
//! both programmatic configuration and environment variable overrides.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `WAYFARER_PORT` | 8080 | Server port |
//! | `WAYFARER_HOST` | 127.0.0.1 | Host to bind |
//! | `WAYFARER_LOG_LEVEL` | info | Log level |
//! | `WAYFARER_REQUEST_TIMEOUT` | 30 | Request timeout (seconds) |
//! | `WAYFARER_ENABLE_CORS` | true | Enable CORS |
//! | `WAYFARER_CORS_ORIGINS` | * | Allowed origins |
//! | `WAYFARER_CORS_METHODS` | GET,POST,PUT,PATCH,DELETE,OPTIONS | Allowed methods |
//! | `WAYFARER_CORS_HEADERS` | Content-Type,Authorization,Accept,X-Tenant-Domain,X-Request-Id | Allowed headers |
//! | `WAYFARER_DATABASE_PATH` | (in-memory) | SQLite database file |
//! | `WAYFARER_JWT_SECRET` | development secret | HS256 signing secret |
//! | `WAYFARER_TOKEN_TTL_MINUTES` | 480 | Access token lifetime |
//! | `WAYFARER_REFRESH_TTL_DAYS` | 7 | Refresh token lifetime |
//! | `WAYFARER_LOCKOUT_THRESHOLD` | 5 | Failed logins before an account locks |
//! | `WAYFARER_LOCKOUT_MINUTES` | 15 | How long a locked account stays locked |
//! | `WAYFARER_DOMAIN_MATCH` | suffix | `exact` or `suffix` host matching |
//! | `WAYFARER_ALLOW_DOMAIN_HEADER` | false | Honor `X-Tenant-Domain` (development only) |
//! | `WAYFARER_DEFAULT_PAGE_SIZE` | 20 | Default list page size |
//! | `WAYFARER_MAX_PAGE_SIZE` | 100 | Maximum list page size |
//!
//! # Example
//!
//! ```rust
//! use wayfarer_rest::ServerConfig;
//!
//! // Create from environment
//! let config = ServerConfig::from_env();
//!
//! // Or create programmatically
//! let config = ServerConfig {
//!     port: 3000,
//!     host: "0.0.0.0".to_string(),
//!     enable_cors: true,
//!     ..Default::default()
//! };
//! ```

use chrono::Duration;
use clap::Parser;
use wayfarer_persistence::DomainMatch;
use wayfarer_persistence::identity::LockoutPolicy;

/// Signing secret used when none is configured. Only fit for development.
pub const DEVELOPMENT_JWT_SECRET: &str = "wayfarer-development-secret-change-me";

/// Longest accepted access token lifetime (one year).
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 366;

/// Longest accepted refresh token lifetime.
pub const MAX_REFRESH_TTL_DAYS: i64 = 366;

/// Longest accepted account lock.
pub const MAX_LOCKOUT_MINUTES: i64 = 60 * 24 * 366;

/// Server configuration for the Wayfarer HTTP API.
///
/// This struct can be constructed from environment variables using [`ServerConfig::from_env`],
/// from command line arguments using [`ServerConfig::parse`], or programmatically.
#[derive(Debug, Clone, Parser)]
#[command(name = "wayfarer-server")]
#[command(about = "Wayfarer travel CRM API server")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "WAYFARER_PORT", default_value = "8080")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "WAYFARER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "WAYFARER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Request timeout in seconds.
    #[arg(long, env = "WAYFARER_REQUEST_TIMEOUT", default_value = "30")]
    pub request_timeout: u64,

    /// Enable CORS.
    #[arg(long, env = "WAYFARER_ENABLE_CORS", default_value = "true")]
    pub enable_cors: bool,

    /// Allowed CORS origins (comma-separated, or * for all).
    #[arg(long, env = "WAYFARER_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Allowed CORS methods (comma-separated, or * for all).
    #[arg(
        long,
        env = "WAYFARER_CORS_METHODS",
        default_value = "GET,POST,PUT,PATCH,DELETE,OPTIONS"
    )]
    pub cors_methods: String,

    /// Allowed CORS headers (comma-separated, or * for all).
    #[arg(
        long,
        env = "WAYFARER_CORS_HEADERS",
        default_value = "Content-Type,Authorization,Accept,X-Tenant-Domain,X-Request-Id"
    )]
    pub cors_headers: String,

    /// SQLite database file. An in-memory database is used when unset.
    #[arg(long, env = "WAYFARER_DATABASE_PATH")]
    pub database_path: Option<String>,

    /// Secret used to sign and verify access tokens.
    #[arg(long, env = "WAYFARER_JWT_SECRET", default_value = DEVELOPMENT_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: String,

    /// Access token lifetime in minutes.
    #[arg(long, env = "WAYFARER_TOKEN_TTL_MINUTES", default_value = "480")]
    pub token_ttl_minutes: i64,

    /// Refresh token lifetime in days.
    #[arg(long, env = "WAYFARER_REFRESH_TTL_DAYS", default_value = "7")]
    pub refresh_ttl_days: i64,

    /// Consecutive failed logins that lock an account.
    #[arg(long, env = "WAYFARER_LOCKOUT_THRESHOLD", default_value = "5")]
    pub lockout_threshold: u32,

    /// Minutes a locked account refuses password logins.
    #[arg(long, env = "WAYFARER_LOCKOUT_MINUTES", default_value = "15")]
    pub lockout_minutes: i64,

    /// How inbound hosts are matched against tenant domains (exact, suffix).
    #[arg(long, env = "WAYFARER_DOMAIN_MATCH", default_value = "suffix")]
    pub domain_match: DomainMatch,

    /// Honor the X-Tenant-Domain header. Lets any client pick its tenant, so
    /// only enable it for local development.
    #[arg(long, env = "WAYFARER_ALLOW_DOMAIN_HEADER", default_value = "false")]
    pub allow_domain_header: bool,

    /// Enable request ID tracking.
    #[arg(long, env = "WAYFARER_ENABLE_REQUEST_ID", default_value = "true")]
    pub enable_request_id: bool,

    /// Default page size for list results.
    #[arg(long, env = "WAYFARER_DEFAULT_PAGE_SIZE", default_value = "20")]
    pub default_page_size: usize,

    /// Maximum page size for list results.
    #[arg(long, env = "WAYFARER_MAX_PAGE_SIZE", default_value = "100")]
    pub max_page_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            request_timeout: 30,
            enable_cors: true,
            cors_origins: "*".to_string(),
            cors_methods: "GET,POST,PUT,PATCH,DELETE,OPTIONS".to_string(),
            cors_headers: "Content-Type,Authorization,Accept,X-Tenant-Domain,X-Request-Id"
                .to_string(),
            database_path: None,
            jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
            token_ttl_minutes: 480,
            refresh_ttl_days: 7,
            lockout_threshold: 5,
            lockout_minutes: 15,
            domain_match: DomainMatch::Suffix,
            allow_domain_header: false,
            enable_request_id: true,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl ServerConfig {
    /// Creates a new ServerConfig from environment variables.
    ///
    /// This is a convenience method that parses environment variables without
    /// requiring command line arguments.
    pub fn from_env() -> Self {
        // Try to parse from environment, falling back to defaults
        Self::try_parse().unwrap_or_default()
    }

    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns true if tokens are signed with the built-in development secret.
    pub fn uses_development_secret(&self) -> bool {
        self.jwt_secret == DEVELOPMENT_JWT_SECRET
    }

    /// The account lockout policy.
    pub fn lockout_policy(&self) -> LockoutPolicy {
        LockoutPolicy {
            max_failures: self.lockout_threshold,
            lock_for: Duration::minutes(self.lockout_minutes),
        }
    }

    /// Validates the configuration and returns errors if any.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("Port cannot be 0".to_string());
        }

        if self.request_timeout == 0 {
            errors.push("Request timeout cannot be 0".to_string());
        }

        if self.jwt_secret.len() < 16 {
            errors.push("JWT secret must be at least 16 bytes".to_string());
        }

        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&self.token_ttl_minutes) {
            errors.push(format!(
                "Token lifetime must be between 1 and {MAX_TOKEN_TTL_MINUTES} minutes"
            ));
        }

        if !(1..=MAX_REFRESH_TTL_DAYS).contains(&self.refresh_ttl_days) {
            errors.push(format!(
                "Refresh token lifetime must be between 1 and {MAX_REFRESH_TTL_DAYS} days"
            ));
        }

        if self.lockout_threshold == 0 {
            errors.push("Lockout threshold must be at least 1".to_string());
        }

        if !(1..=MAX_LOCKOUT_MINUTES).contains(&self.lockout_minutes) {
            errors.push(format!(
                "Lockout duration must be between 1 and {MAX_LOCKOUT_MINUTES} minutes"
            ));
        }

        if self.default_page_size == 0 {
            errors.push("Default page size cannot be 0".to_string());
        }

        if self.default_page_size > self.max_page_size {
            errors.push("Default page size cannot exceed max page size".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Creates a configuration suitable for testing.
    ///
    /// This uses ephemeral port 0, an in-memory database, and honors the
    /// X-Tenant-Domain header so tests can pick a tenant per request.
    pub fn for_testing() -> Self {
        Self {
            port: 0, // Let OS assign port
            host: "127.0.0.1".to_string(),
            log_level: "debug".to_string(),
            request_timeout: 15, // Shorter timeout for tests
            enable_cors: false,
            cors_origins: "*".to_string(),
            cors_methods: "*".to_string(),
            cors_headers: "*".to_string(),
            database_path: None,
            jwt_secret: "wayfarer-test-secret-0123456789".to_string(),
            token_ttl_minutes: 60,
            refresh_ttl_days: 7,
            lockout_threshold: 5,
            lockout_minutes: 15,
            domain_match: DomainMatch::Suffix,
            allow_domain_header: true,
            enable_request_id: true,
            default_page_size: 10,
            max_page_size: 50,
        }
    }
}
