//! API test harness.
//!
//! Wraps an [`axum_test::TestServer`] running the full application (with
//! middleware) over an in-memory SQLite backend that tests can also seed
//! directly.

use std::sync::OnceLock;

use axum::http::{HeaderName, HeaderValue, Method, header::AUTHORIZATION};
use axum_test::{TestRequest, TestServer};
use serde_json::Value;
use wayfarer_persistence::backends::sqlite::SqliteBackend;
use wayfarer_persistence::core::{TenantDirectory, UserDirectory};
use wayfarer_persistence::identity::NewUser;
use wayfarer_persistence::tenant::{NewTenant, TenantContext};
use wayfarer_persistence::{Role, Tenant, UserRecord};
use wayfarer_rest::auth::{TokenService, hash_password};
use wayfarer_rest::{ServerConfig, create_app_with_config};

pub const X_TENANT_DOMAIN: HeaderName = HeaderName::from_static("x-tenant-domain");

/// Password of every seeded user.
pub const PASSWORD: &str = "correct-horse-battery";

/// Hashing is slow in debug builds, so all seeded users share one hash.
fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).expect("Failed to hash password"))
}

/// A running application plus direct access to its storage.
pub struct TestApp {
    /// The test server instance.
    pub server: TestServer,
    /// The storage backend, shared with the server.
    pub backend: SqliteBackend,
    /// Server configuration.
    pub config: ServerConfig,
    tokens: TokenService,
}

impl TestApp {
    /// Creates an app with [`ServerConfig::for_testing`].
    pub fn new() -> Self {
        Self::with_config(ServerConfig::for_testing())
    }

    /// Creates an app with the given configuration.
    pub fn with_config(config: ServerConfig) -> Self {
        let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
        backend.init_schema().expect("Failed to initialize schema");

        let app = create_app_with_config(backend.clone(), config.clone());
        let server = TestServer::new(app).expect("Failed to create test server");
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_minutes);

        Self {
            server,
            backend,
            config,
            tokens,
        }
    }

    /// Seeds a tenant.
    pub async fn tenant(&self, name: &str, domain: &str) -> Tenant {
        self.backend
            .create_tenant(NewTenant::new(name, domain))
            .await
            .expect("Failed to seed tenant")
    }

    /// Seeds a user with [`PASSWORD`].
    pub async fn user(&self, tenant: &Tenant, email: &str, role: Role) -> UserRecord {
        self.backend
            .create_user(
                &TenantContext::new(tenant.id),
                NewUser::new(email, password_hash()).with_role(role),
            )
            .await
            .expect("Failed to seed user")
    }

    /// Issues a token for `user` without going through login.
    pub fn token(&self, user: &UserRecord) -> String {
        self.tokens
            .issue(user)
            .expect("Failed to issue token")
            .access_token
    }

    /// A caller reaching the app through `domain` as `user`.
    pub fn caller(&self, domain: &str, user: Option<&UserRecord>) -> Caller<'_> {
        Caller {
            app: self,
            domain: Some(domain.to_string()),
            token: user.map(|u| self.token(u)),
        }
    }

    /// A caller sending a raw token.
    pub fn caller_with_token(&self, domain: Option<&str>, token: &str) -> Caller<'_> {
        Caller {
            app: self,
            domain: domain.map(String::from),
            token: Some(token.to_string()),
        }
    }

    /// A caller whose request resolves to no tenant.
    pub fn unresolved_caller(&self, user: &UserRecord) -> Caller<'_> {
        Caller {
            app: self,
            domain: None,
            token: Some(self.token(user)),
        }
    }
}

/// Builds requests with a fixed tenant domain and token.
pub struct Caller<'a> {
    app: &'a TestApp,
    domain: Option<String>,
    token: Option<String>,
}

impl Caller<'_> {
    /// Starts a request with this caller's headers.
    pub fn request(&self, method: Method, path: &str) -> TestRequest {
        let mut request = self.app.server.method(method, path);
        if let Some(domain) = &self.domain {
            request = request.add_header(
                X_TENANT_DOMAIN,
                HeaderValue::from_str(domain).expect("Invalid domain header"),
            );
        }
        if let Some(token) = &self.token {
            request = request.add_header(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {token}")).expect("Invalid token header"),
            );
        }
        request
    }

    pub fn get(&self, path: &str) -> TestRequest {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str, body: &Value) -> TestRequest {
        self.request(Method::POST, path).json(body)
    }

    pub fn put(&self, path: &str, body: &Value) -> TestRequest {
        self.request(Method::PUT, path).json(body)
    }

    pub fn patch(&self, path: &str, body: &Value) -> TestRequest {
        self.request(Method::PATCH, path).json(body)
    }

    pub fn delete(&self, path: &str) -> TestRequest {
        self.request(Method::DELETE, path)
    }
}
