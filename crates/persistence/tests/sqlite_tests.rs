//! SQLite backend integration tests.
//!
//! These tests exercise record CRUD, reference rules and the tenant and user
//! directories against an in-memory database.

use chrono::{Duration, Utc};
use serde_json::{Value, json};

use wayfarer_persistence::backends::sqlite::SqliteBackend;
use wayfarer_persistence::core::{RecordStorage, SessionStore, TenantDirectory, UserDirectory};
use wayfarer_persistence::error::{ResourceError, StorageError, TenantError, ValidationError};
use wayfarer_persistence::identity::{LockoutPolicy, NewUser, Role, UserUpdate};
use wayfarer_persistence::tenant::{DomainMatch, NewTenant, TenantContext, TenantUpdate};
use wayfarer_persistence::types::{ListQuery, RefTarget, ResourceKind};

fn create_backend() -> SqliteBackend {
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    backend.init_schema().expect("Failed to initialize schema");
    backend
}

async fn create_tenant(backend: &SqliteBackend, domain: &str) -> TenantContext {
    let tenant = backend
        .create_tenant(NewTenant::new(format!("Agency {domain}"), domain))
        .await
        .expect("Failed to create tenant");
    TenantContext::new(tenant.id)
}

fn customer_json() -> Value {
    json!({"customer_type": "individual", "loyalty_level": "gold"})
}

fn package_json() -> Value {
    json!({
        "name": "Lisbon Weekend",
        "base_price": "799.00",
        "duration": 3,
        "destination": "Lisbon"
    })
}

// ============================================================================
// Record CRUD
// ============================================================================

#[tokio::test]
async fn test_create_applies_defaults() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;

    let lead = backend
        .create(
            &tenant,
            ResourceKind::Lead,
            json!({"first_name": "Ada", "email": "Ada@Example.com", "budget": 2500}),
        )
        .await
        .unwrap();

    assert!(lead.id() > 0);
    assert_eq!(lead.tenant_id(), tenant.tenant_id());
    assert_eq!(lead.content()["status"], "new");
    assert_eq!(lead.content()["score"], 0);
    assert_eq!(lead.content()["adults"], 1);
    assert_eq!(lead.content()["email"], "ada@example.com");
    assert_eq!(lead.content()["budget"], "2500.00");
    assert_eq!(lead.content()["assigned_to"], Value::Null);
}

#[tokio::test]
async fn test_create_ignores_client_tenant_and_id() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;
    let other = create_tenant(&backend, "other.travelco").await;

    let lead = backend
        .create(
            &tenant,
            ResourceKind::Lead,
            json!({"id": 999, "tenant": other.tenant_id().value(), "first_name": "Ada"}),
        )
        .await
        .unwrap();

    assert_ne!(lead.id(), 999);
    assert_eq!(lead.tenant_id(), tenant.tenant_id());
}

#[tokio::test]
async fn test_create_rejects_invalid_body() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;

    let missing = backend
        .create(&tenant, ResourceKind::Package, json!({"name": "No price"}))
        .await;
    assert!(matches!(
        missing,
        Err(StorageError::Validation(ValidationError::MissingRequiredField { .. }))
    ));

    let bad_status = backend
        .create(&tenant, ResourceKind::Lead, json!({"status": "won"}))
        .await;
    assert!(matches!(bad_status, Err(StorageError::Validation(_))));

    let not_object = backend.create(&tenant, ResourceKind::Lead, json!([1, 2])).await;
    assert!(matches!(
        not_object,
        Err(StorageError::Validation(ValidationError::NotAnObject))
    ));
}

#[tokio::test]
async fn test_read_missing_returns_none() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;

    let read = backend.read(&tenant, ResourceKind::Lead, 42).await.unwrap();
    assert!(read.is_none());
}

#[tokio::test]
async fn test_update_replaces_content() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;

    let lead = backend
        .create(
            &tenant,
            ResourceKind::Lead,
            json!({"first_name": "Ada", "notes": "call back"}),
        )
        .await
        .unwrap();

    let updated = backend
        .update(
            &tenant,
            ResourceKind::Lead,
            lead.id(),
            json!({"first_name": "Grace", "status": "contacted"}),
        )
        .await
        .unwrap();

    assert_eq!(updated.id(), lead.id());
    assert_eq!(updated.content()["first_name"], "Grace");
    assert_eq!(updated.content()["status"], "contacted");
    assert_eq!(updated.content()["notes"], Value::Null);
    assert_eq!(updated.created_at(), lead.created_at());
}

#[tokio::test]
async fn test_patch_merges_content() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;

    let lead = backend
        .create(
            &tenant,
            ResourceKind::Lead,
            json!({"first_name": "Ada", "notes": "call back"}),
        )
        .await
        .unwrap();

    let patched = backend
        .patch(
            &tenant,
            ResourceKind::Lead,
            lead.id(),
            json!({"score": 80, "notes": null}),
        )
        .await
        .unwrap();

    assert_eq!(patched.content()["first_name"], "Ada");
    assert_eq!(patched.content()["score"], 80);
    assert_eq!(patched.content()["notes"], Value::Null);
}

#[tokio::test]
async fn test_update_missing_is_not_found() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;

    let result = backend
        .update(&tenant, ResourceKind::Lead, 7, json!({}))
        .await;
    assert!(matches!(
        result,
        Err(StorageError::Resource(ResourceError::NotFound { .. }))
    ));
}

#[tokio::test]
async fn test_list_paginates_in_id_order() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;

    for i in 0..5 {
        backend
            .create(
                &tenant,
                ResourceKind::Lead,
                json!({"first_name": format!("Lead {i}")}),
            )
            .await
            .unwrap();
    }

    let page = backend
        .list(&tenant, ResourceKind::Lead, ListQuery::new(2, 2))
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].content()["first_name"], "Lead 2");

    // An offset beyond i64 reads past the end instead of wrapping to the start
    let page = backend
        .list(&tenant, ResourceKind::Lead, ListQuery::new(10, usize::MAX))
        .await
        .unwrap();
    assert_eq!(page.total, 5);
    assert!(page.items.is_empty());
    assert_eq!(page.offset, usize::MAX);
}

#[tokio::test]
async fn test_integration_credentials_are_redacted() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;

    let integration = backend
        .create(
            &tenant,
            ResourceKind::Integration,
            json!({"integration_type": "stripe", "credentials": {"key": "sk_test"}}),
        )
        .await
        .unwrap();

    assert!(integration.content().contains_key("credentials"));
    let rendered = integration.to_json();
    assert!(rendered.get("credentials").is_none());
    assert_eq!(rendered["is_active"], false);
    assert_eq!(rendered["tenant"], tenant.tenant_id().value());
}

#[tokio::test]
async fn test_integration_type_unique_per_tenant() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;
    let other = create_tenant(&backend, "other.travelco").await;
    let body = json!({"integration_type": "whatsapp", "credentials": {}});

    backend
        .create(&tenant, ResourceKind::Integration, body.clone())
        .await
        .unwrap();

    let duplicate = backend
        .create(&tenant, ResourceKind::Integration, body.clone())
        .await;
    assert!(matches!(
        duplicate,
        Err(StorageError::Resource(ResourceError::Conflict { .. }))
    ));

    // Another tenant may hold the same type.
    backend
        .create(&other, ResourceKind::Integration, body)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_integration_update_keeps_own_type() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;

    let integration = backend
        .create(
            &tenant,
            ResourceKind::Integration,
            json!({"integration_type": "sendgrid", "credentials": {}}),
        )
        .await
        .unwrap();

    let patched = backend
        .patch(
            &tenant,
            ResourceKind::Integration,
            integration.id(),
            json!({"is_active": true}),
        )
        .await
        .unwrap();
    assert_eq!(patched.content()["is_active"], true);
    assert_eq!(patched.content()["credentials"], json!({}));
}

// ============================================================================
// References
// ============================================================================

#[tokio::test]
async fn test_reference_must_exist() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;

    let result = backend
        .create(
            &tenant,
            ResourceKind::Deal,
            json!({"customer": 12345, "title": "Honeymoon", "value": "5000", "stage": "proposal"}),
        )
        .await;
    assert!(matches!(
        result,
        Err(StorageError::Validation(ValidationError::InvalidReference { .. }))
    ));
}

#[tokio::test]
async fn test_deleting_customer_cascades_and_clears() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;

    let customer = backend
        .create(&tenant, ResourceKind::Customer, customer_json())
        .await
        .unwrap();
    let package = backend
        .create(&tenant, ResourceKind::Package, package_json())
        .await
        .unwrap();
    let deal = backend
        .create(
            &tenant,
            ResourceKind::Deal,
            json!({"customer": customer.id(), "title": "Lisbon", "value": "1598", "stage": "won"}),
        )
        .await
        .unwrap();
    let booking = backend
        .create(
            &tenant,
            ResourceKind::Booking,
            json!({
                "customer": customer.id(),
                "package": package.id(),
                "status": "confirmed",
                "total_amount": "1598.00",
                "travel_date": "2026-05-01",
                "pax_count": 2
            }),
        )
        .await
        .unwrap();
    let note = backend
        .create(
            &tenant,
            ResourceKind::Communication,
            json!({"customer": customer.id(), "type": "email", "status": "sent"}),
        )
        .await
        .unwrap();

    backend
        .delete(&tenant, ResourceKind::Customer, customer.id())
        .await
        .unwrap();

    assert!(backend.read(&tenant, ResourceKind::Deal, deal.id()).await.unwrap().is_none());
    assert!(
        backend
            .read(&tenant, ResourceKind::Booking, booking.id())
            .await
            .unwrap()
            .is_none()
    );
    let note = backend
        .read(&tenant, ResourceKind::Communication, note.id())
        .await
        .unwrap()
        .expect("communication survives its customer");
    assert_eq!(note.content()["customer"], Value::Null);
    // The package is untouched.
    assert!(
        backend
            .read(&tenant, ResourceKind::Package, package.id())
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_deleting_lead_clears_customer_link() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;

    let lead = backend
        .create(&tenant, ResourceKind::Lead, json!({"first_name": "Ada"}))
        .await
        .unwrap();
    let customer = backend
        .create(&tenant, ResourceKind::Customer, json!({"lead": lead.id()}))
        .await
        .unwrap();

    backend
        .delete(&tenant, ResourceKind::Lead, lead.id())
        .await
        .unwrap();

    let customer = backend
        .read(&tenant, ResourceKind::Customer, customer.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(customer.content()["lead"], Value::Null);
}

#[tokio::test]
async fn test_delete_missing_is_not_found() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;

    let result = backend.delete(&tenant, ResourceKind::Package, 3).await;
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_owner_of() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;

    let package = backend
        .create(&tenant, ResourceKind::Package, package_json())
        .await
        .unwrap();

    let owner = backend
        .owner_of(&tenant, RefTarget::Record(ResourceKind::Package), package.id())
        .await
        .unwrap();
    assert_eq!(owner, Some(tenant.tenant_id()));

    let wrong_kind = backend
        .owner_of(&tenant, RefTarget::Record(ResourceKind::Lead), package.id())
        .await
        .unwrap();
    assert_eq!(wrong_kind, None);
}

// ============================================================================
// Tenant Directory
// ============================================================================

#[tokio::test]
async fn test_tenant_domain_is_unique() {
    let backend = create_backend();
    backend
        .create_tenant(NewTenant::new("Demo", "demo.travelco"))
        .await
        .unwrap();

    let duplicate = backend
        .create_tenant(NewTenant::new("Copy", "Demo.TravelCo"))
        .await;
    assert!(matches!(
        duplicate,
        Err(StorageError::Resource(ResourceError::Conflict { .. }))
    ));
}

#[tokio::test]
async fn test_tenant_defaults_and_update() {
    let backend = create_backend();
    let tenant = backend
        .create_tenant(NewTenant::new("Demo", "demo.travelco"))
        .await
        .unwrap();
    assert_eq!(tenant.subscription_tier, "basic");
    assert!(tenant.settings.is_empty());

    let updated = backend
        .update_tenant(
            tenant.id,
            TenantUpdate {
                subscription_tier: Some("starter".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.subscription_tier, "starter");

    let reloaded = backend.get_tenant(tenant.id).await.unwrap().unwrap();
    assert_eq!(reloaded, updated);
}

#[tokio::test]
async fn test_resolve_host_exact_and_suffix() {
    let backend = create_backend();
    let demo = backend
        .create_tenant(NewTenant::new("Demo", "demo.travelco"))
        .await
        .unwrap();
    let eu = backend
        .create_tenant(NewTenant::new("Demo EU", "eu.demo.travelco"))
        .await
        .unwrap();

    let exact = backend
        .resolve_host("Demo.TravelCo:8000", DomainMatch::Exact)
        .await
        .unwrap();
    assert_eq!(exact.map(|t| t.id), Some(demo.id));

    let sub = backend
        .resolve_host("app.demo.travelco", DomainMatch::Exact)
        .await
        .unwrap();
    assert!(sub.is_none());

    let suffix = backend
        .resolve_host("app.demo.travelco", DomainMatch::Suffix)
        .await
        .unwrap();
    assert_eq!(suffix.map(|t| t.id), Some(demo.id));

    // The most specific domain wins.
    let nested = backend
        .resolve_host("app.eu.demo.travelco", DomainMatch::Suffix)
        .await
        .unwrap();
    assert_eq!(nested.map(|t| t.id), Some(eu.id));
}

#[tokio::test]
async fn test_resolve_host_rejects_lookalikes() {
    let backend = create_backend();
    backend
        .create_tenant(NewTenant::new("Demo", "demo.travelco"))
        .await
        .unwrap();

    for host in [
        "evildemo.travelco",
        "demo.travelco.evil.com",
        "travelco",
        "eu..demo.travelco",
        "",
    ] {
        let resolved = backend
            .resolve_host(host, DomainMatch::Suffix)
            .await
            .unwrap();
        assert!(resolved.is_none(), "{host} must not resolve");
    }
}

#[tokio::test]
async fn test_delete_tenant_removes_everything() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;
    let user = backend
        .create_user(&tenant, NewUser::new("agent@demo.travelco", "$argon2id$hash"))
        .await
        .unwrap();
    backend
        .create(&tenant, ResourceKind::Lead, json!({"first_name": "Ada"}))
        .await
        .unwrap();

    backend.delete_tenant(tenant.tenant_id()).await.unwrap();

    assert!(backend.get_tenant(tenant.tenant_id()).await.unwrap().is_none());
    assert!(backend.find_user(user.id).await.unwrap().is_none());
    assert!(matches!(
        backend.delete_tenant(tenant.tenant_id()).await,
        Err(StorageError::Tenant(TenantError::UnknownTenant { .. }))
    ));
}

// ============================================================================
// User Directory
// ============================================================================

#[tokio::test]
async fn test_user_lifecycle() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;

    let user = backend
        .create_user(
            &tenant,
            NewUser::new("Manager@Demo.TravelCo", "$argon2id$hash")
                .with_role(Role::Manager)
                .with_name("Mia", "Manager"),
        )
        .await
        .unwrap();
    assert_eq!(user.email, "manager@demo.travelco");
    assert_eq!(user.role, Role::Manager);
    assert!(user.is_active);

    let found = backend
        .find_user_by_email("MANAGER@demo.travelco")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, user.id);
    assert_eq!(found.password_hash, "$argon2id$hash");

    let updated = backend
        .update_user(
            &tenant,
            user.id,
            UserUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!updated.is_active);

    let now = Utc::now();
    backend.record_login(user.id, now).await.unwrap();
    let reloaded = backend.find_user(user.id).await.unwrap().unwrap();
    assert!(reloaded.last_login.is_some());

    let page = backend
        .list_users(&tenant, ListQuery::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn test_user_email_unique_across_tenants() {
    let backend = create_backend();
    let a = create_tenant(&backend, "a.travelco").await;
    let b = create_tenant(&backend, "b.travelco").await;

    backend
        .create_user(&a, NewUser::new("agent@example.com", "$argon2id$hash"))
        .await
        .unwrap();
    let duplicate = backend
        .create_user(&b, NewUser::new("agent@example.com", "$argon2id$hash"))
        .await;
    assert!(matches!(
        duplicate,
        Err(StorageError::Resource(ResourceError::Conflict { .. }))
    ));
}

#[tokio::test]
async fn test_deleting_user_clears_assignments() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;
    let agent = backend
        .create_user(&tenant, NewUser::new("agent@demo.travelco", "$argon2id$hash"))
        .await
        .unwrap();
    let lead = backend
        .create(
            &tenant,
            ResourceKind::Lead,
            json!({"first_name": "Ada", "assigned_to": agent.id}),
        )
        .await
        .unwrap();
    assert_eq!(lead.get_i64("assigned_to"), Some(agent.id));

    backend.delete_user(&tenant, agent.id).await.unwrap();

    let lead = backend
        .read(&tenant, ResourceKind::Lead, lead.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lead.content()["assigned_to"], Value::Null);
}

#[tokio::test]
async fn test_failed_logins_lock_account() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;
    let user = backend
        .create_user(&tenant, NewUser::new("agent@demo.travelco", "$argon2id$hash"))
        .await
        .unwrap();
    let policy = LockoutPolicy {
        max_failures: 3,
        lock_for: Duration::minutes(15),
    };
    let now = Utc::now();

    for _ in 0..2 {
        let locked = backend
            .record_failed_login(user.id, now, policy)
            .await
            .unwrap();
        assert!(locked.is_none());
    }
    let reloaded = backend.find_user(user.id).await.unwrap().unwrap();
    assert_eq!(reloaded.failed_logins, 2);
    assert!(!reloaded.is_locked(now));

    let locked = backend
        .record_failed_login(user.id, now, policy)
        .await
        .unwrap();
    assert_eq!(locked, Some(now + Duration::minutes(15)));
    let reloaded = backend.find_user(user.id).await.unwrap().unwrap();
    assert!(reloaded.is_locked(now));
    assert!(!reloaded.is_locked(now + Duration::minutes(16)));

    // A successful login clears both the count and the lock
    backend.record_login(user.id, now).await.unwrap();
    let reloaded = backend.find_user(user.id).await.unwrap().unwrap();
    assert_eq!(reloaded.failed_logins, 0);
    assert_eq!(reloaded.locked_until, None);

    assert!(matches!(
        backend.record_failed_login(999_999, now, policy).await,
        Err(StorageError::Resource(ResourceError::NotFound { .. }))
    ));
}

// ============================================================================
// Refresh tokens
// ============================================================================

#[tokio::test]
async fn test_refresh_token_rotation() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;
    let user = backend
        .create_user(&tenant, NewUser::new("agent@demo.travelco", "$argon2id$hash"))
        .await
        .unwrap();
    let now = Utc::now();
    let week = now + Duration::days(7);

    let first = backend.create_refresh_token(user.id, week).await.unwrap();
    assert!(first.is_live(now));

    let second = backend
        .rotate_refresh_token(first.id, now, week)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(second.id, first.id);
    assert_eq!(second.user_id, user.id);

    let old = backend.find_refresh_token(first.id).await.unwrap().unwrap();
    assert!(old.revoked);
    assert_eq!(old.replaced_by, Some(second.id));

    // A rotated token cannot be rotated again
    assert!(
        backend
            .rotate_refresh_token(first.id, now, week)
            .await
            .unwrap()
            .is_none()
    );
    // Nor can an expired one
    let stale = backend
        .create_refresh_token(user.id, now - Duration::minutes(1))
        .await
        .unwrap();
    assert!(
        backend
            .rotate_refresh_token(stale.id, now, week)
            .await
            .unwrap()
            .is_none()
    );
    assert!(backend.find_refresh_token(424_242).await.unwrap().is_none());
}

#[tokio::test]
async fn test_refresh_token_revocation() {
    let backend = create_backend();
    let tenant = create_tenant(&backend, "demo.travelco").await;
    let user = backend
        .create_user(&tenant, NewUser::new("agent@demo.travelco", "$argon2id$hash"))
        .await
        .unwrap();
    let week = Utc::now() + Duration::days(7);

    let a = backend.create_refresh_token(user.id, week).await.unwrap();
    let b = backend.create_refresh_token(user.id, week).await.unwrap();
    let c = backend.create_refresh_token(user.id, week).await.unwrap();

    assert!(backend.revoke_refresh_token(a.id).await.unwrap());
    assert!(!backend.revoke_refresh_token(a.id).await.unwrap());
    assert_eq!(backend.revoke_user_refresh_tokens(user.id).await.unwrap(), 2);
    for id in [b.id, c.id] {
        assert!(backend.find_refresh_token(id).await.unwrap().unwrap().revoked);
    }

    // Tokens go with their user
    let d = backend.create_refresh_token(user.id, week).await.unwrap();
    backend.delete_user(&tenant, user.id).await.unwrap();
    assert!(backend.find_refresh_token(d.id).await.unwrap().is_none());
}

// ============================================================================
// File databases
// ============================================================================

#[tokio::test]
async fn test_file_database_survives_reopen() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("crm.db");

    let record_id = {
        let backend = SqliteBackend::open(&path).unwrap();
        backend.init_schema().unwrap();
        let tenant = create_tenant(&backend, "demo.travelco").await;
        backend
            .create(&tenant, ResourceKind::Package, package_json())
            .await
            .unwrap()
            .id()
    };

    let backend = SqliteBackend::open(&path).unwrap();
    backend.init_schema().unwrap();
    let tenant = backend
        .find_tenant_by_domain("demo.travelco")
        .await
        .unwrap()
        .expect("tenant persisted");
    let package = backend
        .read(&TenantContext::new(tenant.id), ResourceKind::Package, record_id)
        .await
        .unwrap()
        .expect("package persisted");
    assert_eq!(package.content()["destination"], "Lisbon");
}

#[tokio::test]
async fn test_health_check_requires_schema() {
    let backend = SqliteBackend::in_memory().unwrap();
    assert!(backend.health_check().await.is_err());

    backend.init_schema().unwrap();
    backend.health_check().await.unwrap();
}
