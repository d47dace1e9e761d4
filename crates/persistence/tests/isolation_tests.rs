//! Tests for tenant data isolation.
//!
//! Every operation must respect tenant boundaries, and the request scope
//! must fail closed when no tenant is resolved.

use serde_json::json;

use wayfarer_persistence::TenantScope;
use wayfarer_persistence::backends::sqlite::SqliteBackend;
use wayfarer_persistence::core::{RecordStorage, TenantDirectory, UserDirectory};
use wayfarer_persistence::error::{StorageError, TenantError, ValidationError};
use wayfarer_persistence::identity::NewUser;
use wayfarer_persistence::tenant::{NewTenant, TenantContext};
use wayfarer_persistence::types::{ListQuery, ResourceKind};

// ============================================================================
// Helper Functions
// ============================================================================

fn create_backend() -> SqliteBackend {
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    backend.init_schema().expect("Failed to initialize schema");
    backend
}

async fn two_tenants(backend: &SqliteBackend) -> (TenantContext, TenantContext) {
    let a = backend
        .create_tenant(NewTenant::new("Agency A", "a.travelco"))
        .await
        .unwrap();
    let b = backend
        .create_tenant(NewTenant::new("Agency B", "b.travelco"))
        .await
        .unwrap();
    (TenantContext::new(a.id), TenantContext::new(b.id))
}

async fn lead_total(backend: &SqliteBackend, tenant: &TenantContext) -> u64 {
    backend
        .list(tenant, ResourceKind::Lead, ListQuery::default())
        .await
        .unwrap()
        .total
}

fn is_access_denied(err: &StorageError) -> bool {
    matches!(err, StorageError::Tenant(TenantError::AccessDenied { .. }))
}

// ============================================================================
// CRUD Isolation Tests
// ============================================================================

#[tokio::test]
async fn test_read_isolation() {
    let backend = create_backend();
    let (a, b) = two_tenants(&backend).await;

    let lead = backend
        .create(&a, ResourceKind::Lead, json!({"first_name": "Ada"}))
        .await
        .unwrap();

    assert!(backend.read(&a, ResourceKind::Lead, lead.id()).await.unwrap().is_some());

    let err = backend
        .read(&b, ResourceKind::Lead, lead.id())
        .await
        .unwrap_err();
    assert!(is_access_denied(&err));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_list_isolation() {
    let backend = create_backend();
    let (a, b) = two_tenants(&backend).await;

    for name in ["Ada", "Grace"] {
        backend
            .create(&a, ResourceKind::Lead, json!({"first_name": name}))
            .await
            .unwrap();
    }
    backend
        .create(&b, ResourceKind::Lead, json!({"first_name": "Linus"}))
        .await
        .unwrap();

    let page_a = backend
        .list(&a, ResourceKind::Lead, ListQuery::default())
        .await
        .unwrap();
    assert_eq!(page_a.total, 2);
    assert!(page_a.items.iter().all(|r| r.tenant_id() == a.tenant_id()));

    let page_b = backend
        .list(&b, ResourceKind::Lead, ListQuery::default())
        .await
        .unwrap();
    assert_eq!(page_b.total, 1);
}

#[tokio::test]
async fn test_write_isolation() {
    let backend = create_backend();
    let (a, b) = two_tenants(&backend).await;

    let lead = backend
        .create(&a, ResourceKind::Lead, json!({"first_name": "Ada"}))
        .await
        .unwrap();

    let update = backend
        .update(&b, ResourceKind::Lead, lead.id(), json!({"first_name": "Mallory"}))
        .await
        .unwrap_err();
    assert!(is_access_denied(&update));

    let patch = backend
        .patch(&b, ResourceKind::Lead, lead.id(), json!({"score": 1}))
        .await
        .unwrap_err();
    assert!(is_access_denied(&patch));

    let delete = backend
        .delete(&b, ResourceKind::Lead, lead.id())
        .await
        .unwrap_err();
    assert!(is_access_denied(&delete));

    let untouched = backend
        .read(&a, ResourceKind::Lead, lead.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.content()["first_name"], "Ada");
}

#[tokio::test]
async fn test_cross_tenant_reference_rejected() {
    let backend = create_backend();
    let (a, b) = two_tenants(&backend).await;

    let customer_a = backend
        .create(&a, ResourceKind::Customer, json!({}))
        .await
        .unwrap();

    let deal = backend
        .create(
            &b,
            ResourceKind::Deal,
            json!({
                "customer": customer_a.id(),
                "title": "Stolen",
                "value": "100",
                "stage": "proposal"
            }),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        deal,
        StorageError::Validation(ValidationError::InvalidReference { .. })
    ));
}

#[tokio::test]
async fn test_cross_tenant_assignment_rejected() {
    let backend = create_backend();
    let (a, b) = two_tenants(&backend).await;

    let agent_a = backend
        .create_user(&a, NewUser::new("agent@a.travelco", "$argon2id$hash"))
        .await
        .unwrap();

    let lead = backend
        .create(
            &b,
            ResourceKind::Lead,
            json!({"first_name": "Ada", "assigned_to": agent_a.id}),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        lead,
        StorageError::Validation(ValidationError::InvalidReference { .. })
    ));
}

#[tokio::test]
async fn test_user_isolation() {
    let backend = create_backend();
    let (a, b) = two_tenants(&backend).await;

    let agent = backend
        .create_user(&a, NewUser::new("agent@a.travelco", "$argon2id$hash"))
        .await
        .unwrap();

    assert!(is_access_denied(
        &backend.read_user(&b, agent.id).await.unwrap_err()
    ));
    assert!(is_access_denied(
        &backend.delete_user(&b, agent.id).await.unwrap_err()
    ));

    let page_b = backend.list_users(&b, ListQuery::default()).await.unwrap();
    assert_eq!(page_b.total, 0);
}

#[tokio::test]
async fn test_tenant_delete_leaves_other_tenants() {
    let backend = create_backend();
    let (a, b) = two_tenants(&backend).await;

    backend
        .create(&a, ResourceKind::Lead, json!({"first_name": "Ada"}))
        .await
        .unwrap();
    backend
        .create(&b, ResourceKind::Lead, json!({"first_name": "Linus"}))
        .await
        .unwrap();

    backend.delete_tenant(a.tenant_id()).await.unwrap();

    assert_eq!(lead_total(&backend, &b).await, 1);
    assert_eq!(lead_total(&backend, &a).await, 0);
}

// ============================================================================
// Fail-closed Scope Tests
// ============================================================================

#[tokio::test]
async fn test_unresolved_scope_lists_nothing() {
    let backend = create_backend();
    let (a, _) = two_tenants(&backend).await;
    backend
        .create(&a, ResourceKind::Lead, json!({"first_name": "Ada"}))
        .await
        .unwrap();

    let scope = TenantScope::new(&backend, None);
    let page = scope
        .list(ResourceKind::Lead, ListQuery::default())
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 0);

    let users = scope.list_users(ListQuery::default()).await.unwrap();
    assert!(users.items.is_empty());
}

#[tokio::test]
async fn test_unresolved_scope_refuses_object_operations() {
    let backend = create_backend();
    let (a, _) = two_tenants(&backend).await;
    let lead = backend
        .create(&a, ResourceKind::Lead, json!({"first_name": "Ada"}))
        .await
        .unwrap();

    let scope = TenantScope::new(&backend, None);
    let unresolved = |e: StorageError| matches!(e, StorageError::Tenant(TenantError::Unresolved));

    assert!(unresolved(
        scope.read(ResourceKind::Lead, lead.id()).await.unwrap_err()
    ));
    assert!(unresolved(
        scope
            .create(ResourceKind::Lead, json!({"first_name": "Eve"}))
            .await
            .unwrap_err()
    ));
    assert!(unresolved(
        scope.delete(ResourceKind::Lead, lead.id()).await.unwrap_err()
    ));
    assert!(unresolved(
        scope
            .create_user(NewUser::new("eve@example.com", "$argon2id$hash"))
            .await
            .unwrap_err()
    ));

    assert_eq!(lead_total(&backend, &a).await, 1);
}

#[tokio::test]
async fn test_resolved_scope_is_bound_to_tenant() {
    let backend = create_backend();
    let (a, b) = two_tenants(&backend).await;

    let scope_a = TenantScope::new(&backend, Some(&a));
    let lead = scope_a
        .create(ResourceKind::Lead, json!({"first_name": "Ada"}))
        .await
        .unwrap();
    assert_eq!(lead.tenant_id(), a.tenant_id());

    let scope_b = TenantScope::new(&backend, Some(&b));
    assert!(scope_b.read(ResourceKind::Lead, lead.id()).await.unwrap_err().is_not_found());
}
