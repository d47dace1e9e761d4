//! Integration tests for host-based tenant resolution and data isolation.

mod common;

use axum::http::{HeaderValue, StatusCode, header::AUTHORIZATION, header::HOST};
use serde_json::{Value, json};
use wayfarer_persistence::{DomainMatch, ResourceKind};
use wayfarer_rest::ServerConfig;

use common::fixtures::{DEMO, OTHER, World, lead_json};
use common::harness::TestApp;

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

fn item_ids(page: &Value) -> Vec<i64> {
    page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect()
}

/// An app that only trusts the Host header.
async fn host_only_world(mode: DomainMatch) -> World {
    let config = ServerConfig {
        allow_domain_header: false,
        domain_match: mode,
        ..ServerConfig::for_testing()
    };
    World::with_app(TestApp::with_config(config)).await
}

// =============================================================================
// Isolation between resolved tenants
// =============================================================================

#[tokio::test]
async fn test_list_never_returns_other_tenant_records() {
    let world = World::new().await;
    let mine = world
        .seed(&world.demo, ResourceKind::Lead, lead_json("Ada"))
        .await;
    let theirs = world
        .seed(&world.other, ResourceKind::Lead, lead_json("Linus"))
        .await;

    let page: Value = world
        .app
        .caller(DEMO, Some(&world.viewer))
        .get("/api/leads")
        .await
        .json();
    assert_eq!(item_ids(&page), vec![mine.id()]);
    assert_eq!(page["total"], 1);

    let page: Value = world
        .app
        .caller(OTHER, Some(&world.other_admin))
        .get("/api/leads")
        .await
        .json();
    assert_eq!(item_ids(&page), vec![theirs.id()]);
}

#[tokio::test]
async fn test_direct_access_to_other_tenant_record_is_not_found() {
    let world = World::new().await;
    let theirs = world
        .seed(&world.other, ResourceKind::Lead, lead_json("Linus"))
        .await;
    let path = format!("/api/leads/{}", theirs.id());
    let admin = world.app.caller(DEMO, Some(&world.admin));

    let read = admin.get(&path).await;
    read.assert_status_not_found();

    // Indistinguishable from a row that does not exist at all
    let missing = admin.get("/api/leads/999999").await;
    missing.assert_status_not_found();
    let a: Value = read.json();
    let b: Value = missing.json();
    assert_eq!(a["error"], b["error"]);

    admin
        .put(&path, &lead_json("Mallory"))
        .await
        .assert_status_not_found();
    admin.delete(&path).await.assert_status_not_found();

    // Untouched
    let still: Value = world
        .app
        .caller(OTHER, Some(&world.other_admin))
        .get(&path)
        .await
        .json();
    assert_eq!(still["first_name"], "Linus");
}

#[tokio::test]
async fn test_cross_tenant_reference_rejected() {
    let world = World::new().await;
    let (their_customer, _) = world.seed_deal(&world.other).await;

    let response = world
        .app
        .caller(DEMO, Some(&world.agent))
        .post(
            "/api/deals",
            &json!({
                "customer": their_customer.id(),
                "title": "Borrowed customer",
                "value": "10",
                "stage": "proposal"
            }),
        )
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_body_cannot_choose_tenant() {
    let world = World::new().await;
    let mut body = lead_json("Ada");
    body["tenant"] = json!(world.other.id.value());
    body["id"] = json!(424242);

    let response = world
        .app
        .caller(DEMO, Some(&world.agent))
        .post("/api/leads", &body)
        .await;
    response.assert_status(StatusCode::CREATED);
    let lead: Value = response.json();
    assert_eq!(lead["tenant"], world.demo.id.value());
    assert_ne!(lead["id"], 424242);
}

// =============================================================================
// Unresolved tenant
// =============================================================================

#[tokio::test]
async fn test_unresolved_tenant_lists_nothing() {
    let world = World::new().await;
    world
        .seed(&world.demo, ResourceKind::Lead, lead_json("Ada"))
        .await;

    let caller = world.app.unresolved_caller(&world.admin);
    let response = caller.get("/api/leads").await;
    response.assert_status_ok();
    let page: Value = response.json();
    assert_eq!(page["total"], 0);
    assert!(page["items"].as_array().unwrap().is_empty());

    let users: Value = caller.get("/api/users").await.json();
    assert_eq!(users["total"], 0);
}

#[tokio::test]
async fn test_unresolved_tenant_refuses_object_operations() {
    let world = World::new().await;
    let lead = world
        .seed(&world.demo, ResourceKind::Lead, lead_json("Ada"))
        .await;
    let caller = world.app.unresolved_caller(&world.admin);
    let path = format!("/api/leads/{}", lead.id());

    for response in [
        caller.get(&path).await,
        caller.post("/api/leads", &lead_json("Eve")).await,
        caller.patch(&path, &json!({"score": 1})).await,
        caller.delete(&path).await,
        caller.get("/api/tenant").await,
    ] {
        response.assert_status(StatusCode::FORBIDDEN);
        let body: Value = response.json();
        assert_eq!(body["error"], "tenant_unresolved");
    }
}

#[tokio::test]
async fn test_unknown_domain_header_is_unresolved() {
    let world = World::new().await;
    world
        .seed(&world.demo, ResourceKind::Lead, lead_json("Ada"))
        .await;

    let page: Value = world
        .app
        .caller("nowhere.example", Some(&world.admin))
        .get("/api/leads")
        .await
        .json();
    assert_eq!(page["total"], 0);
}

// =============================================================================
// Host header resolution
// =============================================================================

#[tokio::test]
async fn test_host_with_port_resolves() {
    let world = host_only_world(DomainMatch::Suffix).await;
    let lead = world
        .seed(&world.demo, ResourceKind::Lead, lead_json("Ada"))
        .await;
    let token = world.app.token(&world.viewer);

    let response = world
        .app
        .server
        .get("/api/leads")
        .add_header(HOST, HeaderValue::from_static("Demo.TravelCo:8000"))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;

    response.assert_status_ok();
    let page: Value = response.json();
    assert_eq!(item_ids(&page), vec![lead.id()]);
}

#[tokio::test]
async fn test_subdomain_resolves_in_suffix_mode() {
    let world = host_only_world(DomainMatch::Suffix).await;
    let token = world.app.token(&world.viewer);

    let response = world
        .app
        .server
        .get("/api/tenant")
        .add_header(HOST, HeaderValue::from_static("eu.demo.travelco"))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;

    response.assert_status_ok();
    let tenant: Value = response.json();
    assert_eq!(tenant["domain"], DEMO);
}

#[tokio::test]
async fn test_subdomain_unresolved_in_exact_mode() {
    let world = host_only_world(DomainMatch::Exact).await;
    let token = world.app.token(&world.viewer);

    let response = world
        .app
        .server
        .get("/api/tenant")
        .add_header(HOST, HeaderValue::from_static("eu.demo.travelco"))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_lookalike_hosts_do_not_resolve() {
    let world = host_only_world(DomainMatch::Suffix).await;
    world
        .seed(&world.demo, ResourceKind::Lead, lead_json("Ada"))
        .await;
    let token = world.app.token(&world.admin);

    for host in ["evildemo.travelco", "demo.travelco.evil.com"] {
        let response = world
            .app
            .server
            .get("/api/leads")
            .add_header(HOST, HeaderValue::from_static(host))
            .add_header(AUTHORIZATION, bearer(&token))
            .await;
        response.assert_status_ok();
        let page: Value = response.json();
        assert_eq!(page["total"], 0, "{host} must not resolve to {DEMO}");
    }
}

#[tokio::test]
async fn test_domain_header_ignored_unless_enabled() {
    let world = host_only_world(DomainMatch::Suffix).await;
    world
        .seed(&world.demo, ResourceKind::Lead, lead_json("Ada"))
        .await;

    // The harness caller sends X-Tenant-Domain, which this app ignores.
    let page: Value = world
        .app
        .caller(DEMO, Some(&world.admin))
        .get("/api/leads")
        .await
        .json();
    assert_eq!(page["total"], 0);
}
