//! Test data fixtures.

use serde_json::{Value, json};
use wayfarer_persistence::core::RecordStorage;
use wayfarer_persistence::tenant::TenantContext;
use wayfarer_persistence::{ResourceKind, Role, StoredRecord, Tenant, UserRecord};

use super::harness::TestApp;

pub const DEMO: &str = "demo.travelco";
pub const OTHER: &str = "other.travelco";

/// Two tenants; `demo` has one user per role, `other` has an admin.
pub struct World {
    pub app: TestApp,
    pub demo: Tenant,
    pub other: Tenant,
    pub admin: UserRecord,
    pub manager: UserRecord,
    pub agent: UserRecord,
    pub viewer: UserRecord,
    pub other_admin: UserRecord,
}

impl World {
    pub async fn new() -> Self {
        Self::with_app(TestApp::new()).await
    }

    pub async fn with_app(app: TestApp) -> Self {
        let demo = app.tenant("Demo Travel Co", DEMO).await;
        let other = app.tenant("Other Agency", OTHER).await;

        let admin = app.user(&demo, "admin@demo.travelco", Role::Admin).await;
        let manager = app.user(&demo, "manager@demo.travelco", Role::Manager).await;
        let agent = app.user(&demo, "agent@demo.travelco", Role::Agent).await;
        let viewer = app.user(&demo, "viewer@demo.travelco", Role::Viewer).await;
        let other_admin = app.user(&other, "admin@other.travelco", Role::Admin).await;

        Self {
            app,
            demo,
            other,
            admin,
            manager,
            agent,
            viewer,
            other_admin,
        }
    }

    /// Seeds a record directly in storage.
    pub async fn seed(&self, tenant: &Tenant, kind: ResourceKind, body: Value) -> StoredRecord {
        self.app
            .backend
            .create(&TenantContext::new(tenant.id), kind, body)
            .await
            .expect("Failed to seed record")
    }

    /// Seeds a customer with a deal; returns `(customer, deal)`.
    pub async fn seed_deal(&self, tenant: &Tenant) -> (StoredRecord, StoredRecord) {
        let customer = self
            .seed(tenant, ResourceKind::Customer, json!({"customer_type": "leisure"}))
            .await;
        let deal = self
            .seed(tenant, ResourceKind::Deal, deal_json(customer.id()))
            .await;
        (customer, deal)
    }
}

pub fn lead_json(first_name: &str) -> Value {
    json!({
        "first_name": first_name,
        "last_name": "Lovelace",
        "email": format!("{}@example.com", first_name.to_lowercase()),
        "source": "website"
    })
}

pub fn deal_json(customer: i64) -> Value {
    json!({
        "customer": customer,
        "title": "Lisbon city break",
        "value": "1800",
        "stage": "proposal"
    })
}
