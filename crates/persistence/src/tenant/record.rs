//! Tenant records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::domain::normalize_domain;
use super::id::TenantId;
use crate::error::ValidationError;

/// Default subscription tier for new tenants.
pub const DEFAULT_SUBSCRIPTION_TIER: &str = "basic";

/// A travel agency using the CRM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    /// Storage-assigned identifier.
    pub id: TenantId,
    /// Display name.
    pub name: String,
    /// Canonical lowercase domain the agency is served on.
    pub domain: String,
    /// Subscription tier label.
    pub subscription_tier: String,
    /// Opaque per-tenant settings.
    pub settings: Map<String, Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a tenant.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTenant {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub subscription_tier: Option<String>,
    #[serde(default)]
    pub settings: Map<String, Value>,
}

impl NewTenant {
    /// Creates tenant input with default tier and empty settings.
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            subscription_tier: None,
            settings: Map::new(),
        }
    }

    /// Sets the subscription tier.
    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.subscription_tier = Some(tier.into());
        self
    }

    /// Sets the settings map.
    pub fn with_settings(mut self, settings: Map<String, Value>) -> Self {
        self.settings = settings;
        self
    }

    /// Validates the input, returning it with a canonical domain and tier.
    pub fn validated(self) -> Result<Self, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::MissingRequiredField {
                field: "name".to_string(),
            });
        }
        let tier = self
            .subscription_tier
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_SUBSCRIPTION_TIER.to_string());
        Ok(Self {
            name,
            domain: normalize_domain(&self.domain)?,
            subscription_tier: Some(tier),
            settings: self.settings,
        })
    }
}

/// Partial update of a tenant's profile.
///
/// The domain is not part of the update: changing it re-homes every request,
/// so it is only done through administrative tooling.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub subscription_tier: Option<String>,
    #[serde(default)]
    pub settings: Option<Map<String, Value>>,
}

impl TenantUpdate {
    /// Applies this update to `tenant`.
    pub fn apply(self, tenant: &mut Tenant) -> Result<(), ValidationError> {
        if let Some(name) = self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ValidationError::invalid("name", "may not be blank"));
            }
            tenant.name = name.to_string();
        }
        if let Some(tier) = self.subscription_tier {
            let tier = tier.trim();
            if tier.is_empty() {
                return Err(ValidationError::invalid("subscription_tier", "may not be blank"));
            }
            tenant.subscription_tier = tier.to_string();
        }
        if let Some(settings) = self.settings {
            tenant.settings = settings;
        }
        Ok(())
    }
}
