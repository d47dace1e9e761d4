//! Record kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The tenant-scoped record collections of the CRM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Lead,
    Customer,
    Deal,
    Communication,
    Package,
    Booking,
    Integration,
    Campaign,
    Conversation,
}

impl ResourceKind {
    /// Every kind, in dependency order (referenced kinds first).
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Lead,
        ResourceKind::Customer,
        ResourceKind::Deal,
        ResourceKind::Communication,
        ResourceKind::Package,
        ResourceKind::Booking,
        ResourceKind::Integration,
        ResourceKind::Campaign,
        ResourceKind::Conversation,
    ];

    /// The storage discriminator, also used as the JSON name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Lead => "lead",
            ResourceKind::Customer => "customer",
            ResourceKind::Deal => "deal",
            ResourceKind::Communication => "communication",
            ResourceKind::Package => "package",
            ResourceKind::Booking => "booking",
            ResourceKind::Integration => "integration",
            ResourceKind::Campaign => "campaign",
            ResourceKind::Conversation => "conversation",
        }
    }

    /// The collection segment under `/api`.
    pub fn path(&self) -> &'static str {
        match self {
            ResourceKind::Lead => "leads",
            ResourceKind::Customer => "customers",
            ResourceKind::Deal => "deals",
            ResourceKind::Communication => "communications",
            ResourceKind::Package => "packages",
            ResourceKind::Booking => "bookings",
            ResourceKind::Integration => "integrations",
            ResourceKind::Campaign => "campaigns",
            ResourceKind::Conversation => "conversations",
        }
    }

    /// Looks a kind up by its collection segment.
    pub fn from_path(path: &str) -> Result<Self, ValidationError> {
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.path() == path)
            .ok_or_else(|| ValidationError::UnknownKind {
                name: path.to_string(),
            })
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownKind {
                name: s.to_string(),
            })
    }
}
