//! Principal roles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of roles a principal can hold.
///
/// A role decides which write tier a principal gets inside its own tenant.
/// It never grants access to another tenant's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Full control, including users and tenant settings.
    Admin,
    /// May create, modify and delete records.
    Manager,
    /// May create records and read everything.
    #[default]
    Agent,
    /// Read-only.
    Viewer,
}

impl Role {
    /// Every role, highest privilege first.
    pub const ALL: [Role; 4] = [Role::Admin, Role::Manager, Role::Agent, Role::Viewer];

    /// Returns the wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::Agent => "AGENT",
            Role::Viewer => "VIEWER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "MANAGER" => Ok(Role::Manager),
            "AGENT" => Ok(Role::Agent),
            "VIEWER" => Ok(Role::Viewer),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}
