//! Principal (user) records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::role::Role;
use crate::error::ValidationError;
use crate::tenant::TenantId;

/// A user account. Belongs to exactly one tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    #[serde(rename = "tenant")]
    pub tenant_id: TenantId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip)]
    pub password_hash: String,
    /// Consecutive failed logins since the last successful one.
    #[serde(skip)]
    pub failed_logins: u32,
    /// Password logins are refused until this instant.
    #[serde(skip)]
    pub locked_until: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Returns `true` while a lockout is in force at `at`.
    pub fn is_locked(&self, at: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > at)
    }
}

/// When repeated failed logins lock an account, and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Failures that trigger a lock. Every further failure renews it.
    pub max_failures: u32,
    /// Length of the lock.
    pub lock_for: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failures: 5,
            lock_for: Duration::minutes(15),
        }
    }
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub is_active: bool,
    pub password_hash: String,
}

impl NewUser {
    /// Creates an active user input with the default role.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            role: Role::default(),
            is_active: true,
            password_hash: password_hash.into(),
        }
    }

    /// Sets the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Sets first and last name.
    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    /// Validates the input and canonicalizes the email.
    pub fn validated(mut self) -> Result<Self, ValidationError> {
        self.email = normalize_email(&self.email)?;
        if self.password_hash.is_empty() {
            return Err(ValidationError::MissingRequiredField {
                field: "password".to_string(),
            });
        }
        Ok(self)
    }
}

/// Partial update of a user. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub password_hash: Option<String>,
}

impl UserUpdate {
    /// Applies this update to `user`.
    pub fn apply(self, user: &mut UserRecord) -> Result<(), ValidationError> {
        if let Some(email) = self.email {
            user.email = normalize_email(&email)?;
        }
        if let Some(first) = self.first_name {
            user.first_name = first;
        }
        if let Some(last) = self.last_name {
            user.last_name = last;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(active) = self.is_active {
            user.is_active = active;
        }
        if let Some(hash) = self.password_hash {
            user.password_hash = hash;
        }
        Ok(())
    }
}

/// Lowercases and sanity-checks an email address.
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_ascii_lowercase();
    if email.is_empty() {
        return Err(ValidationError::MissingRequiredField {
            field: "email".to_string(),
        });
    }
    match email.split_once('@') {
        Some((local, host)) if !local.is_empty() && host.contains('.') && !host.contains('@') => {
            Ok(email)
        }
        _ => Err(ValidationError::invalid("email", "not a valid address")),
    }
}
