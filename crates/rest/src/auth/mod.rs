//! Authentication.
//!
//! Callers authenticate with a bearer token obtained from
//! `POST /api/auth/login`. The token only names the user; role, tenant and
//! active flag are re-read from storage on every request, so revoking a user
//! or changing a role takes effect immediately.
//!
//! Login also hands out a refresh token. `POST /api/auth/refresh` trades it
//! for a new pair and revokes it; presenting a revoked one again revokes
//! every refresh token of the user. Repeated failed logins lock the account
//! for a while.

mod jwt;
mod password;
mod principal;

use thiserror::Error;

pub use jwt::{Claims, IssuedToken, RefreshClaims, TokenService};
pub use password::{MIN_PASSWORD_LENGTH, hash_password, verify_password, verify_password_or_dummy};
pub use principal::{AuthState, Principal, bearer_token};

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid, expired or revoked refresh token")]
    InvalidRefreshToken,

    #[error("Account is locked after repeated failed logins")]
    AccountLocked,

    #[error("User account is disabled")]
    UserDisabled,

    #[error("Password rejected: {0}")]
    WeakPassword(String),

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}
