//! Principals, roles and login sessions.

mod role;
mod session;
mod user;

pub use role::Role;
pub use session::RefreshToken;
pub use user::{LockoutPolicy, NewUser, UserRecord, UserUpdate, normalize_email};
