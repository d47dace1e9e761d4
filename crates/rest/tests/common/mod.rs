//! Common test utilities for API testing.
//!
//! - [`harness`] - test server, callers and seeding helpers
//! - [`fixtures`] - a two-tenant world with one user per role

#![allow(dead_code)]

pub mod fixtures;
pub mod harness;
