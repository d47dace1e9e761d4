//! Access control.
//!
//! Two independent gates decide every request:
//!
//! 1. The method gate: is the caller authenticated, and does its role allow
//!    this class of method on this class of resource? See [`PERMISSIONS`].
//! 2. The object gate: when a concrete object is involved, does it belong to
//!    the tenant the request resolved to?
//!
//! Both must pass. A failed object gate is reported as "not found" so that
//! the existence of other tenants' data is never revealed.

mod evaluator;

pub use evaluator::{
    AccessError, MethodClass, PERMISSIONS, ResourceClass, authorize_method,
    authorize_object, role_allows,
};
