//! Axum extractors.
//!
//! - [`Pagination`] - limit/offset window for list endpoints
//!
//! The per-request tenant and principal are extracted by
//! [`RequestContext`](crate::context::RequestContext).

mod pagination;

pub use pagination::Pagination;
