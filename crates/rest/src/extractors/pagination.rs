//! Pagination extractor.
//!
//! Extracts `limit` and `offset` query parameters for list endpoints.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;
use wayfarer_persistence::{CrmStorage, ListQuery};

use crate::error::RestError;
use crate::state::AppState;

/// Axum extractor for pagination parameters.
///
/// Missing values fall back to the configured default page size and offset
/// zero; the limit is capped at the configured maximum.
///
/// # Example
///
/// ```rust,ignore
/// use wayfarer_rest::extractors::Pagination;
///
/// async fn list_handler(pagination: Pagination) {
///     let query = pagination.query();
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Page size (number of items to return).
    limit: usize,
    /// Offset (number of items to skip).
    offset: usize,
}

/// Query parameters for pagination.
#[derive(Debug, Deserialize)]
struct PaginationQuery {
    limit: Option<usize>,
    offset: Option<usize>,
}

impl Pagination {
    /// Creates a new Pagination, capping the limit at `max_limit`.
    pub fn new(limit: usize, offset: usize, max_limit: usize) -> Self {
        Self {
            limit: limit.min(max_limit),
            offset,
        }
    }

    /// Returns the page size.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns the offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the storage query for this window.
    pub fn query(&self) -> ListQuery {
        ListQuery::new(self.limit, self.offset)
    }
}

impl<S> FromRequestParts<AppState<S>> for Pagination
where
    S: CrmStorage + 'static,
{
    type Rejection = RestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<PaginationQuery>::from_request_parts(parts, state)
            .await
            .map_err(|e| RestError::bad_request(e.body_text()))?;

        Pagination::from_query(query, state.default_page_size(), state.max_page_size())
    }
}

impl Pagination {
    fn from_query(
        query: PaginationQuery,
        default_limit: usize,
        max_limit: usize,
    ) -> Result<Self, RestError> {
        let limit = query.limit.unwrap_or(default_limit);
        if limit == 0 {
            return Err(RestError::bad_request("limit must be at least 1"));
        }
        let offset = query.offset.unwrap_or(0);
        if i64::try_from(offset).is_err() {
            return Err(RestError::bad_request(format!(
                "offset must be at most {}",
                i64::MAX
            )));
        }
        Ok(Pagination::new(limit, offset, max_limit))
    }
}
