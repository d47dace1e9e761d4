//! Offset pagination.

use serde::Serialize;

/// Limit/offset window for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: usize,
    pub offset: usize,
}

impl ListQuery {
    /// Creates a query for `limit` items starting at `offset`.
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Limit and offset as SQL integers.
    ///
    /// Values past `i64::MAX` saturate instead of wrapping, so an absurd
    /// offset reads past the end rather than from the start.
    pub fn sql_bounds(&self) -> (i64, i64) {
        (
            i64::try_from(self.limit).unwrap_or(i64::MAX),
            i64::try_from(self.offset).unwrap_or(i64::MAX),
        )
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
        }
    }
}

/// One page of results plus the total size of the collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

impl<T> Page<T> {
    /// An empty page for `query`.
    pub fn empty(query: ListQuery) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            limit: query.limit,
            offset: query.offset,
        }
    }

    /// Converts each item.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}
