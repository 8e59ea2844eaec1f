//! Options accepted by directory read queries.

use serde::{Deserialize, Serialize};

/// Read-query options shared by every directory lookup and traversal.
///
/// By default soft-deleted rows are filtered out of every row a query
/// considers, including the query target itself. `with_deleted` disables
/// that filter globally for the call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Include soft-deleted directories in the result.
    pub with_deleted: bool,
}

impl QueryOptions {
    /// Options with the default soft-delete filtering.
    pub fn new() -> Self {
        Self::default()
    }

    /// Include soft-deleted directories in every row the query considers.
    pub fn include_deleted(mut self) -> Self {
        self.with_deleted = true;
        self
    }
}
