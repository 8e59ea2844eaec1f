//! Read-only client to the authoritative directory store.

use async_trait::async_trait;

use arbor_core::result::AppResult;
use arbor_core::types::DirectoryId;
use arbor_entity::directory::{DirectoryFetch, DirectoryList};

/// Fetches current directory state from the authoritative store.
///
/// Implementations may be backed by the directory service's API or
/// directly by the storage driver. `get_children` returns one level of
/// children only; deeper descendants are discovered through events and
/// caught by subsequent full scans as they become tracked.
#[async_trait]
pub trait ReadOnlyClient: Send + Sync + 'static {
    /// Fetch the current state of a directory.
    ///
    /// Soft-deleted directories are returned rather than hidden, so the
    /// periodic scan can observe deletions.
    async fn get_directory(&self, id: DirectoryId) -> AppResult<DirectoryFetch>;

    /// Fetch the direct children of a directory.
    async fn get_children(&self, id: DirectoryId) -> AppResult<DirectoryList>;
}
