//! Controller-local directory mirror seam.

use async_trait::async_trait;

use arbor_core::result::AppResult;
use arbor_core::types::DirectoryId;
use arbor_entity::directory::Directory;

/// The controller's local mirror of the directories it cares about.
///
/// A directory's lifetime in the mirror is a strict subset of its
/// lifetime in the authoritative store. Implementations must be safe
/// under the serial call pattern of a single controller loop; no
/// multi-writer contract is required.
#[async_trait]
pub trait AppStorage: Send + Sync + 'static {
    /// Whether the mirror holds this directory at all.
    async fn is_directory_tracked(&self, id: DirectoryId) -> AppResult<bool>;

    /// Whether the mirrored copy of `directory` is at least as fresh as
    /// the given state, by `updated_at` and `deleted_at`. Untracked
    /// directories are never up to date.
    ///
    /// Returning `false` is the unique trigger for reconciliation.
    async fn is_directory_info_updated(&self, directory: &Directory) -> AppResult<bool>;

    /// Insert or replace the mirrored copy.
    async fn create_directory(&self, directory: &Directory) -> AppResult<()>;

    /// Remove a directory from the mirror, returning the number of
    /// entries removed.
    async fn delete_directory(&self, id: DirectoryId) -> AppResult<u64>;
}
