//! In-memory mirror for single-process controllers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use arbor_core::result::AppResult;
use arbor_core::types::DirectoryId;
use arbor_entity::directory::Directory;

use crate::traits::AppStorage;

/// The mirror's record of one tracked directory: just enough to decide
/// whether an observed state is news.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedDirectory {
    /// The directory id.
    pub id: DirectoryId,
    /// Last seen update time.
    pub updated_at: DateTime<Utc>,
    /// Last seen deletion time, if any.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// [`AppStorage`] backed by a concurrent in-process map.
#[derive(Debug, Default)]
pub struct MemoryAppStorage {
    directories: DashMap<DirectoryId, TrackedDirectory>,
}

impl MemoryAppStorage {
    /// Create an empty mirror.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of directories currently tracked.
    pub fn len(&self) -> usize {
        self.directories.len()
    }

    /// Whether the mirror tracks nothing.
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }
}

#[async_trait]
impl AppStorage for MemoryAppStorage {
    async fn is_directory_tracked(&self, id: DirectoryId) -> AppResult<bool> {
        Ok(self.directories.contains_key(&id))
    }

    async fn is_directory_info_updated(&self, directory: &Directory) -> AppResult<bool> {
        Ok(self
            .directories
            .get(&directory.id)
            .map(|tracked| {
                tracked.updated_at >= directory.updated_at
                    && tracked.deleted_at == directory.deleted_at
            })
            .unwrap_or(false))
    }

    async fn create_directory(&self, directory: &Directory) -> AppResult<()> {
        self.directories.insert(
            directory.id,
            TrackedDirectory {
                id: directory.id,
                updated_at: directory.updated_at,
                deleted_at: directory.deleted_at,
            },
        );
        Ok(())
    }

    async fn delete_directory(&self, id: DirectoryId) -> AppResult<u64> {
        Ok(self.directories.remove(&id).map(|_| 1).unwrap_or(0))
    }
}
