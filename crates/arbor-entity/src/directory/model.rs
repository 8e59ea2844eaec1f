//! Directory entity model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use arbor_core::types::DirectoryId;

/// Free-form key/value annotations attached to a directory.
///
/// Never null: an absent value is persisted as the empty map.
pub type DirectoryMetadata = BTreeMap<String, String>;

/// A directory in the forest.
///
/// A directory without a parent is a *root*. Soft-deletion is represented
/// by a non-null `deleted_at` and is monotonic: once set it is never
/// cleared, and deleting a directory sets it on all live descendants at
/// the same instant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Directory {
    /// Unique directory identifier.
    pub id: DirectoryId,
    /// Directory name.
    pub name: String,
    /// Opaque key/value metadata.
    #[sqlx(json)]
    pub metadata: DirectoryMetadata,
    /// Parent directory ID (null for roots).
    pub parent_id: Option<DirectoryId>,
    /// When the directory was created.
    pub created_at: DateTime<Utc>,
    /// When the directory was last updated.
    pub updated_at: DateTime<Utc>,
    /// When the directory was soft-deleted (null while live).
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Directory {
    /// Check if this is a root directory (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Check if this directory has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Data required to create a new directory.
///
/// The id and timestamps are assigned by the database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDirectory {
    /// Directory name.
    pub name: String,
    /// Parent directory (None for roots).
    pub parent_id: Option<DirectoryId>,
    /// Opaque key/value metadata.
    pub metadata: DirectoryMetadata,
}
