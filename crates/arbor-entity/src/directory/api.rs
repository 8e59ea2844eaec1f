//! Read-API envelope types.
//!
//! These mirror the wire shapes of the authoritative read API so that a
//! client facade can be backed either by the HTTP service or directly by
//! the storage driver.

use serde::{Deserialize, Serialize};

use arbor_core::types::DirectoryId;

use super::event::API_VERSION;
use super::model::Directory;

/// A single fetched directory plus response metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryFetch {
    /// API schema version.
    pub version: String,
    /// The fetched directory.
    pub directory: Directory,
}

impl DirectoryFetch {
    /// Wrap a directory in a versioned fetch envelope.
    pub fn new(directory: Directory) -> Self {
        Self {
            version: API_VERSION.to_string(),
            directory,
        }
    }
}

/// A list of directory ids plus response metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryList {
    /// API schema version.
    pub version: String,
    /// The directory ids.
    pub directories: Vec<DirectoryId>,
}

impl DirectoryList {
    /// Wrap a list of ids in a versioned envelope.
    pub fn new(directories: Vec<DirectoryId>) -> Self {
        Self {
            version: API_VERSION.to_string(),
            directories,
        }
    }
}
