//! Read-only client backed directly by the storage driver.
//!
//! For deployments where the controller is co-located with the database
//! there is no need to round-trip through the directory service; the
//! driver itself is the authoritative source.

use std::sync::Arc;

use async_trait::async_trait;

use arbor_core::result::AppResult;
use arbor_core::types::{DirectoryId, QueryOptions};
use arbor_database::driver::DirectoryDriver;
use arbor_entity::directory::{DirectoryFetch, DirectoryList};

use crate::traits::ReadOnlyClient;

/// [`ReadOnlyClient`] over a [`DirectoryDriver`].
#[derive(Debug, Clone)]
pub struct DriverClient {
    driver: Arc<DirectoryDriver>,
}

impl DriverClient {
    /// Create a client over the given driver.
    pub fn new(driver: Arc<DirectoryDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl ReadOnlyClient for DriverClient {
    async fn get_directory(&self, id: DirectoryId) -> AppResult<DirectoryFetch> {
        // Deleted copies are returned so the scan path observes deletions.
        let directory = self
            .driver
            .get_directory(id, QueryOptions::new().include_deleted())
            .await?;
        Ok(DirectoryFetch::new(directory))
    }

    async fn get_children(&self, id: DirectoryId) -> AppResult<DirectoryList> {
        let directories = self.driver.list_children(id, QueryOptions::new()).await?;
        Ok(DirectoryList::new(directories))
    }
}
