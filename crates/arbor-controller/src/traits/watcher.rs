//! Directory event stream seam.

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use arbor_core::error::AppError;
use arbor_core::result::AppResult;
use arbor_entity::directory::DirectoryEvent;

/// Produces a stream of directory events plus an asynchronous error
/// signal.
///
/// Delivery is at-least-once with no ordering guarantee across
/// directories. The error channel yields at most one fatal error and then
/// closes; both channels close when `cancel` flips to true.
#[async_trait]
pub trait Watcher: Send + Sync + 'static {
    /// Begin streaming events.
    async fn watch(
        &self,
        cancel: watch::Receiver<bool>,
    ) -> AppResult<(mpsc::Receiver<DirectoryEvent>, mpsc::Receiver<AppError>)>;
}
