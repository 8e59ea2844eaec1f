//! Collaborator seams consumed by the controller.
//!
//! Each trait carries exactly the operations the controller needs;
//! implementations should not widen them.

pub mod client;
pub mod reconciler;
pub mod storage;
pub mod watcher;

pub use client::ReadOnlyClient;
pub use reconciler::Reconciler;
pub use storage::AppStorage;
pub use watcher::Watcher;
