//! # arbor-controller
//!
//! The reconcile controller for a directory subtree. A controller
//! observes a subtree rooted at a base directory by combining an event
//! stream (push) with a randomized periodic full scan (pull), and drives
//! a user-supplied [`Reconciler`](traits::Reconciler) to convergence on a
//! local mirror.
//!
//! The collaborator seams ([`ReadOnlyClient`](traits::ReadOnlyClient),
//! [`Watcher`](traits::Watcher), [`AppStorage`](traits::AppStorage),
//! [`Reconciler`](traits::Reconciler)) are deliberately narrow; this
//! crate ships in-memory implementations for single-process deployments
//! and a client backed directly by the storage driver.

pub mod client;
pub mod controller;
pub mod store;
pub mod traits;
pub mod watch;

pub use client::DriverClient;
pub use controller::{Controller, ControllerBuilder};
pub use store::{MemoryAppStorage, TrackedDirectory};
pub use traits::{AppStorage, ReadOnlyClient, Reconciler, Watcher};
pub use watch::{MemoryEventBus, MemoryWatcher};
