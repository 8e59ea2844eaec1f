//! Watcher implementations.

pub mod memory;

pub use memory::{MemoryEventBus, MemoryWatcher};
