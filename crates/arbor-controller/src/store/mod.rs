//! Local mirror implementations.

pub mod memory;

pub use memory::{MemoryAppStorage, TrackedDirectory};
