//! # arbor-core
//!
//! Core crate for Arbor. Contains configuration schemas, typed
//! identifiers, query options, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Arbor crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
