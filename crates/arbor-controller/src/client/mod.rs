//! Read-only client implementations.

pub mod driver;

pub use driver::DriverClient;
