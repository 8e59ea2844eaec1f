//! Unified application error types for Arbor.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;

use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested directory was not found, or was soft-deleted and the
    /// caller did not ask for deleted rows.
    DirectoryNotFound,
    /// A mutation was attempted on a read-only storage driver.
    ReadOnly,
    /// A root directory was supplied with a parent.
    RootWithParentDirectory,
    /// A non-root directory was supplied without a parent.
    DirectoryWithoutParent,
    /// A controller was built without a reconciler.
    NoReconciler,
    /// A database error occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// The event watcher failed or its stream ended unexpectedly.
    Watch,
    /// The operation was cancelled by its caller.
    Cancelled,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectoryNotFound => write!(f, "DIRECTORY_NOT_FOUND"),
            Self::ReadOnly => write!(f, "READ_ONLY"),
            Self::RootWithParentDirectory => write!(f, "ROOT_WITH_PARENT_DIRECTORY"),
            Self::DirectoryWithoutParent => write!(f, "DIRECTORY_WITHOUT_PARENT"),
            Self::NoReconciler => write!(f, "NO_RECONCILER"),
            Self::Database => write!(f, "DATABASE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Watch => write!(f, "WATCH"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout Arbor.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. This provides a single error type for
/// the entire application boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a directory-not-found error.
    pub fn directory_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DirectoryNotFound, message)
    }

    /// Create a read-only error.
    pub fn read_only(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReadOnly, message)
    }

    /// Create a root-with-parent error.
    pub fn root_with_parent_directory(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RootWithParentDirectory, message)
    }

    /// Create a directory-without-parent error.
    pub fn directory_without_parent(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DirectoryWithoutParent, message)
    }

    /// Create a no-reconciler error.
    pub fn no_reconciler(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoReconciler, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a watch error.
    pub fn watch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Watch, message)
    }

    /// Create a cancellation error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether this error represents caller-requested cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
