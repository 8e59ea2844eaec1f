//! Directory mutation events.
//!
//! Events are published by the notifier after every mutation and consumed
//! by reconcile controllers. Delivery is at-least-once with no ordering
//! guarantee across directories; the periodic full-subtree reconcile
//! compensates for missed or reordered events.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::Directory;

/// The event schema version tag carried by every event.
pub const API_VERSION: &str = "v1";

/// The kind of mutation an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// A directory was created.
    Create,
    /// A directory's name or metadata changed.
    Update,
    /// A directory was soft-deleted.
    Delete,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A notification of a directory mutation.
///
/// Carries the full directory state at the event instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryEvent {
    /// Event schema version.
    pub version: String,
    /// When the event occurred (UTC).
    pub time: DateTime<Utc>,
    /// The kind of mutation.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// The directory state at the event instant.
    pub directory: Directory,
}

impl DirectoryEvent {
    /// Create an event stamped now with the current API version.
    pub fn new(event_type: EventType, directory: Directory) -> Self {
        Self {
            version: API_VERSION.to_string(),
            time: Utc::now(),
            event_type,
            directory,
        }
    }
}
