//! Reconcile controller configuration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Controller tuning for the periodic full-subtree reconcile.
///
/// The tick period is freshly randomized on each fire as
/// `(min + rand[0, max)) * unit`, so the effective period stays within
/// `[min * unit, (min + max - 1) * unit]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// The directory subtree root this controller owns. When absent, the
    /// binary anchors to the first live root (creating one if needed).
    #[serde(default)]
    pub base_directory: Option<Uuid>,
    /// Minimum number of interval units between full reconciles.
    #[serde(default = "default_min_interval")]
    pub full_reconcile_min_interval: u32,
    /// Exclusive bound on the random units added on top of the minimum.
    #[serde(default = "default_max_interval")]
    pub full_reconcile_max_interval: u32,
    /// Length of one interval unit in seconds.
    #[serde(default = "default_interval_unit_seconds")]
    pub full_reconcile_interval_unit_seconds: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_directory: None,
            full_reconcile_min_interval: default_min_interval(),
            full_reconcile_max_interval: default_max_interval(),
            full_reconcile_interval_unit_seconds: default_interval_unit_seconds(),
        }
    }
}

fn default_min_interval() -> u32 {
    5
}

fn default_max_interval() -> u32 {
    10
}

fn default_interval_unit_seconds() -> u64 {
    60
}
