//! Reconciliation run metrics

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Counters for one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationMetrics {
    pub successful_updates: usize,
    pub failed_updates: usize,
    pub successful_removals: usize,
    pub failed_removals: usize,

    /// Entries in the input, skipped ones included
    pub total_users: usize,

    /// Wall time of the run, rounded to hundredths of a second
    pub execution_time_seconds: f64,
}

impl ReconciliationMetrics {
    pub fn new(total_users: usize) -> Self {
        Self {
            total_users,
            ..Default::default()
        }
    }

    /// Whether any update or removal failed
    pub fn has_failures(&self) -> bool {
        self.failed_updates > 0 || self.failed_removals > 0
    }

    /// Log the end-of-run summary
    pub fn log_summary(&self, remove_missing: bool) {
        info!("Role assignment completed");
        info!("{} roles updated successfully", self.successful_updates);
        if self.failed_updates > 0 {
            warn!("{} role updates failed", self.failed_updates);
        }

        if remove_missing {
            info!("{} obsolete roles removed", self.successful_removals);
            if self.failed_removals > 0 {
                warn!("{} role removals failed", self.failed_removals);
            }
        }

        info!("Total execution time: {} seconds", self.execution_time_seconds);
    }
}
