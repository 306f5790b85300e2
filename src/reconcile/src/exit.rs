//! Process exit codes for `manage-roles`

use crate::error::{InputError, ReconcileFailure};
use crate::metrics::ReconciliationMetrics;

pub const SUCCESS: i32 = 0;

/// The run completed but some updates or removals failed
pub const PARTIAL_FAILURE: i32 = 1;

pub const FILE_NOT_FOUND: i32 = 2;
pub const INVALID_JSON: i32 = 3;

/// Authentication, listing, store settings or options
pub const RECONCILE_FAILED: i32 = 4;

pub const UNEXPECTED: i32 = 10;

pub fn for_metrics(metrics: &ReconciliationMetrics) -> i32 {
    if metrics.has_failures() {
        PARTIAL_FAILURE
    } else {
        SUCCESS
    }
}

pub fn for_input_error(err: &InputError) -> i32 {
    match err {
        InputError::NotFound(_) => FILE_NOT_FOUND,
        InputError::InvalidJson { .. } => INVALID_JSON,
        InputError::Io { .. } => UNEXPECTED,
    }
}

pub fn for_failure(_failure: &ReconcileFailure) -> i32 {
    RECONCILE_FAILED
}
