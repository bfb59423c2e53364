//! Exit codes for fleetgradectl

use fleetgrade_common::BatchOutcome;

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors
pub const EXIT_GENERAL_ERROR: i32 = 1;

/// Batch finished but some reports could not be processed
pub const EXIT_PARTIAL_BATCH: i32 = 2;

/// Interrupted with Ctrl-C (128 + SIGINT)
pub const EXIT_CANCELLED: i32 = 130;

pub fn exit_code_for(outcome: &BatchOutcome) -> i32 {
    if outcome.cancelled {
        EXIT_CANCELLED
    } else if !outcome.failures.is_empty() {
        EXIT_PARTIAL_BATCH
    } else {
        EXIT_SUCCESS
    }
}
