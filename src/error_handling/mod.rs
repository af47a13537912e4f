//! Error handling and processing statistics.
//!
//! This module provides:
//! - The failure taxonomy recorded on every site record
//! - Error enums crossing the renderer and analysis boundaries
//! - Processing statistics (failures and informational events)
//! - Retriability of fetch failures

mod stats;
mod types;

// Re-export public API
pub use stats::ProcessingStats;
pub use types::{FailureKind, FetchError, InfoKind, InitializationError, PhaseError};

/// Whether a failed fetch attempt is worth repeating.
///
/// Only transient transport failures are retried. Redirect loops, challenges
/// and engine errors would fail the same way again.
pub fn is_retriable_failure(kind: FailureKind) -> bool {
    matches!(
        kind,
        FailureKind::NetworkFailure | FailureKind::TimeoutFailure
    )
}
