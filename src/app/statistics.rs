//! End-of-run statistics.

use log::info;
use strum::IntoEnumIterator;

use crate::error_handling::{FailureKind, InfoKind, ProcessingStats};
use crate::export::BatchSummary;

/// Prints failure and informational counters to the log.
pub fn print_processing_statistics(stats: &ProcessingStats) {
    let total_failures = stats.total_failures();
    let total_info = stats.total_info();

    if total_failures > 0 {
        info!("Failure Counts ({} total):", total_failures);
        for kind in FailureKind::iter() {
            let count = stats.get_failure_count(kind);
            if count > 0 {
                info!("   {}: {}", kind.as_str(), count);
            }
        }
    }

    if total_info > 0 {
        info!("Info Counts ({} total):", total_info);
        for kind in InfoKind::iter() {
            let count = stats.get_info_count(kind);
            if count > 0 {
                info!("   {}: {}", kind.as_str(), count);
            }
        }
    }
}

/// Prints the per-outcome breakdown and a one-line summary.
pub fn print_batch_summary(summary: &BatchSummary, elapsed_seconds: f64) {
    for (outcome, count) in &summary.by_outcome {
        info!("   {outcome}: {count}");
    }
    info!(
        "✅ Processed {} URL{} ({} succeeded, {} failed) in {:.1}s",
        summary.total,
        if summary.total == 1 { "" } else { "s" },
        summary.successful(),
        summary.failed(),
        elapsed_seconds
    );
}
