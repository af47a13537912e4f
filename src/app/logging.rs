//! Progress logging.

use log::info;
use std::time::Instant;

/// Logs completed sites against the batch size and the current rate.
pub fn log_progress(start_time: Instant, completed: usize, total: usize) {
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    let rate = if elapsed_secs > 0.0 {
        completed as f64 / elapsed_secs
    } else {
        0.0
    };
    info!(
        "Processed {}/{} sites in {:.2} seconds (~{:.2} sites/sec)",
        completed, total, elapsed_secs, rate
    );
}
