//! Application-level helpers.
//!
//! This module provides URL validation, input loading, shutdown handling,
//! progress logging and statistics printing used by the batch driver.

pub mod input;
pub mod logging;
pub mod shutdown;
pub mod statistics;
pub mod url;

// Re-export public API
pub use input::{load_inputs, InputUrl};
pub use logging::log_progress;
pub use shutdown::{shutdown_gracefully, spawn_interrupt_listener};
pub use statistics::{print_batch_summary, print_processing_statistics};
pub use url::{validate_and_normalize_url, UrlRejection};
