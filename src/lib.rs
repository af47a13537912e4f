//! site_capture library: concurrent, fault-tolerant site acquisition
//!
//! This library renders a list of URLs under a concurrency cap, captures
//! HTML and screenshots, checks each host's TLS certificate and bot
//! protection, and sequences optional downstream analysis phases through a
//! per-site state machine. Every input URL yields exactly one record.
//!
//! # Example
//!
//! ```no_run
//! use site_capture::{run_batch, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     file: Some(std::path::PathBuf::from("urls.txt")),
//!     max_concurrency: 3,
//!     ..Default::default()
//! };
//!
//! let report = run_batch(config).await?;
//! println!(
//!     "Processed {} URLs: {} succeeded, {} failed",
//!     report.total_urls, report.successful, report.failed
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or call library functions from within an async context.

pub mod app;
pub mod challenge;
pub mod config;
pub mod dedup;
pub mod error_handling;
pub mod export;
pub mod fetch;
pub mod fingerprint;
pub mod initialization;
pub mod models;
pub mod orchestrator;
pub mod run;
pub mod tls;
mod utils;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel, RendererKind, StealthOptions};
pub use error_handling::{FailureKind, FetchError, PhaseError, ProcessingStats};
pub use models::{FetchOutcome, FetchStatus, FetchTask, SiteAnalysisRecord, SiteState};
pub use orchestrator::{AnalysisPhase, ContinueDecider, OrchestrationCoordinator};
pub use run::{process_batch, run_batch, run_batch_with, BatchReport};
