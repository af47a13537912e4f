//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `site_capture` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use site_capture::initialization::{init_crypto_provider, init_logger_with};
use site_capture::{run_batch, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env from the current directory, then next to the executable
    // (RUST_LOG, CHROME_PATH).
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let config = Config::parse();

    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    init_crypto_provider();

    match run_batch(config).await {
        Ok(report) => {
            println!(
                "✅ Processed {} URL{} ({} succeeded, {} failed{}) in {:.1}s",
                report.total_urls,
                if report.total_urls == 1 { "" } else { "s" },
                report.successful,
                report.failed,
                if report.cancelled {
                    format!(", {} aborted", report.aborted)
                } else {
                    String::new()
                },
                report.elapsed_seconds
            );
            println!("Records saved in {}", report.records_path.display());
            println!("Summary saved in {}", report.summary_path.display());
            Ok(())
        }
        Err(e) => {
            eprintln!("site_capture error: {:#}", e);
            process::exit(1);
        }
    }
}
