//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, caps, marker lists)
//! - The [`Config`] struct shared by the library and the CLI parser

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{Config, LogFormat, LogLevel, RendererKind, StealthOptions};
