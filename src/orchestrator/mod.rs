//! Per-site orchestration.
//!
//! This module provides:
//! - The site state machine ([`transition`]) and its events
//! - Boundary traits for downstream analysis and the continue/skip decision
//! - The rule-based fallback decision
//! - [`OrchestrationCoordinator`], which runs one site to a terminal state

mod boundary;
mod coordinator;
mod fallback;
mod state;

pub use boundary::{AnalysisPhase, ContinueDecider};
pub use coordinator::OrchestrationCoordinator;
pub use fallback::{FallbackDecider, SKIP_BOT_BLOCKED, SKIP_INACCESSIBLE};
pub use state::{transition, SiteEvent};
