//! Per-site state machine.
//!
//! Every state change of [`super::OrchestrationCoordinator`] goes through
//! [`transition`], so the ordering rules can be checked without any I/O.

use crate::models::SiteState;

/// What happened in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteEvent {
    /// The site was picked up by a worker.
    Start,
    /// The fetch ended without a rendered page (timeout, network error).
    FetchFailed,
    /// The page rendered, possibly as an unresolved challenge.
    PageRendered,
    /// Certificate analysis and bot-protection classification both finished.
    ChecksComplete,
    /// The continue/skip decision was taken.
    Decided { continue_analysis: bool },
    /// The current downstream phase finished, successfully or not.
    PhaseFinished,
    /// The batch was cancelled.
    Cancelled,
    /// An unrecoverable internal error.
    Fatal,
}

/// Next state for `event` in `state`, given `phase_count` downstream phases.
///
/// Returns `None` when the event is not valid in that state. Terminal states
/// accept nothing.
pub fn transition(state: SiteState, event: SiteEvent, phase_count: usize) -> Option<SiteState> {
    use SiteEvent::*;
    use SiteState::*;

    if state.is_terminal() {
        return None;
    }

    match (state, event) {
        (_, Cancelled) | (_, Fatal) => Some(Aborted),
        (Pending, Start) => Some(Fetching),
        (Fetching, FetchFailed) => Some(Done),
        (Fetching, PageRendered) => Some(SslAndBotCheck),
        (SslAndBotCheck, ChecksComplete) => Some(Deciding),
        (Deciding, Decided { continue_analysis }) => {
            if continue_analysis && phase_count > 0 {
                Some(Analyzing(0))
            } else {
                Some(Done)
            }
        }
        (Analyzing(n), PhaseFinished) => {
            if n + 1 < phase_count {
                Some(Analyzing(n + 1))
            } else {
                Some(Done)
            }
        }
        _ => None,
    }
}
