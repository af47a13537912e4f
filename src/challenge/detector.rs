//! Bot-challenge interstitial detection.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{CHALLENGE_CONTROL_SELECTORS, CHALLENGE_SETTLE_WAIT, DEFAULT_CHALLENGE_MARKERS};

/// What the fetcher should try once when a challenge is detected: interact
/// with the first control matching one of `selectors`, then wait `settle`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationAction {
    pub selectors: Vec<String>,
    pub settle: Duration,
}

impl Default for RemediationAction {
    fn default() -> Self {
        Self {
            selectors: CHALLENGE_CONTROL_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            settle: CHALLENGE_SETTLE_WAIT,
        }
    }
}

/// Result of inspecting one page's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeVerdict {
    pub likely_challenge: bool,
    /// The first configured marker found in the text.
    pub matched_marker: Option<String>,
}

impl ChallengeVerdict {
    pub fn clear() -> Self {
        Self {
            likely_challenge: false,
            matched_marker: None,
        }
    }
}

/// Stateless classifier over rendered page text.
///
/// Markers are matched as case-insensitive substrings, in configuration order.
#[derive(Debug, Clone)]
pub struct ChallengeDetector {
    markers: Vec<String>,
    remediation: RemediationAction,
}

impl Default for ChallengeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CHALLENGE_MARKERS.iter().map(|m| m.to_string()))
    }
}

impl ChallengeDetector {
    /// Builds a detector from a marker list. Blank markers are ignored.
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let markers = markers
            .into_iter()
            .map(|m| m.as_ref().trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        Self {
            markers,
            remediation: RemediationAction::default(),
        }
    }

    pub fn with_remediation(mut self, remediation: RemediationAction) -> Self {
        self.remediation = remediation;
        self
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    pub fn detect(&self, text: &str) -> ChallengeVerdict {
        let lowered = text.to_lowercase();
        match self.markers.iter().find(|m| lowered.contains(m.as_str())) {
            Some(marker) => ChallengeVerdict {
                likely_challenge: true,
                matched_marker: Some(marker.clone()),
            },
            None => ChallengeVerdict::clear(),
        }
    }

    /// The remediation to attempt for a detected challenge.
    ///
    /// Returns `None` when the verdict is clear. A single action is proposed
    /// per page regardless of how many markers matched.
    pub fn propose_remediation(&self, verdict: &ChallengeVerdict) -> Option<RemediationAction> {
        verdict.likely_challenge.then(|| self.remediation.clone())
    }
}
