//! Error type definitions.
//!
//! [`FailureKind`] is the taxonomy stamped on records and counted in
//! statistics; the `thiserror` enums are the errors crossing API seams.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// Error launching or configuring the browser.
    #[error("Browser initialization error: {0}")]
    BrowserError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

/// Error returned by a [`crate::fetch::Renderer`].
///
/// The fetcher folds every variant into a [`crate::models::FetchStatus`]; it is
/// never propagated past the fetch boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Navigation exceeded its time budget.
    #[error("navigation timed out after {0}s")]
    Timeout(u64),

    /// DNS resolution, connection or TLS handshake failure.
    #[error("network error: {0}")]
    Network(String),

    /// The redirect chain exceeded the configured cap.
    #[error("redirect chain exceeded {max} hops (last location: {last})")]
    RedirectLimit { max: usize, last: String },

    /// The target URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The batch was cancelled while the fetch was running.
    #[error("fetch cancelled")]
    Cancelled,

    /// Anything else the engine reported.
    #[error("{0}")]
    Other(String),
}

/// Error returned by a downstream analysis phase or decision call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PhaseError {
    /// The provider answered with an error.
    #[error("provider error: {0}")]
    Provider(String),

    /// The call exceeded its time budget.
    #[error("phase timed out")]
    Timeout,

    /// The phase had nothing to work with (e.g. no HTML captured).
    #[error("missing input: {0}")]
    MissingInput(String),
}

/// Failure taxonomy for one site's processing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// DNS/connection/TLS handshake errors during fetch.
    NetworkFailure,
    /// Navigation or downstream call exceeded its budget.
    TimeoutFailure,
    /// Bot defense not bypassed after one remediation attempt.
    ChallengeUnresolved,
    /// Certificate chain/expiry/validation failure. Not fatal to the record.
    CertificateInvalid,
    /// An external analysis call errored.
    DownstreamPhaseFailure,
    /// Redirect chain longer than the configured cap.
    RedirectLimitExceeded,
    /// Batch cancelled before the site reached a terminal state.
    Cancelled,
    /// Unexpected internal failure (panic in a task, I/O while exporting).
    Internal,
}

/// Notable events that are not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum InfoKind {
    /// Final URL differs from the original one.
    Redirected,
    /// A challenge marker was found on the first render.
    ChallengeDetected,
    /// A challenge was passed by the remediation pass.
    ChallengeRemediated,
    /// Screenshot hash already seen earlier in the run.
    DuplicateScreenshot,
    /// Downstream analysis skipped by the continue/skip decision.
    AnalysisSkipped,
    /// A fetch attempt was retried.
    FetchRetried,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NetworkFailure => "Network failure",
            FailureKind::TimeoutFailure => "Timeout",
            FailureKind::ChallengeUnresolved => "Challenge unresolved",
            FailureKind::CertificateInvalid => "Certificate invalid",
            FailureKind::DownstreamPhaseFailure => "Downstream phase failure",
            FailureKind::RedirectLimitExceeded => "Redirect limit exceeded",
            FailureKind::Cancelled => "Cancelled",
            FailureKind::Internal => "Internal error",
        }
    }
}

impl InfoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoKind::Redirected => "Redirected",
            InfoKind::ChallengeDetected => "Challenge detected",
            InfoKind::ChallengeRemediated => "Challenge remediated",
            InfoKind::DuplicateScreenshot => "Duplicate screenshot",
            InfoKind::AnalysisSkipped => "Analysis skipped",
            InfoKind::FetchRetried => "Fetch retried",
        }
    }
}

impl FetchError {
    /// Failure kind recorded for this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Timeout(_) => FailureKind::TimeoutFailure,
            FetchError::Network(_) | FetchError::InvalidUrl(_) => FailureKind::NetworkFailure,
            FetchError::RedirectLimit { .. } => FailureKind::RedirectLimitExceeded,
            FetchError::Cancelled => FailureKind::Cancelled,
            FetchError::Other(_) => FailureKind::Internal,
        }
    }
}
