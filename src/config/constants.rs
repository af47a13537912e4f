//! Configuration constants.
//!
//! Defaults for timeouts, caps and marker lists used throughout the pipeline.
//! Every value here can be overridden through [`crate::Config`] unless noted.

use std::time::Duration;

/// Default number of sites processed simultaneously.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Progress is logged every this many finished sites.
pub const LOGGING_INTERVAL: usize = 5;

// Network operation timeouts
/// Hard navigation timeout for one fetch attempt, in seconds.
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;
/// TCP connection timeout used by the certificate analyzer, in seconds.
pub const TCP_CONNECT_TIMEOUT_SECS: u64 = 10;
/// TLS handshake timeout used by the certificate analyzer, in seconds.
pub const DEFAULT_TLS_HANDSHAKE_TIMEOUT_SECS: u64 = 10;

// Redirect handling
/// Maximum number of redirect hops followed before the fetch fails.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Final response statuses from this code up mean the site did not load.
pub const HTTP_ERROR_STATUS: u16 = 400;

// Capture limits
/// Maximum HTML kept on a fetch outcome (2MB). Longer documents are truncated
/// on a char boundary.
pub const MAX_HTML_BYTES: usize = 2 * 1024 * 1024;
/// Default viewport width in pixels.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1920;
/// Default viewport height in pixels.
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 1080;
/// Company names longer than this are treated as noise (titles that are sentences).
pub const MAX_COMPANY_NAME_CHARS: usize = 100;

// Retry strategy
/// Maximum fetch attempts for transient failures (initial attempt included).
pub const DEFAULT_FETCH_RETRIES: usize = 3;
/// Fixed delay between fetch attempts in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 2000;

// Downstream rate limiting
/// Delay inserted between consecutive downstream analysis calls, in milliseconds.
pub const DEFAULT_ANALYSIS_DELAY_MS: u64 = 1500;
/// Budget for one downstream call (decision or analysis phase), in seconds.
pub const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 120;

// Human-behavior simulation
/// Lower bound of the random pause after navigation, in milliseconds.
pub const HUMAN_DELAY_MIN_MS: u64 = 300;
/// Upper bound of the random pause after navigation, in milliseconds.
pub const HUMAN_DELAY_MAX_MS: u64 = 1200;

// Challenge remediation
/// Wait after interacting with a verify/continue control before re-checking the page.
pub const CHALLENGE_SETTLE_WAIT: Duration = Duration::from_secs(5);

/// Case-insensitive text markers of a bot-challenge interstitial.
pub const DEFAULT_CHALLENGE_MARKERS: &[&str] = &[
    "checking your browser",
    "verifying you are human",
    "verify you are human",
    "just a moment",
    "please wait while we verify",
    "enable javascript and cookies to continue",
    "ddos protection by",
    "attention required",
    "are you a robot",
    "i'm not a robot",
];

/// CSS selectors of controls commonly used to pass a challenge, tried in order.
pub const CHALLENGE_CONTROL_SELECTORS: &[&str] = &[
    "input[type='checkbox']",
    "#challenge-stage button",
    "button[type='submit']",
    "input[type='submit']",
    "a[href*='continue']",
];

// Bot protection classification
/// Confidence above which a bot-protection record is flagged as detected.
pub const BOT_DETECTION_THRESHOLD: f64 = 0.3;
/// Confidence above which protection with no captured content skips analysis.
pub const BOT_BLOCKING_CONFIDENCE: f64 = 0.7;

// Certificate status labels
/// Days before expiry at which a certificate is reported as critical.
pub const CERT_CRITICAL_DAYS: i64 = 7;
/// Days before expiry at which a certificate is reported as expiring soon.
pub const CERT_WARNING_DAYS: i64 = 30;

/// Title suffixes removed before a title is used as a company name.
pub const TITLE_SUFFIXES: &[&str] = &[
    " - Home",
    " | Home",
    " - Official Site",
    " | Official Site",
    " - Homepage",
    " | Homepage",
];

/// Fallback User-Agent when randomized fingerprints are disabled.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

// Error message size limits
/// Maximum error detail length stored on a record.
pub const MAX_ERROR_MESSAGE_LENGTH: usize = 2000;

/// Maximum URL length accepted from the input list.
pub const MAX_URL_LENGTH: usize = 2048;
