//! Configuration types and CLI options.
//!
//! [`Config`] is usable programmatically (it implements `Default`) and is also
//! the clap parser for the binary, so the library never touches argv itself.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::constants::*;

/// Logging level for the application.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: human-readable format with colors (default)
/// - `Json`: one JSON object per line for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Which rendering engine drives the fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RendererKind {
    /// Plain HTTP client with manual redirect tracking (no screenshots)
    Http,
    /// Headless Chromium (requires the `chromium` feature)
    Chromium,
}

/// Stealth feature toggles, each independently switchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StealthOptions {
    /// Draw a random fingerprint from the pool for every fetch attempt.
    pub random_fingerprint: bool,
    /// Pause and scroll like a person after navigation.
    pub human_behavior: bool,
    /// Attempt one remediation pass when a challenge is detected.
    pub challenge_remediation: bool,
}

impl Default for StealthOptions {
    fn default() -> Self {
        Self {
            random_fingerprint: true,
            human_behavior: true,
            challenge_remediation: true,
        }
    }
}

/// Batch configuration.
///
/// # Examples
///
/// ```no_run
/// use site_capture::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     file: Some(PathBuf::from("urls.txt")),
///     max_concurrency: 3,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "site_capture",
    version,
    about = "Render a list of sites, capture snapshots and validate TLS before downstream analysis."
)]
pub struct Config {
    /// File to read URLs from (one per line, `-` for stdin)
    #[arg(short, long, value_parser)]
    pub file: Option<PathBuf>,

    /// Additional URLs given directly on the command line
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// Job identifier stamped on every record (defaults to `job_<timestamp_millis>`)
    #[arg(long)]
    pub job_id: Option<String>,

    /// Directory receiving records, HTML and screenshots
    #[arg(short, long, default_value = "./results")]
    pub output_dir: PathBuf,

    /// Maximum number of sites processed at once
    #[arg(short = 'j', long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,

    /// Hard navigation timeout per fetch attempt, in seconds
    #[arg(long, default_value_t = DEFAULT_NAVIGATION_TIMEOUT_SECS)]
    pub navigation_timeout_secs: u64,

    /// TLS handshake timeout for certificate analysis, in seconds
    #[arg(long, default_value_t = DEFAULT_TLS_HANDSHAKE_TIMEOUT_SECS)]
    pub tls_timeout_secs: u64,

    /// Maximum redirect hops before a fetch fails
    #[arg(long, default_value_t = DEFAULT_MAX_REDIRECTS)]
    pub max_redirects: usize,

    /// Default viewport width (used when fingerprints are not randomized)
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_WIDTH)]
    pub viewport_width: u32,

    /// Default viewport height (used when fingerprints are not randomized)
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_HEIGHT)]
    pub viewport_height: u32,

    /// Skip full-page screenshots
    #[arg(long = "no-screenshot", action = clap::ArgAction::SetFalse, default_value_t = true)]
    pub capture_screenshot: bool,

    /// Maximum HTML bytes kept per page
    #[arg(long, default_value_t = MAX_HTML_BYTES)]
    pub max_html_bytes: usize,

    /// Maximum fetch attempts for transient network failures
    #[arg(long, default_value_t = DEFAULT_FETCH_RETRIES)]
    pub fetch_retries: usize,

    /// Fixed delay between fetch attempts, in milliseconds
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY_MS)]
    pub retry_delay_ms: u64,

    /// Delay between consecutive downstream analysis calls, in milliseconds
    #[arg(long, default_value_t = DEFAULT_ANALYSIS_DELAY_MS)]
    pub analysis_delay_ms: u64,

    /// Budget for each downstream call, in seconds
    #[arg(long, default_value_t = DEFAULT_ANALYSIS_TIMEOUT_SECS)]
    pub analysis_timeout_secs: u64,

    /// Use a fixed browser identity instead of a random one per fetch
    #[arg(long = "no-random-fingerprint", action = clap::ArgAction::SetFalse, default_value_t = true)]
    pub random_fingerprint: bool,

    /// Skip the human-like pause and scroll after navigation
    #[arg(long = "no-human-behavior", action = clap::ArgAction::SetFalse, default_value_t = true)]
    pub human_behavior: bool,

    /// Do not attempt to pass detected bot challenges
    #[arg(long = "no-challenge-remediation", action = clap::ArgAction::SetFalse, default_value_t = true)]
    pub challenge_remediation: bool,

    /// Extra challenge markers (case-insensitive), appended to the built-in list
    #[arg(long = "challenge-marker")]
    pub challenge_markers: Vec<String>,

    /// Rendering engine
    #[arg(long, value_enum, default_value_t = RendererKind::Http)]
    pub renderer: RendererKind,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file: None,
            urls: Vec::new(),
            job_id: None,
            output_dir: PathBuf::from("./results"),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            navigation_timeout_secs: DEFAULT_NAVIGATION_TIMEOUT_SECS,
            tls_timeout_secs: DEFAULT_TLS_HANDSHAKE_TIMEOUT_SECS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            capture_screenshot: true,
            max_html_bytes: MAX_HTML_BYTES,
            fetch_retries: DEFAULT_FETCH_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            analysis_delay_ms: DEFAULT_ANALYSIS_DELAY_MS,
            analysis_timeout_secs: DEFAULT_ANALYSIS_TIMEOUT_SECS,
            random_fingerprint: true,
            human_behavior: true,
            challenge_remediation: true,
            challenge_markers: Vec::new(),
            renderer: RendererKind::Http,
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
        }
    }
}

impl Config {
    /// Checks values that would make the batch meaningless or unbounded.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be at least 1".to_string());
        }
        if self.navigation_timeout_secs == 0 {
            return Err("navigation_timeout_secs must be greater than 0".to_string());
        }
        if self.tls_timeout_secs == 0 {
            return Err("tls_timeout_secs must be greater than 0".to_string());
        }
        if self.max_redirects == 0 {
            return Err("max_redirects must be at least 1".to_string());
        }
        if self.analysis_timeout_secs == 0 {
            return Err("analysis_timeout_secs must be greater than 0".to_string());
        }
        if self.fetch_retries == 0 {
            return Err("fetch_retries must be at least 1 (the initial attempt)".to_string());
        }
        if self.renderer == RendererKind::Chromium && !cfg!(feature = "chromium") {
            return Err("the chromium renderer requires building with --features chromium".to_string());
        }
        Ok(())
    }

    /// Stealth toggles as one value.
    pub fn stealth(&self) -> StealthOptions {
        StealthOptions {
            random_fingerprint: self.random_fingerprint,
            human_behavior: self.human_behavior,
            challenge_remediation: self.challenge_remediation,
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn tls_timeout(&self) -> Duration {
        Duration::from_secs(self.tls_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn analysis_delay(&self) -> Duration {
        Duration::from_millis(self.analysis_delay_ms)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    /// Built-in challenge markers followed by any configured extras.
    pub fn all_challenge_markers(&self) -> Vec<String> {
        DEFAULT_CHALLENGE_MARKERS
            .iter()
            .map(|m| m.to_string())
            .chain(self.challenge_markers.iter().map(|m| m.to_lowercase()))
            .collect()
    }

    /// Resolved job identifier.
    pub fn resolved_job_id(&self) -> String {
        self.job_id
            .clone()
            .unwrap_or_else(|| format!("job_{}", chrono::Utc::now().timestamp_millis()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stealth(), StealthOptions::default());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = Config {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_redirect_cap_rejected() {
        let config = Config {
            max_redirects: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_extra_markers_are_lowercased_and_appended() {
        let config = Config {
            challenge_markers: vec!["Hold On A Second".to_string()],
            ..Default::default()
        };
        let markers = config.all_challenge_markers();
        assert_eq!(markers.len(), DEFAULT_CHALLENGE_MARKERS.len() + 1);
        assert_eq!(markers.last().map(String::as_str), Some("hold on a second"));
    }

    #[test]
    fn test_cli_parses_stealth_toggles() {
        let config = Config::parse_from([
            "site_capture",
            "--no-random-fingerprint",
            "--no-challenge-remediation",
            "-j",
            "2",
            "example.com",
        ]);
        assert!(!config.random_fingerprint);
        assert!(config.human_behavior);
        assert!(!config.challenge_remediation);
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.urls, vec!["example.com".to_string()]);
    }

    #[test]
    fn test_explicit_job_id_is_kept() {
        let config = Config {
            job_id: Some("job-42".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolved_job_id(), "job-42");
    }
}
