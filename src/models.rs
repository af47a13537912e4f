//! Core data model: tasks, fetch outcomes, per-host TLS and bot-protection
//! records, and the per-site aggregate handed to the persistence boundary.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{StealthOptions, CERT_CRITICAL_DAYS, CERT_WARNING_DAYS};
use crate::error_handling::FailureKind;

/// Browser viewport size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Fetch settings shared by every task of a batch.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Viewport used when fingerprints are not randomized.
    pub viewport: Viewport,
    pub navigation_timeout: Duration,
    pub max_redirects: usize,
    pub capture_screenshot: bool,
    pub max_html_bytes: usize,
    pub stealth: StealthOptions,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::new(
                crate::config::DEFAULT_VIEWPORT_WIDTH,
                crate::config::DEFAULT_VIEWPORT_HEIGHT,
            ),
            navigation_timeout: Duration::from_secs(
                crate::config::DEFAULT_NAVIGATION_TIMEOUT_SECS,
            ),
            max_redirects: crate::config::DEFAULT_MAX_REDIRECTS,
            capture_screenshot: true,
            max_html_bytes: crate::config::MAX_HTML_BYTES,
            stealth: StealthOptions::default(),
        }
    }
}

impl From<&crate::Config> for FetchConfig {
    fn from(config: &crate::Config) -> Self {
        Self {
            viewport: Viewport::new(config.viewport_width, config.viewport_height),
            navigation_timeout: config.navigation_timeout(),
            max_redirects: config.max_redirects,
            capture_screenshot: config.capture_screenshot,
            max_html_bytes: config.max_html_bytes,
            stealth: config.stealth(),
        }
    }
}

/// One unit of work. Immutable once created.
#[derive(Debug, Clone)]
pub struct FetchTask {
    url: Arc<str>,
    job_id: Arc<str>,
    index: usize,
    config: Arc<FetchConfig>,
}

impl FetchTask {
    pub fn new(
        url: impl Into<Arc<str>>,
        job_id: impl Into<Arc<str>>,
        index: usize,
        config: Arc<FetchConfig>,
    ) -> Self {
        Self {
            url: url.into(),
            job_id: job_id.into(),
            index,
            config,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Position of the task in the submitted sequence.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

/// Terminal classification of one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Success,
    Timeout,
    NetworkError,
    ChallengeUnresolved,
}

impl FetchStatus {
    /// Whether the page rendered at all. A challenge page still rendered.
    pub fn rendered(&self) -> bool {
        matches!(self, FetchStatus::Success | FetchStatus::ChallengeUnresolved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStatus::Success => "success",
            FetchStatus::Timeout => "timeout",
            FetchStatus::NetworkError => "network_error",
            FetchStatus::ChallengeUnresolved => "challenge_unresolved",
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of attempting to render one [`FetchTask`]. Produced once by the
/// fetcher and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub original_url: String,
    pub final_url: String,
    pub redirected: bool,
    /// Every URL visited, starting with the original one.
    pub redirect_chain: Vec<String>,
    /// HTTP status of the final response, when the engine exposes it.
    pub http_status: Option<u16>,
    /// Rendered HTML, truncated to the configured size bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Raw PNG bytes. Persisted by reference, never serialized inline.
    #[serde(skip)]
    pub screenshot: Option<Vec<u8>>,
    pub screenshot_hash: Option<String>,
    /// First URL that produced the same screenshot earlier in the run.
    pub duplicate_of: Option<String>,
    pub company_name: Option<String>,
    pub load_time_ms: u64,
    pub viewport: Viewport,
    pub user_agent: String,
    pub status: FetchStatus,
    pub failure: Option<FailureKind>,
    pub error: Option<String>,
    /// Number of attempts made, retries included.
    pub attempts: u32,
    pub challenge_detected: bool,
    pub challenge_remediated: bool,
}

impl FetchOutcome {
    /// Outcome for a fetch that never produced a page.
    pub fn failed(
        original_url: &str,
        status: FetchStatus,
        failure: FailureKind,
        error: impl Into<String>,
        viewport: Viewport,
        user_agent: &str,
        load_time_ms: u64,
    ) -> Self {
        Self {
            original_url: original_url.to_string(),
            final_url: original_url.to_string(),
            redirected: false,
            redirect_chain: vec![original_url.to_string()],
            http_status: None,
            html: None,
            screenshot: None,
            screenshot_hash: None,
            duplicate_of: None,
            company_name: None,
            load_time_ms,
            viewport,
            user_agent: user_agent.to_string(),
            status,
            failure: Some(failure),
            error: Some(crate::utils::truncate_error(&error.into())),
            attempts: 1,
            challenge_detected: false,
            challenge_remediated: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }

    /// The final HTTP status when it is an error status.
    pub fn http_error(&self) -> Option<u16> {
        self.http_status
            .filter(|code| *code >= crate::config::HTTP_ERROR_STATUS)
    }
}

/// Per-host certificate analysis result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SslRecord {
    pub has_tls: bool,
    pub is_valid: bool,
    pub issuer: Option<String>,
    pub subject: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Signed: negative means already expired.
    pub days_until_expiry: Option<i64>,
    pub tls_version: Option<String>,
    pub certificate_error: Option<String>,
}

impl SslRecord {
    /// Record for a host where no TLS session could be established.
    pub fn no_tls(error: impl Into<String>) -> Self {
        Self {
            has_tls: false,
            is_valid: false,
            issuer: None,
            subject: None,
            expires_at: None,
            days_until_expiry: None,
            tls_version: None,
            certificate_error: Some(error.into()),
        }
    }

    /// Whether the (valid) certificate expires within `days_threshold` days.
    pub fn is_expiring_soon(&self, days_threshold: i64) -> bool {
        match (self.is_valid, self.days_until_expiry) {
            (true, Some(days)) => days <= days_threshold,
            _ => false,
        }
    }

    /// Human-readable certificate status.
    pub fn status_label(&self) -> String {
        if !self.has_tls {
            return "No SSL/HTTPS".to_string();
        }
        match self.days_until_expiry {
            Some(days) if days < 0 => format!("Expired {} days ago", days.abs()),
            _ if !self.is_valid => format!(
                "Invalid: {}",
                self.certificate_error.as_deref().unwrap_or("unknown error")
            ),
            Some(days) if days <= CERT_CRITICAL_DAYS => {
                format!("Expires in {days} days (CRITICAL)")
            }
            Some(days) if days <= CERT_WARNING_DAYS => {
                format!("Expires in {days} days (WARNING)")
            }
            Some(days) => format!("Valid, expires in {days} days"),
            None => "Valid certificate".to_string(),
        }
    }
}

/// Known bot-protection providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionType {
    Cloudflare,
    Recaptcha,
    DdosGuard,
    RateLimit,
    Unknown,
}

impl ProtectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtectionType::Cloudflare => "cloudflare",
            ProtectionType::Recaptcha => "recaptcha",
            ProtectionType::DdosGuard => "ddos_guard",
            ProtectionType::RateLimit => "rate_limit",
            ProtectionType::Unknown => "unknown",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            ProtectionType::Cloudflare => "Cloudflare",
            ProtectionType::Recaptcha => "Recaptcha",
            ProtectionType::DdosGuard => "Ddos_Guard",
            ProtectionType::RateLimit => "Rate_Limit",
            ProtectionType::Unknown => "Unknown",
        }
    }
}

/// Bot-protection detection result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotProtectionRecord {
    pub detected: bool,
    pub protection_type: Option<ProtectionType>,
    /// Matched indicator labels, deduplicated and sorted.
    pub indicators: Vec<String>,
    /// Confidence in [0, 1].
    pub confidence: f64,
}

impl BotProtectionRecord {
    pub fn none() -> Self {
        Self {
            detected: false,
            protection_type: None,
            indicators: Vec::new(),
            confidence: 0.0,
        }
    }

    /// Detected with at least the given confidence.
    pub fn is_likely(&self, confidence_threshold: f64) -> bool {
        self.detected && self.confidence >= confidence_threshold
    }

    pub fn summary(&self) -> String {
        if !self.detected {
            return "No bot protection detected".to_string();
        }
        let level = if self.confidence >= 0.7 {
            "high"
        } else if self.confidence >= 0.4 {
            "medium"
        } else {
            "low"
        };
        let name = self
            .protection_type
            .map(|t| t.display_name())
            .unwrap_or("Unknown Protection");
        format!(
            "{name} protection detected ({level} confidence: {:.2})",
            self.confidence
        )
    }
}

/// Coordinator states for one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteState {
    Pending,
    Fetching,
    SslAndBotCheck,
    Deciding,
    /// Running downstream phase `n` (0-based).
    Analyzing(usize),
    Done,
    Aborted,
}

impl SiteState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SiteState::Done | SiteState::Aborted)
    }
}

impl fmt::Display for SiteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteState::Pending => f.write_str("PENDING"),
            SiteState::Fetching => f.write_str("FETCHING"),
            SiteState::SslAndBotCheck => f.write_str("SSL_AND_BOT_CHECK"),
            SiteState::Deciding => f.write_str("DECIDING"),
            SiteState::Analyzing(n) => write!(f, "ANALYZING({})", n + 1),
            SiteState::Done => f.write_str("DONE"),
            SiteState::Aborted => f.write_str("ABORTED"),
        }
    }
}

/// Where a continue/skip decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    External,
    Fallback,
}

/// Continue/skip decision taken in `DECIDING`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinueDecision {
    pub should_continue: bool,
    pub skip_reasons: Vec<String>,
    pub reasoning: String,
    pub source: DecisionSource,
}

/// Execution status of one downstream phase slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    NotAttempted,
    Succeeded,
    Failed,
}

/// Slot holding one downstream phase's opaque result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSlot {
    pub name: String,
    pub status: PhaseStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl PhaseSlot {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: PhaseStatus::NotAttempted,
            result: None,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status == PhaseStatus::NotAttempted && self.result.is_none()
    }
}

/// Error returned when mutating a record that already reached a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("record for {url} is already terminal ({state})")]
pub struct RecordFinalized {
    pub url: String,
    pub state: SiteState,
}

/// Per-site aggregate, mutated by the coordinator until terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteAnalysisRecord {
    pub job_id: String,
    pub original_url: String,
    /// Position of the URL in the input list.
    pub index: usize,
    state: SiteState,
    pub fetch: Option<FetchOutcome>,
    pub ssl: Option<SslRecord>,
    pub bot_protection: Option<BotProtectionRecord>,
    pub decision: Option<ContinueDecision>,
    pub phases: Vec<PhaseSlot>,
    pub failures: Vec<FailureKind>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub processing_duration_ms: u64,
}

impl SiteAnalysisRecord {
    /// Creates an empty record with one unattempted slot per phase name.
    pub fn new(task: &FetchTask, phase_names: &[String]) -> Self {
        Self {
            job_id: task.job_id().to_string(),
            original_url: task.url().to_string(),
            index: task.index(),
            state: SiteState::Pending,
            fetch: None,
            ssl: None,
            bot_protection: None,
            decision: None,
            phases: phase_names.iter().map(PhaseSlot::empty).collect(),
            failures: Vec::new(),
            error: None,
            started_at: Utc::now(),
            finished_at: None,
            processing_duration_ms: 0,
        }
    }

    pub fn state(&self) -> SiteState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Moves to `next`. Refused once the record is terminal.
    pub fn set_state(&mut self, next: SiteState) -> Result<(), RecordFinalized> {
        self.ensure_open()?;
        self.state = next;
        if next.is_terminal() {
            let now = Utc::now();
            self.finished_at = Some(now);
            self.processing_duration_ms = (now - self.started_at).num_milliseconds().max(0) as u64;
        }
        Ok(())
    }

    /// Records a failure kind once.
    pub fn note_failure(&mut self, kind: FailureKind) -> Result<(), RecordFinalized> {
        self.ensure_open()?;
        if !self.failures.contains(&kind) {
            self.failures.push(kind);
        }
        Ok(())
    }

    /// Mutable access to a phase slot while the record is open.
    pub fn phase_mut(&mut self, index: usize) -> Result<Option<&mut PhaseSlot>, RecordFinalized> {
        self.ensure_open()?;
        Ok(self.phases.get_mut(index))
    }

    fn ensure_open(&self) -> Result<(), RecordFinalized> {
        if self.state.is_terminal() {
            Err(RecordFinalized {
                url: self.original_url.clone(),
                state: self.state,
            })
        } else {
            Ok(())
        }
    }

    /// Short outcome label distinguishing blocked, unreachable and partial runs.
    pub fn outcome_label(&self) -> &'static str {
        if self.state == SiteState::Aborted {
            return "aborted";
        }
        match self.fetch.as_ref().map(|f| f.status) {
            None => "not_fetched",
            Some(FetchStatus::NetworkError) => "network_unreachable",
            Some(FetchStatus::Timeout) => "timeout",
            Some(FetchStatus::ChallengeUnresolved) => "blocked_by_defenses",
            Some(FetchStatus::Success) => {
                if self.phases.iter().any(|p| p.status == PhaseStatus::Failed) {
                    "analysis_partially_failed"
                } else if self.decision.as_ref().is_some_and(|d| !d.should_continue) {
                    "analysis_skipped"
                } else {
                    "complete"
                }
            }
        }
    }
}
