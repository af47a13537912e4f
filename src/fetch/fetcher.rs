//! One site fetch: session, navigation, challenge handling, capture.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::challenge::{classify_protection, ChallengeDetector};
use crate::config::HTTP_ERROR_STATUS;
use crate::dedup::Deduplicator;
use crate::error_handling::{
    is_retriable_failure, FailureKind, FetchError, InfoKind, ProcessingStats,
};
use crate::fingerprint::{FingerprintPool, FingerprintProfile};
use crate::models::{FetchOutcome, FetchStatus, FetchTask};
use crate::utils::duration_to_ms;

use super::company::extract_company_name;
use super::renderer::{RenderSession, Renderer};

/// Terminal status recorded for a fetch error.
pub fn status_for(error: &FetchError) -> FetchStatus {
    match error {
        FetchError::Timeout(_) => FetchStatus::Timeout,
        _ => FetchStatus::NetworkError,
    }
}

fn should_retry(error: &FetchError) -> bool {
    is_retriable_failure(error.kind()) && !matches!(error, FetchError::InvalidUrl(_))
}

fn failed_outcome(
    task: &FetchTask,
    profile: &FingerprintProfile,
    error: &FetchError,
    started: Instant,
) -> FetchOutcome {
    FetchOutcome::failed(
        task.url(),
        status_for(error),
        error.kind(),
        error.to_string(),
        profile.viewport,
        &profile.user_agent,
        duration_to_ms(started.elapsed()),
    )
}

/// Drives a [`Renderer`] through one fetch per task.
///
/// [`SiteFetcher::fetch`] never fails: every failure mode ends up in the
/// returned outcome's status and error detail.
pub struct SiteFetcher {
    renderer: Arc<dyn Renderer>,
    fingerprints: FingerprintPool,
    detector: ChallengeDetector,
    dedup: Arc<Deduplicator>,
    stats: Arc<ProcessingStats>,
    max_attempts: usize,
    retry_delay: Duration,
}

impl SiteFetcher {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        fingerprints: FingerprintPool,
        detector: ChallengeDetector,
        dedup: Arc<Deduplicator>,
        stats: Arc<ProcessingStats>,
    ) -> Self {
        Self {
            renderer,
            fingerprints,
            detector,
            dedup,
            stats,
            max_attempts: crate::config::DEFAULT_FETCH_RETRIES,
            retry_delay: Duration::from_millis(crate::config::DEFAULT_RETRY_DELAY_MS),
        }
    }

    /// Attempts per task for transient failures (at least one) and the fixed
    /// delay between them.
    pub fn with_retry(mut self, max_attempts: usize, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer.name()
    }

    /// Fetches `task`, retrying transient network failures and timeouts with
    /// a fixed delay. A retry replaces the previous outcome.
    pub async fn fetch(&self, task: &FetchTask, cancel: &CancellationToken) -> FetchOutcome {
        let mut attempt = 1;
        loop {
            let profile = self.fingerprints.pick();
            let started = Instant::now();

            let result = self.attempt(task, &profile, cancel).await;

            let mut outcome = match result {
                Ok(outcome) => outcome,
                Err(error) => {
                    let retry = should_retry(&error) && attempt < self.max_attempts;
                    log::warn!(
                        "Fetch attempt {}/{} for {} failed: {}{}",
                        attempt,
                        self.max_attempts,
                        task.url(),
                        error,
                        if retry { " (will retry)" } else { "" }
                    );
                    if retry {
                        self.stats.increment_info(InfoKind::FetchRetried);
                        let cancelled = tokio::select! {
                            _ = cancel.cancelled() => true,
                            _ = tokio::time::sleep(self.retry_delay) => false,
                        };
                        if !cancelled {
                            attempt += 1;
                            continue;
                        }
                        failed_outcome(task, &profile, &FetchError::Cancelled, started)
                    } else {
                        failed_outcome(task, &profile, &error, started)
                    }
                }
            };
            outcome.attempts = attempt as u32;
            return outcome;
        }
    }

    /// One attempt. Errors are only returned for failures that prevent a page
    /// from being rendered; everything after navigation is best-effort.
    /// The session is closed whichever way the attempt ends, cancellation
    /// included.
    async fn attempt(
        &self,
        task: &FetchTask,
        profile: &FingerprintProfile,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome, FetchError> {
        let config = task.config();
        let started = Instant::now();

        let mut session = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            session = self.renderer.open(profile, config) => session?,
        };
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = self.drive(task, profile, session.as_mut(), started) => result,
        };
        session.close().await;
        result
    }

    async fn drive(
        &self,
        task: &FetchTask,
        profile: &FingerprintProfile,
        session: &mut dyn RenderSession,
        started: Instant,
    ) -> Result<FetchOutcome, FetchError> {
        let config = task.config();
        let timeout_secs = config.navigation_timeout.as_secs();

        let navigation =
            tokio::time::timeout(config.navigation_timeout, session.navigate(task.url()))
                .await
                .map_err(|_| FetchError::Timeout(timeout_secs))??;

        if navigation.redirected() {
            log::debug!("{} redirected to {}", task.url(), navigation.final_url);
            self.stats.increment_info(InfoKind::Redirected);
        }

        if config.stealth.human_behavior {
            session.interact().await;
        }

        let mut html = session.content().await?;
        let mut challenge_detected = false;
        let mut challenge_remediated = false;
        let mut status = FetchStatus::Success;
        let mut failure = None;
        let mut error = None;

        let verdict = self.detector.detect(&html);
        if verdict.likely_challenge {
            challenge_detected = true;
            self.stats.increment_info(InfoKind::ChallengeDetected);
            log::info!(
                "Challenge detected on {} (marker: {})",
                navigation.final_url,
                verdict.matched_marker.as_deref().unwrap_or("?")
            );

            let action = if config.stealth.challenge_remediation {
                self.detector.propose_remediation(&verdict)
            } else {
                None
            };

            // Exactly one remediation pass per fetch.
            if let Some(action) = action {
                let budget = config.navigation_timeout + action.settle;
                match tokio::time::timeout(budget, session.remediate(&action)).await {
                    Ok(Ok(clicked)) => {
                        log::debug!(
                            "Remediation pass on {} (control clicked: {clicked})",
                            navigation.final_url
                        );
                        if let Ok(refreshed) = session.content().await {
                            html = refreshed;
                        }
                    }
                    Ok(Err(e)) => {
                        log::debug!("Remediation failed on {}: {e}", navigation.final_url)
                    }
                    Err(_) => log::debug!("Remediation timed out on {}", navigation.final_url),
                }

                let recheck = self.detector.detect(&html);
                if !recheck.likely_challenge {
                    challenge_remediated = true;
                    self.stats.increment_info(InfoKind::ChallengeRemediated);
                    log::info!("Challenge passed on {}", navigation.final_url);
                }
            }

            if !challenge_remediated {
                status = FetchStatus::ChallengeUnresolved;
                failure = Some(FailureKind::ChallengeUnresolved);
                error = Some(format!(
                    "challenge not bypassed (marker: {})",
                    verdict.matched_marker.as_deref().unwrap_or("unknown")
                ));
            }
        }

        // An error status from the server means the site did not load,
        // unless a remediation pass got past it.
        if let Some(code) = navigation
            .http_status
            .filter(|code| *code >= HTTP_ERROR_STATUS && !challenge_remediated)
        {
            let http_error = format!("HTTP {code}");
            if status == FetchStatus::ChallengeUnresolved {
                error = error.map(|detail| format!("{http_error}: {detail}"));
            } else if classify_protection(Some(&html), Some(&http_error)).detected {
                status = FetchStatus::ChallengeUnresolved;
                failure = Some(FailureKind::ChallengeUnresolved);
                error = Some(http_error);
            } else {
                status = FetchStatus::NetworkError;
                failure = Some(FailureKind::NetworkFailure);
                error = Some(http_error);
            }
            log::info!(
                "{} answered HTTP {code} ({})",
                navigation.final_url,
                status.as_str()
            );
        }

        let mut screenshot = None;
        let mut screenshot_hash = None;
        let mut duplicate_of = None;
        if config.capture_screenshot {
            match session.screenshot().await {
                Ok(Some(bytes)) => {
                    let dedup = self.dedup.check(&bytes, task.url());
                    if dedup.is_duplicate() {
                        self.stats.increment_info(InfoKind::DuplicateScreenshot);
                    }
                    screenshot_hash = Some(dedup.hash);
                    duplicate_of = dedup.first_seen_url;
                    screenshot = Some(bytes);
                }
                Ok(None) => {}
                Err(e) => log::warn!("Screenshot failed for {}: {e}", navigation.final_url),
            }
        }

        let company_name = extract_company_name(&html, &navigation.final_url);

        Ok(FetchOutcome {
            original_url: task.url().to_string(),
            redirected: navigation.redirected(),
            final_url: navigation.final_url,
            redirect_chain: navigation.redirect_chain,
            http_status: navigation.http_status,
            html: Some(html),
            screenshot,
            screenshot_hash,
            duplicate_of,
            company_name,
            load_time_ms: duration_to_ms(started.elapsed()),
            viewport: profile.viewport,
            user_agent: profile.user_agent.clone(),
            status,
            failure,
            error,
            attempts: 1,
            challenge_detected,
            challenge_remediated,
        })
    }
}
