//! Drives one site through fetch, checks, decision and downstream analysis.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::challenge::classify_protection;
use crate::error_handling::{FailureKind, InfoKind, PhaseError, ProcessingStats};
use crate::fetch::SiteFetcher;
use crate::models::{FetchTask, PhaseStatus, SiteAnalysisRecord, SiteState};
use crate::tls::CertificateAnalyzer;
use crate::utils::{duration_to_ms, truncate_error};

use super::boundary::{AnalysisPhase, ContinueDecider};
use super::fallback::FallbackDecider;
use super::state::{transition, SiteEvent};

/// Per-site state machine runner.
///
/// One coordinator is shared by every task of a batch; [`process`] holds no
/// state between sites apart from the shared fetcher (dedup index) and
/// statistics.
///
/// [`process`]: OrchestrationCoordinator::process
pub struct OrchestrationCoordinator {
    fetcher: Arc<SiteFetcher>,
    certificates: CertificateAnalyzer,
    decider: Option<Arc<dyn ContinueDecider>>,
    fallback: FallbackDecider,
    phases: Vec<Arc<dyn AnalysisPhase>>,
    analysis_delay: Duration,
    call_timeout: Option<Duration>,
    stats: Arc<ProcessingStats>,
}

impl OrchestrationCoordinator {
    pub fn new(
        fetcher: Arc<SiteFetcher>,
        certificates: CertificateAnalyzer,
        stats: Arc<ProcessingStats>,
    ) -> Self {
        Self {
            fetcher,
            certificates,
            decider: None,
            fallback: FallbackDecider,
            phases: Vec::new(),
            analysis_delay: Duration::from_millis(crate::config::DEFAULT_ANALYSIS_DELAY_MS),
            call_timeout: None,
            stats,
        }
    }

    /// External continue/skip decider. Without one, the rule-based fallback
    /// decides.
    pub fn with_decider(mut self, decider: Arc<dyn ContinueDecider>) -> Self {
        self.decider = Some(decider);
        self
    }

    /// Downstream phases, run in the given order.
    pub fn with_phases(mut self, phases: Vec<Arc<dyn AnalysisPhase>>) -> Self {
        self.phases = phases;
        self
    }

    /// Pause between consecutive downstream calls.
    pub fn with_analysis_delay(mut self, delay: Duration) -> Self {
        self.analysis_delay = delay;
        self
    }

    /// Budget for each downstream call (decision and phases).
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn stats(&self) -> &Arc<ProcessingStats> {
        &self.stats
    }

    pub fn phase_names(&self) -> Vec<String> {
        self.phases.iter().map(|p| p.name().to_string()).collect()
    }

    /// Runs `task` to a terminal state. Always returns a record; on
    /// cancellation the record is `ABORTED` with whatever was gathered so far.
    pub async fn process(&self, task: FetchTask, cancel: CancellationToken) -> SiteAnalysisRecord {
        let mut record = SiteAnalysisRecord::new(&task, &self.phase_names());
        let mut event = SiteEvent::Start;

        loop {
            let state = self.advance(&mut record, event);
            if state.is_terminal() {
                break;
            }
            if cancel.is_cancelled() {
                event = SiteEvent::Cancelled;
                continue;
            }

            event = match state {
                SiteState::Fetching => self.fetch(&task, &mut record, &cancel).await,
                SiteState::SslAndBotCheck => self.check(&mut record, &cancel).await,
                SiteState::Deciding => self.decide(&mut record, &cancel).await,
                SiteState::Analyzing(index) => self.analyze(index, &mut record, &cancel).await,
                SiteState::Pending | SiteState::Done | SiteState::Aborted => SiteEvent::Fatal,
            };
        }

        log::info!(
            "{} finished in state {} ({}, {}ms)",
            record.original_url,
            record.state(),
            record.outcome_label(),
            record.processing_duration_ms
        );
        record
    }

    /// Applies `event` to the record's state and returns the new state.
    fn advance(&self, record: &mut SiteAnalysisRecord, event: SiteEvent) -> SiteState {
        let current = record.state();
        let next = match transition(current, event, self.phases.len()) {
            Some(next) => next,
            None => {
                log::error!(
                    "Invalid transition for {}: {:?} in state {current}",
                    record.original_url,
                    event
                );
                self.fail(record, FailureKind::Internal);
                SiteState::Aborted
            }
        };

        match event {
            SiteEvent::Cancelled => {
                self.fail(record, FailureKind::Cancelled);
                if record.error.is_none() {
                    record.error = Some(format!("cancelled during {current}"));
                }
            }
            SiteEvent::Fatal => self.fail(record, FailureKind::Internal),
            _ => {}
        }

        log::debug!("{}: {current} -> {next}", record.original_url);
        if let Err(e) = record.set_state(next) {
            log::error!("{e}");
        }
        record.state()
    }

    fn fail(&self, record: &mut SiteAnalysisRecord, kind: FailureKind) {
        if record.failures.contains(&kind) {
            return;
        }
        match record.note_failure(kind) {
            Ok(()) => self.stats.increment_failure(kind),
            Err(e) => log::error!("{e}"),
        }
    }

    async fn fetch(
        &self,
        task: &FetchTask,
        record: &mut SiteAnalysisRecord,
        cancel: &CancellationToken,
    ) -> SiteEvent {
        let outcome = self.fetcher.fetch(task, cancel).await;
        let rendered = outcome.status.rendered();
        let failure = outcome.failure;
        if outcome.error.is_some() {
            record.error = outcome.error.clone();
        }
        record.fetch = Some(outcome);

        match failure {
            Some(FailureKind::Cancelled) => SiteEvent::Cancelled,
            Some(kind) => {
                self.fail(record, kind);
                if rendered {
                    SiteEvent::PageRendered
                } else {
                    SiteEvent::FetchFailed
                }
            }
            None => SiteEvent::PageRendered,
        }
    }

    async fn check(
        &self,
        record: &mut SiteAnalysisRecord,
        cancel: &CancellationToken,
    ) -> SiteEvent {
        let fetch = record.fetch.as_ref();
        let final_url = fetch
            .map(|f| f.final_url.clone())
            .unwrap_or_else(|| record.original_url.clone());
        let html = fetch.and_then(|f| f.html.as_deref());
        let error = fetch.and_then(|f| f.error.as_deref());

        let checks = async {
            tokio::join!(self.certificates.analyze_url(&final_url), async {
                classify_protection(html, error)
            })
        };
        let (ssl, protection) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return SiteEvent::Cancelled,
            pair = checks => pair,
        };

        if ssl.has_tls && !ssl.is_valid {
            log::warn!(
                "Certificate problem on {final_url}: {}",
                ssl.certificate_error.as_deref().unwrap_or("unknown")
            );
            self.fail(record, FailureKind::CertificateInvalid);
        }
        if protection.detected {
            log::info!("{final_url}: {}", protection.summary());
        }

        record.ssl = Some(ssl);
        record.bot_protection = Some(protection);
        SiteEvent::ChecksComplete
    }

    async fn decide(
        &self,
        record: &mut SiteAnalysisRecord,
        cancel: &CancellationToken,
    ) -> SiteEvent {
        let decision = match &self.decider {
            Some(decider) => {
                let call = self.bounded(decider.decide(record));
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return SiteEvent::Cancelled,
                    result = call => result,
                };
                match result {
                    Ok(decision) => decision,
                    Err(e) => {
                        log::warn!(
                            "Continue/skip decision failed for {}: {e}, using rules",
                            record.original_url
                        );
                        self.fallback.evaluate(record)
                    }
                }
            }
            None => self.fallback.evaluate(record),
        };

        let continue_analysis = decision.should_continue;
        if !continue_analysis {
            self.stats.increment_info(InfoKind::AnalysisSkipped);
            log::info!(
                "Skipping analysis of {}: {}",
                record.original_url,
                decision.skip_reasons.join(", ")
            );
        }
        record.decision = Some(decision);
        SiteEvent::Decided { continue_analysis }
    }

    async fn analyze(
        &self,
        index: usize,
        record: &mut SiteAnalysisRecord,
        cancel: &CancellationToken,
    ) -> SiteEvent {
        let Some(phase) = self.phases.get(index).cloned() else {
            return SiteEvent::Fatal;
        };

        if index > 0 && !self.analysis_delay.is_zero() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return SiteEvent::Cancelled,
                _ = tokio::time::sleep(self.analysis_delay) => {}
            }
        }

        let started = Instant::now();
        let call = self.bounded(phase.analyze(record));
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return SiteEvent::Cancelled,
            result = call => result,
        };
        let elapsed = duration_to_ms(started.elapsed());

        let mut failed = None;
        match record.phase_mut(index) {
            Ok(Some(slot)) => {
                slot.duration_ms = elapsed;
                match result {
                    Ok(value) => {
                        slot.status = PhaseStatus::Succeeded;
                        slot.result = Some(value);
                    }
                    Err(PhaseError::MissingInput(what)) => {
                        log::debug!("Phase {} not applicable: {what}", phase.name());
                        slot.error = Some(format!("not applicable: {what}"));
                    }
                    Err(e) => {
                        log::warn!("Phase {} failed: {e}", phase.name());
                        slot.status = PhaseStatus::Failed;
                        slot.error = Some(truncate_error(&e.to_string()));
                        failed = Some(e);
                    }
                }
            }
            Ok(None) => return SiteEvent::Fatal,
            Err(e) => {
                log::error!("{e}");
                return SiteEvent::Fatal;
            }
        }

        if let Some(e) = failed {
            self.fail(record, FailureKind::DownstreamPhaseFailure);
            if e == PhaseError::Timeout {
                self.fail(record, FailureKind::TimeoutFailure);
            }
        }
        SiteEvent::PhaseFinished
    }

    async fn bounded<T>(
        &self,
        call: futures::future::BoxFuture<'_, Result<T, PhaseError>>,
    ) -> Result<T, PhaseError> {
        match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(PhaseError::Timeout)),
            None => call.await,
        }
    }
}
