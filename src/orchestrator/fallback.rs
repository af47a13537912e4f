//! Rule-based continue/skip decision.

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::config::BOT_BLOCKING_CONFIDENCE;
use crate::error_handling::PhaseError;
use crate::models::{ContinueDecision, DecisionSource, SiteAnalysisRecord};

use super::boundary::ContinueDecider;

pub const SKIP_INACCESSIBLE: &str = "site_completely_inaccessible";
pub const SKIP_BOT_BLOCKED: &str = "bot_protection_blocks_all_content";

/// Decision used when no external decider is configured or it fails.
///
/// Analysis is skipped only when there is nothing to analyze: the site did
/// not load (or answered with an HTTP error) and left neither HTML nor a
/// screenshot, or strong bot protection left neither.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackDecider;

impl FallbackDecider {
    pub fn evaluate(&self, record: &SiteAnalysisRecord) -> ContinueDecision {
        let fetch = record.fetch.as_ref();
        let site_loads = fetch.is_some_and(|f| f.status.rendered() && f.http_error().is_none());
        let has_html = fetch.is_some_and(|f| f.html.as_deref().is_some_and(|h| !h.is_empty()));
        let has_screenshot = fetch.is_some_and(|f| f.screenshot.is_some() || f.screenshot_hash.is_some());

        let mut skip_reasons = Vec::new();
        if !site_loads && !has_html && !has_screenshot {
            skip_reasons.push(SKIP_INACCESSIBLE.to_string());
        }

        let blocked = record.bot_protection.as_ref().is_some_and(|b| {
            b.detected && b.confidence > BOT_BLOCKING_CONFIDENCE
        });
        if blocked && !has_html && !has_screenshot {
            skip_reasons.push(SKIP_BOT_BLOCKED.to_string());
        }

        let should_continue = skip_reasons.is_empty();
        ContinueDecision {
            should_continue,
            skip_reasons,
            reasoning: format!(
                "Rule-based decision: {} analysis",
                if should_continue { "Continue" } else { "Skip" }
            ),
            source: DecisionSource::Fallback,
        }
    }
}

impl ContinueDecider for FallbackDecider {
    fn decide<'a>(
        &'a self,
        record: &'a SiteAnalysisRecord,
    ) -> BoxFuture<'a, Result<ContinueDecision, PhaseError>> {
        let decision = self.evaluate(record);
        async move { Ok(decision) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::FailureKind;
    use crate::models::{
        BotProtectionRecord, FetchConfig, FetchOutcome, FetchStatus, FetchTask, ProtectionType,
        Viewport,
    };
    use std::sync::Arc;

    fn record() -> SiteAnalysisRecord {
        let task = FetchTask::new(
            "https://example.com",
            "job_test",
            0,
            Arc::new(FetchConfig::default()),
        );
        SiteAnalysisRecord::new(&task, &[])
    }

    fn failed_fetch() -> FetchOutcome {
        FetchOutcome::failed(
            "https://example.com",
            FetchStatus::NetworkError,
            FailureKind::NetworkFailure,
            "connection refused",
            Viewport::new(1920, 1080),
            "ua",
            10,
        )
    }

    fn rendered_fetch(html: Option<&str>) -> FetchOutcome {
        let mut outcome = failed_fetch();
        outcome.status = FetchStatus::ChallengeUnresolved;
        outcome.failure = Some(FailureKind::ChallengeUnresolved);
        outcome.html = html.map(str::to_string);
        outcome
    }

    fn strong_protection() -> BotProtectionRecord {
        BotProtectionRecord {
            detected: true,
            protection_type: Some(ProtectionType::Cloudflare),
            indicators: vec!["cloudflare_cf-ray".to_string()],
            confidence: 0.9,
        }
    }

    #[test]
    fn test_inaccessible_site_is_skipped() {
        let mut record = record();
        record.fetch = Some(failed_fetch());
        let decision = FallbackDecider.evaluate(&record);
        assert!(!decision.should_continue);
        assert_eq!(decision.skip_reasons, vec![SKIP_INACCESSIBLE.to_string()]);
        assert_eq!(decision.reasoning, "Rule-based decision: Skip analysis");
        assert_eq!(decision.source, DecisionSource::Fallback);
    }

    #[test]
    fn test_rendered_page_continues() {
        let mut record = record();
        record.fetch = Some(rendered_fetch(Some("<html>hello</html>")));
        record.bot_protection = Some(strong_protection());
        let decision = FallbackDecider.evaluate(&record);
        assert!(decision.should_continue);
        assert!(decision.skip_reasons.is_empty());
        assert_eq!(decision.reasoning, "Rule-based decision: Continue analysis");
    }

    #[test]
    fn test_strong_protection_without_content_is_skipped() {
        let mut record = record();
        record.fetch = Some(rendered_fetch(None));
        record.bot_protection = Some(strong_protection());
        let decision = FallbackDecider.evaluate(&record);
        assert!(!decision.should_continue);
        assert_eq!(decision.skip_reasons, vec![SKIP_BOT_BLOCKED.to_string()]);
    }

    #[test]
    fn test_weak_protection_without_content_continues_if_loaded() {
        let mut record = record();
        record.fetch = Some(rendered_fetch(None));
        let mut protection = strong_protection();
        protection.confidence = 0.5;
        record.bot_protection = Some(protection);
        assert!(FallbackDecider.evaluate(&record).should_continue);
    }

    #[test]
    fn test_http_error_without_content_is_inaccessible() {
        let mut record = record();
        let mut fetch = rendered_fetch(Some(""));
        fetch.http_status = Some(403);
        record.fetch = Some(fetch);
        let decision = FallbackDecider.evaluate(&record);
        assert!(!decision.should_continue);
        assert_eq!(decision.skip_reasons, vec![SKIP_INACCESSIBLE.to_string()]);
    }

    #[test]
    fn test_http_error_with_content_continues() {
        let mut record = record();
        let mut fetch = rendered_fetch(Some("<html>Checking your browser</html>"));
        fetch.http_status = Some(503);
        record.fetch = Some(fetch);
        assert!(FallbackDecider.evaluate(&record).should_continue);
    }

    #[tokio::test]
    async fn test_decider_trait_returns_evaluation() {
        let mut record = record();
        record.fetch = Some(failed_fetch());
        let decision = FallbackDecider.decide(&record).await.unwrap();
        assert!(!decision.should_continue);
    }
}
