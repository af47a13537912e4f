//! HTTP renderer against local servers: redirect caps and challenge pages.

#![allow(clippy::unwrap_used)]

mod helpers;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect};
use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;

use helpers::{quiet_fetch_config, serve, test_coordinator, test_fetcher};
use site_capture::challenge::ChallengeDetector;
use site_capture::error_handling::InfoKind;
use site_capture::fetch::HttpRenderer;
use site_capture::initialization::init_client;
use site_capture::models::ProtectionType;
use site_capture::{FailureKind, FetchStatus, FetchTask, ProcessingStats, SiteState};

const CHALLENGE_PAGE: &str = "<html><head><title>Just a moment...</title></head>\
    <body><h1>Checking your browser before accessing shop.test</h1></body></html>";

async fn redirect_hop(Path(hop): Path<u32>) -> axum::response::Response {
    if hop == 0 {
        Html("<html><head><title>Landing Page</title></head><body>arrived</body></html>")
            .into_response()
    } else {
        Redirect::temporary(&format!("/redirect/{}", hop - 1)).into_response()
    }
}

fn http_renderer() -> Arc<HttpRenderer> {
    Arc::new(HttpRenderer::new(init_client().unwrap()))
}

fn task(url: String, max_redirects: usize) -> FetchTask {
    let mut config = quiet_fetch_config();
    config.max_redirects = max_redirects;
    FetchTask::new(url, "job_http", 0, Arc::new(config))
}

#[tokio::test]
async fn test_redirect_chain_at_cap_succeeds() {
    let base = serve(Router::new().route("/redirect/{hop}", get(redirect_hop))).await;
    let stats = Arc::new(ProcessingStats::new());
    let fetcher = test_fetcher(http_renderer(), Arc::clone(&stats));

    let outcome = fetcher
        .fetch(&task(format!("{base}/redirect/3"), 3), &CancellationToken::new())
        .await;

    assert_eq!(outcome.status, FetchStatus::Success, "{:?}", outcome.error);
    assert!(outcome.redirected);
    assert_eq!(outcome.redirect_chain.len(), 4);
    assert!(outcome.final_url.ends_with("/redirect/0"));
    assert_eq!(outcome.http_status, Some(200));
    assert!(outcome.html.as_deref().unwrap().contains("arrived"));
    assert_eq!(stats.get_info_count(InfoKind::Redirected), 1);
}

#[tokio::test]
async fn test_redirect_chain_over_cap_fails_without_retry() {
    let base = serve(Router::new().route("/redirect/{hop}", get(redirect_hop))).await;
    let stats = Arc::new(ProcessingStats::new());
    let fetcher = test_fetcher(http_renderer(), Arc::clone(&stats))
        .with_retry(3, std::time::Duration::from_millis(1));

    let outcome = fetcher
        .fetch(&task(format!("{base}/redirect/4"), 3), &CancellationToken::new())
        .await;

    assert_eq!(outcome.status, FetchStatus::NetworkError);
    assert_eq!(outcome.failure, Some(FailureKind::RedirectLimitExceeded));
    assert_eq!(outcome.attempts, 1);
    assert!(outcome.html.is_none());
    assert_eq!(stats.get_info_count(InfoKind::FetchRetried), 0);
}

#[tokio::test]
async fn test_challenge_page_is_flagged_and_unresolved() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = {
        let hits = Arc::clone(&hits);
        Router::new().route(
            "/",
            get(move || {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Html(CHALLENGE_PAGE)
                }
            }),
        )
    };
    let base = serve(app).await;

    let verdict = ChallengeDetector::default().detect(CHALLENGE_PAGE);
    assert!(verdict.likely_challenge);

    let stats = Arc::new(ProcessingStats::new());
    let fetcher = test_fetcher(http_renderer(), Arc::clone(&stats));
    let outcome = fetcher
        .fetch(&task(format!("{base}/"), 5), &CancellationToken::new())
        .await;

    assert_eq!(outcome.status, FetchStatus::ChallengeUnresolved);
    assert!(outcome.challenge_detected);
    assert!(!outcome.challenge_remediated);
    assert_eq!(outcome.failure, Some(FailureKind::ChallengeUnresolved));
    // Initial load plus exactly one remediation reload.
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(stats.get_info_count(InfoKind::ChallengeDetected), 1);
}

#[tokio::test]
async fn test_challenge_cleared_by_remediation_reload() {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = {
        let hits = Arc::clone(&hits);
        Router::new().route(
            "/",
            get(move || {
                let hits = Arc::clone(&hits);
                async move {
                    if hits.fetch_add(1, Ordering::SeqCst) == 0 {
                        Html(CHALLENGE_PAGE.to_string())
                    } else {
                        Html("<html><head><title>Shop Test</title></head><body>catalog</body></html>".to_string())
                    }
                }
            }),
        )
    };
    let base = serve(app).await;

    let stats = Arc::new(ProcessingStats::new());
    let fetcher = test_fetcher(http_renderer(), Arc::clone(&stats));
    let outcome = fetcher
        .fetch(&task(format!("{base}/"), 5), &CancellationToken::new())
        .await;

    assert_eq!(outcome.status, FetchStatus::Success);
    assert!(outcome.challenge_detected);
    assert!(outcome.challenge_remediated);
    assert!(outcome.html.as_deref().unwrap().contains("catalog"));
    assert_eq!(stats.get_info_count(InfoKind::ChallengeRemediated), 1);
}

#[tokio::test]
async fn test_unresolved_challenge_still_reaches_checks_and_decision() {
    let base = serve(Router::new().route("/", get(|| async { Html(CHALLENGE_PAGE) }))).await;
    let stats = Arc::new(ProcessingStats::new());
    let coordinator = test_coordinator(http_renderer(), Arc::clone(&stats));

    let record = coordinator
        .process(task(format!("{base}/"), 5), CancellationToken::new())
        .await;

    assert_eq!(record.state(), SiteState::Done);
    assert_eq!(
        record.fetch.as_ref().unwrap().status,
        FetchStatus::ChallengeUnresolved
    );
    assert!(record.failures.contains(&FailureKind::ChallengeUnresolved));
    let ssl = record.ssl.as_ref().unwrap();
    assert!(!ssl.has_tls);
    assert!(record.bot_protection.is_some());
    assert!(record.decision.is_some());
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // Bind then drop a listener so the port is known to be closed.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let stats = Arc::new(ProcessingStats::new());
    let coordinator = test_coordinator(http_renderer(), Arc::clone(&stats));
    let record = coordinator
        .process(
            task(format!("http://127.0.0.1:{port}/"), 5),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(record.state(), SiteState::Done);
    let fetch = record.fetch.as_ref().unwrap();
    assert_eq!(fetch.status, FetchStatus::NetworkError);
    assert!(record.ssl.is_none());
    assert!(record.bot_protection.is_none());
    assert!(record.decision.is_none());
    assert_eq!(record.outcome_label(), "network_unreachable");
}

async fn error_server() -> String {
    serve(
        Router::new()
            .route("/forbidden", get(|| async { (StatusCode::FORBIDDEN, "") }))
            .route(
                "/throttled",
                get(|| async { (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests") }),
            )
            .route(
                "/missing",
                get(|| async { (StatusCode::NOT_FOUND, Html("<html><body>Not found</body></html>")) }),
            ),
    )
    .await
}

#[tokio::test]
async fn test_forbidden_response_is_blocked_not_complete() {
    let base = error_server().await;
    let stats = Arc::new(ProcessingStats::new());
    let coordinator = test_coordinator(http_renderer(), Arc::clone(&stats));

    let record = coordinator
        .process(task(format!("{base}/forbidden"), 5), CancellationToken::new())
        .await;

    let fetch = record.fetch.as_ref().unwrap();
    assert_eq!(fetch.http_status, Some(403));
    assert_eq!(fetch.status, FetchStatus::ChallengeUnresolved);
    assert_eq!(fetch.error.as_deref(), Some("HTTP 403"));
    assert_eq!(record.outcome_label(), "blocked_by_defenses");

    let protection = record.bot_protection.as_ref().unwrap();
    assert!(protection.detected);
    assert!(protection
        .indicators
        .contains(&"http_403_forbidden".to_string()));

    let decision = record.decision.as_ref().unwrap();
    assert!(!decision.should_continue);
    assert_eq!(record.state(), SiteState::Done);
}

#[tokio::test]
async fn test_rate_limited_response_is_classified() {
    let base = error_server().await;
    let stats = Arc::new(ProcessingStats::new());
    let coordinator = test_coordinator(http_renderer(), Arc::clone(&stats));

    let record = coordinator
        .process(task(format!("{base}/throttled"), 5), CancellationToken::new())
        .await;

    let fetch = record.fetch.as_ref().unwrap();
    assert_eq!(fetch.http_status, Some(429));
    assert_eq!(fetch.status, FetchStatus::ChallengeUnresolved);
    assert_eq!(fetch.error.as_deref(), Some("HTTP 429"));
    assert_ne!(record.outcome_label(), "complete");

    let protection = record.bot_protection.as_ref().unwrap();
    assert_eq!(protection.protection_type, Some(ProtectionType::RateLimit));
    assert!(protection
        .indicators
        .contains(&"http_429_rate_limit".to_string()));
}

#[tokio::test]
async fn test_plain_error_status_means_site_did_not_load() {
    let base = error_server().await;
    let stats = Arc::new(ProcessingStats::new());
    let coordinator = test_coordinator(http_renderer(), Arc::clone(&stats));

    let record = coordinator
        .process(task(format!("{base}/missing"), 5), CancellationToken::new())
        .await;

    let fetch = record.fetch.as_ref().unwrap();
    assert_eq!(fetch.http_status, Some(404));
    assert_eq!(fetch.status, FetchStatus::NetworkError);
    assert_eq!(fetch.error.as_deref(), Some("HTTP 404"));
    assert_eq!(fetch.attempts, 1);
    assert!(record.decision.is_none());
    assert_eq!(record.state(), SiteState::Done);
}
