//! Concurrency cap and result accounting under the batch controller.
//!
//! Uses a probing renderer that counts open sessions, so the tests observe
//! the cap from inside the fetch rather than from task bookkeeping.

#![allow(clippy::unwrap_used)]

mod helpers;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use helpers::{quiet_fetch_config, test_coordinator, ProbeRenderer, VecSink};
use site_capture::app::InputUrl;
use site_capture::run::ConcurrencyController;
use site_capture::{
    process_batch, AnalysisPhase, FetchStatus, PhaseError, ProcessingStats, SiteAnalysisRecord,
    SiteState,
};

fn inputs(n: usize) -> Vec<InputUrl> {
    (0..n)
        .map(|i| InputUrl::parse(&format!("http://site{i}.test/")))
        .collect()
}

#[tokio::test]
async fn test_open_sessions_never_exceed_limit() {
    let renderer = ProbeRenderer::new(Duration::from_millis(25));
    let stats = Arc::new(ProcessingStats::new());
    let coordinator = Arc::new(test_coordinator(Arc::new(renderer.clone()), stats));
    let controller = ConcurrencyController::new(3, CancellationToken::new()).unwrap();
    let mut sink = VecSink::default();

    let summary = process_batch(
        "job_cap",
        inputs(20),
        Arc::new(quiet_fetch_config()),
        coordinator,
        &controller,
        &mut sink,
    )
    .await;

    assert_eq!(sink.records.len(), 20);
    assert_eq!(summary.total, 20);
    assert!(
        renderer.peak() <= 3,
        "peak of {} open sessions exceeds the limit",
        renderer.peak()
    );
    assert!(renderer.peak() >= 2, "tasks never overlapped");
}

#[tokio::test]
async fn test_limit_one_runs_sequentially() {
    let renderer = ProbeRenderer::new(Duration::from_millis(10));
    let stats = Arc::new(ProcessingStats::new());
    let coordinator = Arc::new(test_coordinator(Arc::new(renderer.clone()), stats));
    let controller = ConcurrencyController::new(1, CancellationToken::new()).unwrap();
    let mut sink = VecSink::default();

    process_batch(
        "job_serial",
        inputs(3),
        Arc::new(quiet_fetch_config()),
        coordinator,
        &controller,
        &mut sink,
    )
    .await;

    assert_eq!(sink.records.len(), 3);
    assert_eq!(renderer.peak(), 1);

    let mut spans = renderer.spans();
    spans.sort_by_key(|s| s.opened);
    for pair in spans.windows(2) {
        assert!(
            pair[0].closed <= pair[1].opened,
            "{} overlapped {}",
            pair[0].url,
            pair[1].url
        );
    }
}

/// Panics for one host, succeeds for every other.
struct PanickyPhase;

impl AnalysisPhase for PanickyPhase {
    fn name(&self) -> &str {
        "panicky"
    }

    fn analyze<'a>(
        &'a self,
        record: &'a SiteAnalysisRecord,
    ) -> BoxFuture<'a, Result<serde_json::Value, PhaseError>> {
        async move {
            if record.original_url.contains("site3.") {
                panic!("analysis blew up");
            }
            Ok(serde_json::json!({ "ok": true }))
        }
        .boxed()
    }
}

#[tokio::test]
async fn test_exactly_one_record_per_input() {
    let renderer = ProbeRenderer::new(Duration::from_millis(1));
    let stats = Arc::new(ProcessingStats::new());
    let coordinator = test_coordinator(Arc::new(renderer), Arc::clone(&stats))
        .with_phases(vec![Arc::new(PanickyPhase) as Arc<dyn AnalysisPhase>]);
    let controller = ConcurrencyController::new(4, CancellationToken::new()).unwrap();
    let mut sink = VecSink::default();

    let mut batch = inputs(8);
    batch.push(InputUrl::parse("ftp://files.test/archive"));

    let summary = process_batch(
        "job_once",
        batch,
        Arc::new(quiet_fetch_config()),
        Arc::new(coordinator),
        &controller,
        &mut sink,
    )
    .await;

    assert_eq!(sink.records.len(), 9);
    assert_eq!(summary.total, 9);
    let indexes: BTreeSet<usize> = sink.records.iter().map(|r| r.index).collect();
    assert_eq!(indexes, (0..9).collect::<BTreeSet<_>>());

    let panicked = sink
        .records
        .iter()
        .find(|r| r.original_url.contains("site3."))
        .unwrap();
    assert_eq!(panicked.state(), SiteState::Aborted);
    assert!(panicked.error.as_deref().unwrap().contains("analysis blew up"));

    let invalid = sink.records.iter().find(|r| r.index == 8).unwrap();
    assert_eq!(invalid.state(), SiteState::Done);
    assert_eq!(
        invalid.fetch.as_ref().unwrap().status,
        FetchStatus::NetworkError
    );

    let completed = sink
        .records
        .iter()
        .filter(|r| r.state() == SiteState::Done && r.index != 8)
        .count();
    assert_eq!(completed, 7);
}

#[tokio::test]
async fn test_cancelled_batch_still_accounts_for_every_input() {
    let renderer = ProbeRenderer::new(Duration::from_millis(200));
    let stats = Arc::new(ProcessingStats::new());
    let coordinator = Arc::new(test_coordinator(Arc::new(renderer), stats));
    let cancel = CancellationToken::new();
    let controller = ConcurrencyController::new(2, cancel.clone()).unwrap();
    let mut sink = VecSink::default();

    let trigger = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        })
    };

    let summary = process_batch(
        "job_cancel",
        inputs(6),
        Arc::new(quiet_fetch_config()),
        coordinator,
        &controller,
        &mut sink,
    )
    .await;
    trigger.await.unwrap();

    assert_eq!(sink.records.len(), 6);
    assert_eq!(summary.aborted(), 6);
    assert!(sink
        .records
        .iter()
        .all(|r| r.state() == SiteState::Aborted));
}
