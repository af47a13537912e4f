//! Batch execution.
//!
//! [`run_batch`] is the library entry point used by the CLI: it loads the
//! input list, builds the renderer and coordinator from a [`Config`], runs
//! every site under the concurrency cap and exports one record per input
//! line. [`process_batch`] is the reusable core for callers that bring their
//! own coordinator and sink.

mod controller;
mod records;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::app::{
    load_inputs, log_progress, print_batch_summary, print_processing_statistics,
    shutdown_gracefully, spawn_interrupt_listener, InputUrl,
};
use crate::challenge::ChallengeDetector;
use crate::config::{Config, RendererKind, LOGGING_INTERVAL};
use crate::dedup::Deduplicator;
use crate::error_handling::{FailureKind, ProcessingStats};
use crate::export::{write_summary, BatchSummary, JsonlSink, RecordSink};
use crate::fetch::{HttpRenderer, Renderer, SiteFetcher};
use crate::fingerprint::FingerprintPool;
use crate::initialization::init_client;
use crate::models::{FetchConfig, FetchTask, SiteAnalysisRecord, Viewport};
use crate::orchestrator::{AnalysisPhase, ContinueDecider, OrchestrationCoordinator};
use crate::tls::CertificateAnalyzer;

pub use controller::{ConcurrencyController, TaskFault};
pub use records::{fault_record, invalid_input_record};

/// Results of a batch run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub job_id: String,
    /// Input lines processed (one record each).
    pub total_urls: usize,
    /// Sites whose fetch succeeded.
    pub successful: usize,
    pub failed: usize,
    /// Sites left `ABORTED` by cancellation or an internal fault.
    pub aborted: usize,
    pub records_path: PathBuf,
    pub summary_path: PathBuf,
    pub elapsed_seconds: f64,
    pub cancelled: bool,
}

/// Runs a batch with the built-in rule-based decision and no downstream
/// phases. Ctrl-C cancels the batch; partial results are still exported.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the input cannot be
/// read, the renderer cannot be started or the output cannot be created.
/// Per-site failures never surface here; they are part of the records.
pub async fn run_batch(config: Config) -> Result<BatchReport> {
    let cancel = CancellationToken::new();
    let listener = spawn_interrupt_listener(cancel.clone());
    let result = run_batch_with(config, Vec::new(), None, cancel).await;
    shutdown_gracefully(listener).await;
    result
}

/// [`run_batch`] with downstream phases, an optional external decider and a
/// caller-owned cancellation token.
///
/// # Errors
///
/// See [`run_batch`].
pub async fn run_batch_with(
    config: Config,
    phases: Vec<Arc<dyn AnalysisPhase>>,
    decider: Option<Arc<dyn ContinueDecider>>,
    cancel: CancellationToken,
) -> Result<BatchReport> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

    let job_id = config.resolved_job_id();
    info!("Starting job: {}", job_id);

    let inputs = load_inputs(config.file.as_deref(), &config.urls).await?;
    if inputs.is_empty() {
        warn!("No URLs to process");
    }

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                config.output_dir.display()
            )
        })?;

    let stats = Arc::new(ProcessingStats::new());
    let engine = build_renderer(&config).await?;

    let mut coordinator =
        build_coordinator(&config, engine.renderer(), Arc::clone(&stats)).with_phases(phases);
    if let Some(decider) = decider {
        coordinator = coordinator.with_decider(decider);
    }
    let coordinator = Arc::new(coordinator);

    let controller = ConcurrencyController::new(config.max_concurrency, cancel.clone())
        .context("Failed to initialize concurrency controller")?;
    let mut sink = JsonlSink::create(&config.output_dir, &job_id).await?;
    let records_path = sink.records_path().to_path_buf();

    let start_time = Instant::now();
    let fetch_config = Arc::new(FetchConfig::from(&config));
    let mut summary = process_batch(
        &job_id,
        inputs,
        fetch_config,
        coordinator,
        &controller,
        &mut sink,
    )
    .await;
    sink.finish().await?;
    engine.shutdown().await;

    summary.finish();
    let summary_path = write_summary(&config.output_dir, &summary).await?;
    let elapsed_seconds = start_time.elapsed().as_secs_f64();

    print_processing_statistics(&stats);
    print_batch_summary(&summary, elapsed_seconds);

    Ok(BatchReport {
        job_id,
        total_urls: summary.total,
        successful: summary.successful(),
        failed: summary.failed(),
        aborted: summary.aborted(),
        records_path,
        summary_path,
        elapsed_seconds,
        cancelled: cancel.is_cancelled(),
    })
}

/// Runs every input through `coordinator` and hands each finalized record to
/// `sink` as soon as it is ready.
///
/// Invalid input lines and tasks that produced nothing (cancelled before
/// start, panicked) get a synthesized record, so the sink sees exactly one
/// record per input. Sink errors are logged and counted, never fatal.
pub async fn process_batch(
    job_id: &str,
    inputs: Vec<InputUrl>,
    fetch_config: Arc<FetchConfig>,
    coordinator: Arc<OrchestrationCoordinator>,
    controller: &ConcurrencyController,
    sink: &mut dyn RecordSink,
) -> BatchSummary {
    let phase_names = coordinator.phase_names();
    let stats = Arc::clone(coordinator.stats());
    let total = inputs.len();
    let mut summary = BatchSummary::new(job_id);

    let (tx, mut rx) = mpsc::unbounded_channel::<SiteAnalysisRecord>();

    let mut tasks = Vec::with_capacity(total);
    for (index, input) in inputs.into_iter().enumerate() {
        let task = FetchTask::new(input.target(), job_id, index, Arc::clone(&fetch_config));
        match &input.normalized {
            Ok(_) => tasks.push(task),
            Err(reason) => {
                stats.increment_failure(FailureKind::NetworkFailure);
                let _ = tx.send(invalid_input_record(&task, reason, &phase_names));
            }
        }
    }

    let dispatch = async {
        let on_complete = {
            let tx = tx;
            move |record: SiteAnalysisRecord| {
                if tx.send(record).is_err() {
                    log::error!("Record channel closed before the batch finished");
                }
            }
        };
        controller
            .run(
                tasks,
                |task, cancel| {
                    let coordinator = Arc::clone(&coordinator);
                    async move { coordinator.process(task, cancel).await }
                },
                |task, fault| {
                    let kind = match fault {
                        TaskFault::NotStarted => FailureKind::Cancelled,
                        _ => FailureKind::Internal,
                    };
                    stats.increment_failure(kind);
                    fault_record(task, &fault, &phase_names)
                },
                on_complete,
            )
            .await;
    };

    let export = async {
        let start_time = Instant::now();
        let mut completed = 0usize;
        while let Some(record) = rx.recv().await {
            summary.record(&record);
            completed += 1;
            if completed % LOGGING_INTERVAL == 0 || completed == total {
                log_progress(start_time, completed, total);
            }
            let url = record.original_url.clone();
            if let Err(e) = sink.accept(record).await {
                log::error!("Failed to export record for {url}: {e:#}");
                stats.increment_failure(FailureKind::Internal);
            }
        }
    };

    tokio::join!(dispatch, export);
    summary
}

/// Builds the coordinator for `config` over `renderer`.
pub fn build_coordinator(
    config: &Config,
    renderer: Arc<dyn Renderer>,
    stats: Arc<ProcessingStats>,
) -> OrchestrationCoordinator {
    let fingerprints = FingerprintPool::new(
        config.random_fingerprint,
        Viewport::new(config.viewport_width, config.viewport_height),
    );
    let detector = ChallengeDetector::new(config.all_challenge_markers());
    let fetcher = SiteFetcher::new(
        renderer,
        fingerprints,
        detector,
        Arc::new(Deduplicator::new()),
        Arc::clone(&stats),
    )
    .with_retry(config.fetch_retries, config.retry_delay());
    info!(
        "Renderer: {} (concurrency {}, navigation timeout {}s)",
        fetcher.renderer_name(),
        config.max_concurrency,
        config.navigation_timeout_secs
    );

    OrchestrationCoordinator::new(
        Arc::new(fetcher),
        CertificateAnalyzer::new(config.tls_timeout()),
        stats,
    )
    .with_analysis_delay(config.analysis_delay())
    .with_call_timeout(config.analysis_timeout())
}

/// The rendering engine of a batch, kept so it can be shut down afterwards.
enum Engine {
    Http(Arc<HttpRenderer>),
    #[cfg(feature = "chromium")]
    Chromium(Arc<crate::fetch::ChromiumRenderer>),
}

impl Engine {
    fn renderer(&self) -> Arc<dyn Renderer> {
        match self {
            Engine::Http(renderer) => Arc::clone(renderer) as Arc<dyn Renderer>,
            #[cfg(feature = "chromium")]
            Engine::Chromium(renderer) => Arc::clone(renderer) as Arc<dyn Renderer>,
        }
    }

    async fn shutdown(self) {
        match self {
            Engine::Http(_) => {}
            #[cfg(feature = "chromium")]
            Engine::Chromium(renderer) => match Arc::try_unwrap(renderer) {
                Ok(renderer) => renderer.shutdown().await,
                Err(_) => warn!("Browser still in use at shutdown, leaving it to process exit"),
            },
        }
    }
}

async fn build_renderer(config: &Config) -> Result<Engine> {
    match config.renderer {
        RendererKind::Http => {
            let client = init_client().context("Failed to initialize HTTP client")?;
            Ok(Engine::Http(Arc::new(HttpRenderer::new(client))))
        }
        #[cfg(feature = "chromium")]
        RendererKind::Chromium => {
            let renderer = crate::fetch::ChromiumRenderer::launch(Viewport::new(
                config.viewport_width,
                config.viewport_height,
            ))
            .await
            .context("Failed to launch headless Chromium")?;
            Ok(Engine::Chromium(Arc::new(renderer)))
        }
        #[cfg(not(feature = "chromium"))]
        RendererKind::Chromium => Err(anyhow::anyhow!(
            "the chromium renderer requires building with --features chromium"
        )),
    }
}
