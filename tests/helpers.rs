// Shared test helpers: a probing renderer, an in-memory sink and local
// axum servers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::Router;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::net::TcpListener;

use site_capture::challenge::{ChallengeDetector, RemediationAction};
use site_capture::dedup::Deduplicator;
use site_capture::export::RecordSink;
use site_capture::fetch::{Navigation, RenderSession, Renderer, SiteFetcher};
use site_capture::fingerprint::{FingerprintPool, FingerprintProfile};
use site_capture::models::{FetchConfig, Viewport};
use site_capture::tls::CertificateAnalyzer;
use site_capture::{FetchError, OrchestrationCoordinator, ProcessingStats, SiteAnalysisRecord};

/// Serves `app` on an ephemeral local port and returns `http://127.0.0.1:<port>`.
#[allow(dead_code)] // Used by other test files
pub async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{addr}")
}

/// Open/close span of one session.
#[allow(dead_code)] // Used by other test files
#[derive(Debug, Clone)]
pub struct Span {
    pub url: String,
    pub opened: Instant,
    pub closed: Instant,
}

/// Renderer that serves a fixed page after `delay` and records how many
/// sessions are open at once.
#[allow(dead_code)] // Used by other test files
#[derive(Clone)]
pub struct ProbeRenderer {
    pub active: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
    pub spans: Arc<Mutex<Vec<Span>>>,
    delay: Duration,
    page: String,
    screenshot: Option<Vec<u8>>,
}

#[allow(dead_code)] // Used by other test files
impl ProbeRenderer {
    pub fn new(delay: Duration) -> Self {
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            spans: Arc::new(Mutex::new(Vec::new())),
            delay,
            page: "<html><head><title>Probe Site</title></head><body>ok</body></html>".to_string(),
            screenshot: None,
        }
    }

    /// Every session returns `bytes` as its screenshot.
    pub fn with_screenshot(mut self, bytes: &[u8]) -> Self {
        self.screenshot = Some(bytes.to_vec());
        self
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn spans(&self) -> Vec<Span> {
        self.spans.lock().unwrap().clone()
    }
}

struct ProbeSession {
    renderer: ProbeRenderer,
    opened: Instant,
    url: String,
}

impl Renderer for ProbeRenderer {
    fn name(&self) -> &'static str {
        "probe"
    }

    fn open<'a>(
        &'a self,
        _fingerprint: &'a FingerprintProfile,
        _config: &'a FetchConfig,
    ) -> BoxFuture<'a, Result<Box<dyn RenderSession>, FetchError>> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);
        let session = ProbeSession {
            renderer: self.clone(),
            opened: Instant::now(),
            url: String::new(),
        };
        async move { Ok(Box::new(session) as Box<dyn RenderSession>) }.boxed()
    }
}

impl RenderSession for ProbeSession {
    fn navigate<'a>(&'a mut self, url: &'a str) -> BoxFuture<'a, Result<Navigation, FetchError>> {
        async move {
            tokio::time::sleep(self.renderer.delay).await;
            self.url = url.to_string();
            Ok(Navigation {
                final_url: url.to_string(),
                redirect_chain: vec![url.to_string()],
                http_status: Some(200),
            })
        }
        .boxed()
    }

    fn interact(&mut self) -> BoxFuture<'_, ()> {
        async {}.boxed()
    }

    fn content(&mut self) -> BoxFuture<'_, Result<String, FetchError>> {
        let page = self.renderer.page.clone();
        async move { Ok(page) }.boxed()
    }

    fn remediate<'a>(
        &'a mut self,
        _action: &'a RemediationAction,
    ) -> BoxFuture<'a, Result<bool, FetchError>> {
        async { Ok(false) }.boxed()
    }

    fn screenshot(&mut self) -> BoxFuture<'_, Result<Option<Vec<u8>>, FetchError>> {
        let bytes = self.renderer.screenshot.clone();
        async move { Ok(bytes) }.boxed()
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        self.renderer.active.fetch_sub(1, Ordering::SeqCst);
        self.renderer.spans.lock().unwrap().push(Span {
            url: self.url.clone(),
            opened: self.opened,
            closed: Instant::now(),
        });
        async {}.boxed()
    }
}

/// Fetch settings for tests: no human pauses, no screenshots.
#[allow(dead_code)] // Used by other test files
pub fn quiet_fetch_config() -> FetchConfig {
    let mut stealth = FetchConfig::default().stealth;
    stealth.human_behavior = false;
    FetchConfig {
        capture_screenshot: false,
        navigation_timeout: Duration::from_secs(5),
        stealth,
        ..FetchConfig::default()
    }
}

/// Fetcher over `renderer` with a fixed fingerprint and fast retries.
#[allow(dead_code)] // Used by other test files
pub fn test_fetcher(renderer: Arc<dyn Renderer>, stats: Arc<ProcessingStats>) -> SiteFetcher {
    SiteFetcher::new(
        renderer,
        FingerprintPool::new(false, Viewport::new(1280, 720)),
        ChallengeDetector::default().with_remediation(RemediationAction {
            selectors: vec!["button".to_string()],
            settle: Duration::from_millis(1),
        }),
        Arc::new(Deduplicator::new()),
        stats,
    )
    .with_retry(1, Duration::from_millis(1))
}

/// Coordinator over `renderer` with no inter-phase delay.
#[allow(dead_code)] // Used by other test files
pub fn test_coordinator(
    renderer: Arc<dyn Renderer>,
    stats: Arc<ProcessingStats>,
) -> OrchestrationCoordinator {
    let fetcher = test_fetcher(renderer, Arc::clone(&stats));
    OrchestrationCoordinator::new(
        Arc::new(fetcher),
        CertificateAnalyzer::new(Duration::from_secs(2)),
        stats,
    )
    .with_analysis_delay(Duration::ZERO)
}

/// Sink keeping records in memory.
#[allow(dead_code)] // Used by other test files
#[derive(Default)]
pub struct VecSink {
    pub records: Vec<SiteAnalysisRecord>,
    pub finished: bool,
}

impl RecordSink for VecSink {
    fn accept(&mut self, record: SiteAnalysisRecord) -> BoxFuture<'_, anyhow::Result<()>> {
        self.records.push(record);
        async { Ok(()) }.boxed()
    }

    fn finish(&mut self) -> BoxFuture<'_, anyhow::Result<()>> {
        self.finished = true;
        async { Ok(()) }.boxed()
    }
}
