//! Headless Chromium renderer (`chromium` feature).
//!
//! One browser process per batch, one tab per session. Stealth overrides
//! (init script, user agent, headers, viewport) are applied to the tab before
//! it navigates anywhere.

use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EventRequestWillBeSent, EventResponseReceived, Headers, ResourceType,
    SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use rand::Rng;
use tokio::task::JoinHandle;

use crate::challenge::RemediationAction;
use crate::config::{HUMAN_DELAY_MAX_MS, HUMAN_DELAY_MIN_MS};
use crate::error_handling::{FetchError, InitializationError};
use crate::fingerprint::FingerprintProfile;
use crate::models::{FetchConfig, Viewport};

use super::redirects::enforce_redirect_cap;
use super::renderer::{Navigation, RenderSession, Renderer};

fn classify_cdp_error(e: &CdpError, timeout_secs: u64) -> FetchError {
    let message = e.to_string();
    let lowered = message.to_lowercase();
    if matches!(e, CdpError::Timeout)
        || lowered.contains("timeout")
        || lowered.contains("timed out")
    {
        FetchError::Timeout(timeout_secs)
    } else if lowered.contains("net::err_") {
        FetchError::Network(message)
    } else {
        FetchError::Other(message)
    }
}

/// Chromium renderer sharing one browser process across sessions.
pub struct ChromiumRenderer {
    browser: Arc<Browser>,
    handler: JoinHandle<()>,
}

impl ChromiumRenderer {
    /// Launches headless Chromium. `CHROME_PATH` selects the executable when set.
    ///
    /// # Errors
    ///
    /// Returns `InitializationError::BrowserError` if the browser cannot be started.
    pub async fn launch(default_viewport: Viewport) -> Result<Self, InitializationError> {
        let mut builder = BrowserConfig::builder()
            .window_size(default_viewport.width, default_viewport.height)
            .no_sandbox()
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--mute-audio")
            .arg("--hide-scrollbars");

        if let Ok(path) = std::env::var("CHROME_PATH") {
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|e| {
                InitializationError::BrowserError(format!("Failed to build browser config: {e}"))
            })?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| {
                InitializationError::BrowserError(format!("Failed to launch browser: {e}"))
            })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::debug!("Browser handler error: {e}");
                }
            }
        });

        log::info!("Headless Chromium launched");
        Ok(Self {
            browser: Arc::new(browser),
            handler,
        })
    }

    /// Closes the browser process. Sessions still open are torn down with it.
    pub async fn shutdown(self) {
        if let Ok(mut browser) = Arc::try_unwrap(self.browser) {
            if let Err(e) = browser.close().await {
                log::warn!("Failed to close browser: {e}");
            }
        }
        self.handler.abort();
    }

    async fn prepare_page(
        &self,
        fingerprint: &FingerprintProfile,
    ) -> Result<Page, CdpError> {
        let page = self.browser.new_page("about:blank").await?;

        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(
            fingerprint.init_script(),
        ))
        .await?;

        let mut user_agent = SetUserAgentOverrideParams::new(fingerprint.user_agent.clone());
        user_agent.accept_language = Some(fingerprint.accept_language.clone());
        user_agent.platform = Some(fingerprint.platform().to_string());
        page.execute(user_agent).await?;

        page.execute(SetExtraHttpHeadersParams::new(Headers::new(
            serde_json::json!({ "Accept-Language": fingerprint.accept_language }),
        )))
        .await?;

        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(fingerprint.viewport.width),
            i64::from(fingerprint.viewport.height),
            1.0,
            false,
        ))
        .await?;

        Ok(page)
    }
}

impl Renderer for ChromiumRenderer {
    fn name(&self) -> &'static str {
        "chromium"
    }

    fn open<'a>(
        &'a self,
        fingerprint: &'a FingerprintProfile,
        config: &'a FetchConfig,
    ) -> BoxFuture<'a, Result<Box<dyn RenderSession>, FetchError>> {
        async move {
            let page = self
                .prepare_page(fingerprint)
                .await
                .map_err(|e| FetchError::Other(format!("failed to open tab: {e}")))?;
            Ok(Box::new(ChromiumSession {
                page,
                max_redirects: config.max_redirects,
                timeout_secs: config.navigation_timeout.as_secs(),
            }) as Box<dyn RenderSession>)
        }
        .boxed()
    }
}

struct ChromiumSession {
    page: Page,
    max_redirects: usize,
    timeout_secs: u64,
}

impl ChromiumSession {
    fn cdp_error(&self, e: &CdpError) -> FetchError {
        classify_cdp_error(e, self.timeout_secs)
    }
}

impl RenderSession for ChromiumSession {
    /// Chromium follows redirects itself. The chain is rebuilt from the
    /// document request events of the navigation and the hop cap is applied
    /// to it afterwards.
    fn navigate<'a>(&'a mut self, url: &'a str) -> BoxFuture<'a, Result<Navigation, FetchError>> {
        async move {
            let mut requests = self
                .page
                .event_listener::<EventRequestWillBeSent>()
                .await
                .map_err(|e| self.cdp_error(&e))?;
            let mut responses = self
                .page
                .event_listener::<EventResponseReceived>()
                .await
                .map_err(|e| self.cdp_error(&e))?;

            self.page.goto(url).await.map_err(|e| self.cdp_error(&e))?;
            let final_url = self
                .page
                .url()
                .await
                .map_err(|e| self.cdp_error(&e))?
                .unwrap_or_else(|| url.to_string());

            // A redirect reuses the request id of the document it replaces.
            let mut document_id = None;
            let mut redirect_chain = vec![url.to_string()];
            while let Some(Some(event)) = requests.next().now_or_never() {
                if event.r#type != Some(ResourceType::Document) {
                    continue;
                }
                match &document_id {
                    None => document_id = Some(event.request_id.clone()),
                    Some(id) if *id == event.request_id && event.redirect_response.is_some() => {
                        redirect_chain.push(event.request.url.clone());
                    }
                    Some(_) => {}
                }
            }
            if redirect_chain.last().map(|last| last.trim_end_matches('/'))
                != Some(final_url.trim_end_matches('/'))
            {
                redirect_chain.push(final_url.clone());
            }
            let redirect_chain = enforce_redirect_cap(redirect_chain, self.max_redirects)?;

            let mut http_status = None;
            while let Some(Some(event)) = responses.next().now_or_never() {
                if Some(&event.request_id) == document_id.as_ref() {
                    http_status = u16::try_from(event.response.status).ok();
                }
            }

            Ok(Navigation {
                final_url,
                redirect_chain,
                http_status,
            })
        }
        .boxed()
    }

    fn interact(&mut self) -> BoxFuture<'_, ()> {
        async move {
            let (pause, scroll, x, y) = {
                let mut rng = rand::rng();
                (
                    rng.random_range(HUMAN_DELAY_MIN_MS..=HUMAN_DELAY_MAX_MS),
                    rng.random_range(180..620),
                    rng.random_range(80..900),
                    rng.random_range(80..700),
                )
            };
            tokio::time::sleep(Duration::from_millis(pause)).await;
            let _ = self
                .page
                .evaluate(format!("window.scrollBy({{top: {scroll}, behavior: 'smooth'}});"))
                .await;
            let _ = self
                .page
                .evaluate(format!(
                    "document.dispatchEvent(new MouseEvent('mousemove', {{clientX: {x}, clientY: {y}, bubbles: true}}));"
                ))
                .await;
        }
        .boxed()
    }

    fn content(&mut self) -> BoxFuture<'_, Result<String, FetchError>> {
        async move { self.page.content().await.map_err(|e| self.cdp_error(&e)) }.boxed()
    }

    fn remediate<'a>(
        &'a mut self,
        action: &'a RemediationAction,
    ) -> BoxFuture<'a, Result<bool, FetchError>> {
        async move {
            let mut clicked = false;
            for selector in &action.selectors {
                if let Ok(element) = self.page.find_element(selector.as_str()).await {
                    if element.click().await.is_ok() {
                        log::debug!("Clicked challenge control {selector}");
                        clicked = true;
                        break;
                    }
                }
            }
            tokio::time::sleep(action.settle).await;
            Ok(clicked)
        }
        .boxed()
    }

    fn screenshot(&mut self) -> BoxFuture<'_, Result<Option<Vec<u8>>, FetchError>> {
        async move {
            let params = ScreenshotParams::builder().full_page(true).build();
            self.page
                .screenshot(params)
                .await
                .map(Some)
                .map_err(|e| self.cdp_error(&e))
        }
        .boxed()
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        async move {
            if let Err(e) = self.page.close().await {
                log::debug!("Failed to close tab: {e}");
            }
        }
        .boxed()
    }
}
