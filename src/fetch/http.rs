//! Renderer backed by the shared reqwest client.
//!
//! It fetches documents rather than rendering them: no script runs and no
//! screenshot is taken. Fingerprint headers are sent on every hop and the
//! interaction step is a bounded random pause.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use rand::Rng;
use reqwest::header::USER_AGENT;

use crate::challenge::RemediationAction;
use crate::config::{HUMAN_DELAY_MAX_MS, HUMAN_DELAY_MIN_MS};
use crate::error_handling::FetchError;
use crate::fingerprint::FingerprintProfile;
use crate::models::FetchConfig;
use crate::utils::truncate_to_char_boundary;

use super::redirects::{classify_reqwest_error, follow_redirects};
use super::renderer::{Navigation, RenderSession, Renderer};

/// Plain HTTP renderer.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Arc<reqwest::Client>,
}

impl HttpRenderer {
    /// `client` must have redirects disabled (see [`crate::initialization::init_client`]).
    pub fn new(client: Arc<reqwest::Client>) -> Self {
        Self { client }
    }
}

impl Renderer for HttpRenderer {
    fn name(&self) -> &'static str {
        "http"
    }

    fn open<'a>(
        &'a self,
        fingerprint: &'a FingerprintProfile,
        config: &'a FetchConfig,
    ) -> BoxFuture<'a, Result<Box<dyn RenderSession>, FetchError>> {
        let session = HttpSession {
            client: Arc::clone(&self.client),
            user_agent: fingerprint.user_agent.clone(),
            headers: fingerprint.headers(),
            max_redirects: config.max_redirects,
            max_html_bytes: config.max_html_bytes,
            timeout_secs: config.navigation_timeout.as_secs(),
            current_url: None,
            html: None,
        };
        async move { Ok(Box::new(session) as Box<dyn RenderSession>) }.boxed()
    }
}

struct HttpSession {
    client: Arc<reqwest::Client>,
    user_agent: String,
    headers: Vec<(&'static str, String)>,
    max_redirects: usize,
    max_html_bytes: usize,
    timeout_secs: u64,
    current_url: Option<String>,
    html: Option<String>,
}

impl HttpSession {
    async fn load(&mut self, url: &str) -> Result<Navigation, FetchError> {
        let resolution = follow_redirects(url, self.max_redirects, self.timeout_secs, |target| {
            let mut request = self
                .client
                .get(target.clone())
                .header(USER_AGENT, self.user_agent.as_str());
            for (name, value) in &self.headers {
                request = request.header(*name, value.as_str());
            }
            request
        })
        .await?;

        let mut response = resolution.response;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        // Bounded read: stop pulling chunks once the cap is reached.
        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| classify_reqwest_error(&e, self.timeout_secs))?
        {
            body.extend_from_slice(&chunk);
            if body.len() >= self.max_html_bytes {
                break;
            }
        }
        let text = String::from_utf8_lossy(&body);
        let html = truncate_to_char_boundary(&text, self.max_html_bytes).to_string();

        self.current_url = Some(final_url.clone());
        self.html = Some(html);

        Ok(Navigation {
            final_url,
            redirect_chain: resolution.chain,
            http_status: Some(status),
        })
    }
}

impl RenderSession for HttpSession {
    fn navigate<'a>(&'a mut self, url: &'a str) -> BoxFuture<'a, Result<Navigation, FetchError>> {
        self.load(url).boxed()
    }

    fn interact(&mut self) -> BoxFuture<'_, ()> {
        let pause = rand::rng().random_range(HUMAN_DELAY_MIN_MS..=HUMAN_DELAY_MAX_MS);
        tokio::time::sleep(Duration::from_millis(pause)).boxed()
    }

    fn content(&mut self) -> BoxFuture<'_, Result<String, FetchError>> {
        let html = self.html.clone();
        async move { html.ok_or_else(|| FetchError::Other("no document loaded".to_string())) }
            .boxed()
    }

    fn remediate<'a>(
        &'a mut self,
        action: &'a RemediationAction,
    ) -> BoxFuture<'a, Result<bool, FetchError>> {
        async move {
            // Nothing to click without a DOM: wait out the interstitial and reload.
            tokio::time::sleep(action.settle).await;
            let Some(url) = self.current_url.clone() else {
                return Ok(false);
            };
            self.load(&url).await?;
            Ok(false)
        }
        .boxed()
    }

    fn screenshot(&mut self) -> BoxFuture<'_, Result<Option<Vec<u8>>, FetchError>> {
        async { Ok(None) }.boxed()
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        async {}.boxed()
    }
}
