//! The rendering capability behind the fetcher.
//!
//! A [`Renderer`] opens one [`RenderSession`] per fetch attempt. Sessions are
//! driven step by step by [`crate::fetch::SiteFetcher`], so the engine can be
//! swapped without touching the fetch algorithm or the coordinator.

use futures::future::BoxFuture;

use crate::challenge::RemediationAction;
use crate::error_handling::FetchError;
use crate::fingerprint::FingerprintProfile;
use crate::models::FetchConfig;

/// Where a navigation ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub final_url: String,
    /// Every URL visited, starting with the requested one.
    pub redirect_chain: Vec<String>,
    pub http_status: Option<u16>,
}

impl Navigation {
    pub fn redirected(&self) -> bool {
        self.redirect_chain.len() > 1
    }
}

/// A rendering engine able to open isolated sessions.
pub trait Renderer: Send + Sync {
    /// Short engine name for logs and records.
    fn name(&self) -> &'static str;

    /// Opens a session presenting `fingerprint`. Automation overrides must be
    /// in place before this returns, so that no navigation runs without them.
    fn open<'a>(
        &'a self,
        fingerprint: &'a FingerprintProfile,
        config: &'a FetchConfig,
    ) -> BoxFuture<'a, Result<Box<dyn RenderSession>, FetchError>>;
}

/// One isolated browsing context.
pub trait RenderSession: Send {
    /// Navigates to `url`, following redirects up to the configured cap.
    fn navigate<'a>(&'a mut self, url: &'a str) -> BoxFuture<'a, Result<Navigation, FetchError>>;

    /// Minimal human-like activity on the current page.
    fn interact(&mut self) -> BoxFuture<'_, ()>;

    /// Current document HTML.
    fn content(&mut self) -> BoxFuture<'_, Result<String, FetchError>>;

    /// Tries once to get past a challenge. Returns whether a control was
    /// actually interacted with.
    fn remediate<'a>(
        &'a mut self,
        action: &'a RemediationAction,
    ) -> BoxFuture<'a, Result<bool, FetchError>>;

    /// Full-page PNG, or `None` when the engine cannot take screenshots.
    fn screenshot(&mut self) -> BoxFuture<'_, Result<Option<Vec<u8>>, FetchError>>;

    /// Releases engine resources.
    fn close(self: Box<Self>) -> BoxFuture<'static, ()>;
}
