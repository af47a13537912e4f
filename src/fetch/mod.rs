//! Site fetching.
//!
//! This module provides:
//! - The [`Renderer`] / [`RenderSession`] capability the fetch runs on
//! - [`HttpRenderer`], the default reqwest-backed engine
//! - `ChromiumRenderer`, a headless browser engine (`chromium` feature)
//! - [`SiteFetcher`], which drives one session per attempt through
//!   navigation, challenge remediation and capture
//! - Redirect following and company-name extraction

#[cfg(feature = "chromium")]
mod chromium;
mod company;
mod fetcher;
mod http;
mod redirects;
mod renderer;

#[cfg(feature = "chromium")]
pub use chromium::ChromiumRenderer;
pub use company::{domain_name, extract_company_name};
pub use fetcher::{status_for, SiteFetcher};
pub use http::HttpRenderer;
pub use redirects::{follow_redirects, RedirectResolution};
pub use renderer::{Navigation, RenderSession, Renderer};
