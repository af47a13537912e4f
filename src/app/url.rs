//! URL validation and normalization.

use log::warn;
use thiserror::Error;

use crate::config::MAX_URL_LENGTH;

/// Why an input line was not accepted as a target URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlRejection {
    #[error("URL exceeds maximum length ({0} > {max})", max = MAX_URL_LENGTH)]
    TooLong(usize),
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
    #[error("malformed URL: {0}")]
    Malformed(String),
}

/// Validates and normalizes a URL.
///
/// Adds an `https://` prefix when no scheme is given, then checks that the
/// result parses and uses http or https. URLs longer than `MAX_URL_LENGTH`
/// (before or after normalization) are rejected.
pub fn validate_and_normalize_url(url: &str) -> Result<String, UrlRejection> {
    let url = url.trim();
    if url.len() > MAX_URL_LENGTH {
        warn!(
            "Skipping URL exceeding maximum length ({} > {}): {}...",
            url.len(),
            MAX_URL_LENGTH,
            crate::utils::truncate_to_char_boundary(url, 50)
        );
        return Err(UrlRejection::TooLong(url.len()));
    }

    let normalized = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else if let Some((scheme, _)) = url.split_once("://") {
        warn!("Skipping unsupported scheme for URL: {url}");
        return Err(UrlRejection::UnsupportedScheme(scheme.to_string()));
    } else {
        format!("https://{url}")
    };

    if normalized.len() > MAX_URL_LENGTH {
        warn!(
            "Skipping normalized URL exceeding maximum length ({} > {})",
            normalized.len(),
            MAX_URL_LENGTH
        );
        return Err(UrlRejection::TooLong(normalized.len()));
    }

    match url::Url::parse(&normalized) {
        Ok(parsed) => match parsed.scheme() {
            "http" | "https" if parsed.host_str().is_some_and(|h| !h.is_empty()) => Ok(normalized),
            "http" | "https" => {
                warn!("Skipping URL without host: {url}");
                Err(UrlRejection::Malformed("missing host".to_string()))
            }
            other => Err(UrlRejection::UnsupportedScheme(other.to_string())),
        },
        Err(e) => {
            warn!("Skipping invalid URL: {url}");
            Err(UrlRejection::Malformed(e.to_string()))
        }
    }
}
