//! HTTP redirect chain following.
//!
//! Redirects are followed manually so the full chain is recorded and the
//! hop cap is enforced: a chain longer than the cap is a failure.

use reqwest::header::LOCATION;
use reqwest::{RequestBuilder, Response, StatusCode, Url};

use crate::error_handling::FetchError;

/// A response together with the URLs visited to reach it.
#[derive(Debug)]
pub struct RedirectResolution {
    pub response: Response,
    /// Every URL requested, the first one included.
    pub chain: Vec<String>,
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

/// Maps a transport error to the fetch taxonomy.
pub fn classify_reqwest_error(e: &reqwest::Error, timeout_secs: u64) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(timeout_secs)
    } else if e.is_builder() {
        FetchError::InvalidUrl(e.to_string())
    } else {
        FetchError::Network(format!("{e:#}"))
    }
}

/// Enforces the hop cap on a chain recorded by an engine that follows
/// redirects itself. `chain` starts with the requested URL.
///
/// # Errors
///
/// `FetchError::RedirectLimit` naming the first hop past the cap.
#[cfg_attr(not(feature = "chromium"), allow(dead_code))]
pub(crate) fn enforce_redirect_cap(
    chain: Vec<String>,
    max_redirects: usize,
) -> Result<Vec<String>, FetchError> {
    match chain.get(max_redirects + 1) {
        Some(last) => Err(FetchError::RedirectLimit {
            max: max_redirects,
            last: last.clone(),
        }),
        None => Ok(chain),
    }
}

/// Follows redirects from `start_url`, allowing at most `max_redirects` hops.
///
/// `request` builds the request for each hop, so callers can attach their
/// headers. A redirect status without a `Location` header ends the chain.
///
/// # Errors
///
/// `FetchError::RedirectLimit` when hop `max_redirects + 1` is requested,
/// `FetchError::InvalidUrl` for an unparseable target, and network errors
/// from the transport.
pub async fn follow_redirects<F>(
    start_url: &str,
    max_redirects: usize,
    timeout_secs: u64,
    request: F,
) -> Result<RedirectResolution, FetchError>
where
    F: Fn(&Url) -> RequestBuilder,
{
    let mut current =
        Url::parse(start_url).map_err(|e| FetchError::InvalidUrl(format!("{start_url}: {e}")))?;
    let mut chain = vec![current.to_string()];

    loop {
        let response = request(&current)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e, timeout_secs))?;

        let status = response.status();
        if !is_redirect(status) {
            return Ok(RedirectResolution { response, chain });
        }

        let Some(location) = response
            .headers()
            .get(LOCATION)
            .and_then(|loc| loc.to_str().ok())
        else {
            log::warn!(
                "Redirect status {} for {} but no Location header",
                status.as_u16(),
                current
            );
            return Ok(RedirectResolution { response, chain });
        };

        let next = current
            .join(location)
            .map_err(|e| FetchError::InvalidUrl(format!("{location}: {e}")))?;

        if chain.len() > max_redirects {
            return Err(FetchError::RedirectLimit {
                max: max_redirects,
                last: next.to_string(),
            });
        }

        log::debug!("Redirect {} -> {}", current, next);
        chain.push(next.to_string());
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(hops: usize) -> Vec<String> {
        (0..=hops).map(|i| format!("https://hop{i}.example/")).collect()
    }

    #[test]
    fn test_chain_within_cap_is_kept() {
        let recorded = chain(3);
        assert_eq!(enforce_redirect_cap(recorded.clone(), 3).unwrap(), recorded);
        assert_eq!(enforce_redirect_cap(chain(0), 1).unwrap().len(), 1);
    }

    #[test]
    fn test_chain_past_cap_names_first_excess_hop() {
        match enforce_redirect_cap(chain(4), 2) {
            Err(FetchError::RedirectLimit { max, last }) => {
                assert_eq!(max, 2);
                assert_eq!(last, "https://hop3.example/");
            }
            other => panic!("expected redirect limit, got {other:?}"),
        }
    }
}
