//! Artifact file naming.

use url::Url;

/// Filesystem-safe label for the host of `url` (`www.` stripped).
///
/// Falls back to `unknown` when the URL has no host.
pub fn domain_label(url: &str) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let label: String = host
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    if label.is_empty() {
        "unknown".to_string()
    } else {
        label
    }
}

/// File stem `<job_id>_<domain>_<epoch>` shared by a site's HTML and
/// screenshot.
pub fn artifact_stem(job_id: &str, url: &str, epoch_secs: i64) -> String {
    let job: String = job_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("{job}_{}_{epoch_secs}", domain_label(url))
}
