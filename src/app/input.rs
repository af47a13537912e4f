//! Input URL list loading.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use super::url::{validate_and_normalize_url, UrlRejection};

/// One target line from the input, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputUrl {
    /// The line as given (trimmed).
    pub raw: String,
    pub normalized: Result<String, UrlRejection>,
}

impl InputUrl {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_string();
        let normalized = validate_and_normalize_url(&raw);
        Self { raw, normalized }
    }

    /// URL to stamp on the record: the normalized one, or the raw line.
    pub fn target(&self) -> &str {
        self.normalized.as_deref().unwrap_or(&self.raw)
    }
}

/// Whether a line holds a URL (not blank, not a `#` comment).
fn is_url_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

async fn read_lines<R: AsyncBufRead + Unpin>(reader: R) -> Result<Vec<InputUrl>> {
    let mut lines = reader.lines();
    let mut inputs = Vec::new();
    while let Some(line) = lines.next_line().await.context("Failed to read input line")? {
        if is_url_line(&line) {
            inputs.push(InputUrl::parse(&line));
        }
    }
    Ok(inputs)
}

/// Reads targets from `file` (`-` for stdin), followed by `extra` URLs.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub async fn load_inputs(file: Option<&Path>, extra: &[String]) -> Result<Vec<InputUrl>> {
    let mut inputs = match file {
        Some(path) if path.as_os_str() == "-" => {
            log::info!("Reading URLs from stdin");
            read_lines(BufReader::new(tokio::io::stdin())).await?
        }
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input file: {}", path.display()))?;
            read_lines(BufReader::new(file)).await?
        }
        None => Vec::new(),
    };

    inputs.extend(extra.iter().filter(|u| is_url_line(u)).map(|u| InputUrl::parse(u)));

    let rejected = inputs.iter().filter(|i| i.normalized.is_err()).count();
    log::info!("Loaded {} URL(s), {} rejected", inputs.len(), rejected);
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_skips_blank_and_comment_lines() {
        let text = "example.com\n\n# comment\n   \nhttps://acme.test/path\n";
        let inputs = read_lines(text.as_bytes()).await.unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].target(), "https://example.com");
        assert_eq!(inputs[1].target(), "https://acme.test/path");
    }

    #[tokio::test]
    async fn test_rejected_lines_are_kept_in_order() {
        let text = "ftp://files.test\nexample.com\n";
        let inputs = read_lines(text.as_bytes()).await.unwrap();
        assert_eq!(inputs.len(), 2);
        assert!(inputs[0].normalized.is_err());
        assert_eq!(inputs[0].target(), "ftp://files.test");
        assert!(inputs[1].normalized.is_ok());
    }

    #[tokio::test]
    async fn test_load_inputs_from_file_and_extras() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "a.test\n# skip\nb.test\n").unwrap();

        let inputs = load_inputs(Some(&path), &["c.test".to_string(), " ".to_string()])
            .await
            .unwrap();
        let targets: Vec<&str> = inputs.iter().map(InputUrl::target).collect();
        assert_eq!(targets, vec!["https://a.test", "https://b.test", "https://c.test"]);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let result = load_inputs(Some(Path::new("/nonexistent/urls.txt")), &[]).await;
        assert!(result.is_err());
    }
}
