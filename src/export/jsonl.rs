//! JSONL record sink.
//!
//! Writes `<output_dir>/<job_id>.jsonl`, one JSON object per site. HTML and
//! screenshots are written under `html/` and `screenshots/` and referenced by
//! relative path; identical screenshots (same content hash) share one file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::models::SiteAnalysisRecord;

use super::artifacts::artifact_stem;
use super::RecordSink;

const HTML_DIR: &str = "html";
const SCREENSHOT_DIR: &str = "screenshots";

/// Where a record's binary payloads ended up, relative to the output directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifacts {
    pub html_path: Option<String>,
    pub html_size: Option<usize>,
    pub screenshot_path: Option<String>,
    pub screenshot_hash: Option<String>,
}

/// One exported line.
#[derive(Debug, Serialize)]
pub struct ExportedRecord<'a> {
    #[serde(flatten)]
    pub record: &'a SiteAnalysisRecord,
    pub outcome: &'static str,
    pub artifacts: StoredArtifacts,
}

pub struct JsonlSink {
    output_dir: PathBuf,
    records_path: PathBuf,
    writer: BufWriter<File>,
    screenshots_by_hash: HashMap<String, String>,
    written: usize,
}

impl JsonlSink {
    /// Creates the output layout and the record file for `job_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory or the record file cannot be created.
    pub async fn create(output_dir: &Path, job_id: &str) -> Result<Self> {
        for dir in [HTML_DIR, SCREENSHOT_DIR] {
            let path = output_dir.join(dir);
            tokio::fs::create_dir_all(&path)
                .await
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        }

        let records_path = output_dir.join(format!("{job_id}.jsonl"));
        let file = File::create(&records_path)
            .await
            .with_context(|| format!("Failed to create record file: {}", records_path.display()))?;

        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            records_path,
            writer: BufWriter::new(file),
            screenshots_by_hash: HashMap::new(),
            written: 0,
        })
    }

    pub fn records_path(&self) -> &Path {
        &self.records_path
    }

    /// Records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Moves HTML and screenshot bytes out of the record onto disk.
    ///
    /// Write failures are logged and leave the corresponding path empty; the
    /// record itself is still exported.
    async fn store_artifacts(&mut self, record: &mut SiteAnalysisRecord) -> StoredArtifacts {
        let mut stored = StoredArtifacts::default();
        let Some(fetch) = record.fetch.as_mut() else {
            return stored;
        };

        let html = fetch.html.take();
        let screenshot = fetch.screenshot.take();
        stored.screenshot_hash = fetch.screenshot_hash.clone();
        if html.is_none() && screenshot.is_none() {
            return stored;
        }

        let stem = self
            .unique_stem(&record.job_id, &fetch.final_url, record.index)
            .await;

        if let Some(html) = html {
            let relative = format!("{HTML_DIR}/{stem}.html");
            match tokio::fs::write(self.output_dir.join(&relative), html.as_bytes()).await {
                Ok(()) => {
                    stored.html_size = Some(html.len());
                    stored.html_path = Some(relative);
                }
                Err(e) => log::warn!("Failed to write HTML for {}: {e}", record.original_url),
            }
        }

        if let Some(bytes) = screenshot {
            let known = stored
                .screenshot_hash
                .as_ref()
                .and_then(|hash| self.screenshots_by_hash.get(hash))
                .cloned();
            match known {
                Some(relative) => stored.screenshot_path = Some(relative),
                None => {
                    let relative = format!("{SCREENSHOT_DIR}/{stem}.png");
                    match tokio::fs::write(self.output_dir.join(&relative), &bytes).await {
                        Ok(()) => {
                            if let Some(hash) = &stored.screenshot_hash {
                                self.screenshots_by_hash
                                    .insert(hash.clone(), relative.clone());
                            }
                            stored.screenshot_path = Some(relative);
                        }
                        Err(e) => {
                            log::warn!("Failed to write screenshot for {}: {e}", record.original_url)
                        }
                    }
                }
            }
        }

        stored
    }

    /// Stem for a site's artifacts, suffixed with the input index when the
    /// plain name is already taken (same domain within the same second).
    async fn unique_stem(&self, job_id: &str, url: &str, index: usize) -> String {
        let stem = artifact_stem(job_id, url, Utc::now().timestamp());
        let taken = tokio::fs::try_exists(self.output_dir.join(format!("{HTML_DIR}/{stem}.html")))
            .await
            .unwrap_or(false)
            || tokio::fs::try_exists(self.output_dir.join(format!("{SCREENSHOT_DIR}/{stem}.png")))
                .await
                .unwrap_or(false);
        if taken {
            format!("{stem}_{index}")
        } else {
            stem
        }
    }
}

impl RecordSink for JsonlSink {
    fn accept(&mut self, mut record: SiteAnalysisRecord) -> BoxFuture<'_, Result<()>> {
        async move {
            let artifacts = self.store_artifacts(&mut record).await;
            let line = serde_json::to_string(&ExportedRecord {
                record: &record,
                outcome: record.outcome_label(),
                artifacts,
            })
            .with_context(|| format!("Failed to serialize record for {}", record.original_url))?;

            self.writer.write_all(line.as_bytes()).await?;
            self.writer.write_all(b"\n").await?;
            self.written += 1;
            Ok(())
        }
        .boxed()
    }

    fn finish(&mut self) -> BoxFuture<'_, Result<()>> {
        async move {
            self.writer
                .flush()
                .await
                .with_context(|| format!("Failed to flush {}", self.records_path.display()))
        }
        .boxed()
    }
}
