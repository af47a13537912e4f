//! Batch summary written next to the record file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{FetchStatus, SiteAnalysisRecord};

/// Counts by fetch status and by outcome for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub job_id: String,
    pub total: usize,
    /// Fetch status label (`not_fetched` when the site never got that far).
    pub by_status: BTreeMap<String, usize>,
    /// Outcome label per [`SiteAnalysisRecord::outcome_label`].
    pub by_outcome: BTreeMap<String, usize>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchSummary {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            total: 0,
            by_status: BTreeMap::new(),
            by_outcome: BTreeMap::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, record: &SiteAnalysisRecord) {
        self.total += 1;
        let status = record
            .fetch
            .as_ref()
            .map(|f| f.status.as_str())
            .unwrap_or("not_fetched");
        *self.by_status.entry(status.to_string()).or_insert(0) += 1;
        *self
            .by_outcome
            .entry(record.outcome_label().to_string())
            .or_insert(0) += 1;
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Sites whose fetch ended in `success`.
    pub fn successful(&self) -> usize {
        self.by_status
            .get(FetchStatus::Success.as_str())
            .copied()
            .unwrap_or(0)
    }

    pub fn failed(&self) -> usize {
        self.total - self.successful()
    }

    pub fn aborted(&self) -> usize {
        self.by_outcome.get("aborted").copied().unwrap_or(0)
    }
}

/// Writes `<output_dir>/<job_id>_summary.json` and returns its path.
pub async fn write_summary(output_dir: &Path, summary: &BatchSummary) -> Result<PathBuf> {
    let path = output_dir.join(format!("{}_summary.json", summary.job_id));
    let body = serde_json::to_vec_pretty(summary).context("Failed to serialize batch summary")?;
    tokio::fs::write(&path, body)
        .await
        .with_context(|| format!("Failed to write batch summary: {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::FailureKind;
    use crate::models::{FetchConfig, FetchOutcome, FetchTask, SiteState, Viewport};
    use std::sync::Arc;

    fn record(index: usize, status: Option<FetchStatus>) -> SiteAnalysisRecord {
        let task = FetchTask::new(
            format!("https://site{index}.test/"),
            "job_sum",
            index,
            Arc::new(FetchConfig::default()),
        );
        let mut record = SiteAnalysisRecord::new(&task, &[]);
        if let Some(status) = status {
            let mut outcome = FetchOutcome::failed(
                task.url(),
                status,
                FailureKind::NetworkFailure,
                "x",
                Viewport::new(1, 1),
                "ua",
                0,
            );
            if status == FetchStatus::Success {
                outcome.failure = None;
                outcome.error = None;
            }
            record.fetch = Some(outcome);
        }
        record.set_state(SiteState::Done).unwrap();
        record
    }

    #[test]
    fn test_counts_by_status_and_outcome() {
        let mut summary = BatchSummary::new("job_sum");
        summary.record(&record(0, Some(FetchStatus::Success)));
        summary.record(&record(1, Some(FetchStatus::Success)));
        summary.record(&record(2, Some(FetchStatus::Timeout)));
        summary.record(&record(3, None));

        assert_eq!(summary.total, 4);
        assert_eq!(summary.successful(), 2);
        assert_eq!(summary.failed(), 2);
        assert_eq!(summary.by_status.get("timeout"), Some(&1));
        assert_eq!(summary.by_status.get("not_fetched"), Some(&1));
        assert_eq!(summary.by_outcome.get("complete"), Some(&2));
    }

    #[tokio::test]
    async fn test_write_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut summary = BatchSummary::new("job_sum");
        summary.record(&record(0, Some(FetchStatus::Success)));
        summary.finish();

        let path = write_summary(dir.path(), &summary).await.unwrap();
        assert!(path.ends_with("job_sum_summary.json"));
        let parsed: BatchSummary =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(parsed, summary);
    }
}
