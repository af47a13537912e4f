//! Persistence boundary.
//!
//! Every finalized [`crate::models::SiteAnalysisRecord`] is handed to a
//! [`RecordSink`] exactly once. The bundled [`JsonlSink`] writes one JSON
//! object per line and stores HTML and screenshots as separate files
//! referenced by relative path.

mod artifacts;
mod jsonl;
mod summary;

use futures::future::BoxFuture;

use crate::models::SiteAnalysisRecord;

pub use artifacts::{artifact_stem, domain_label};
pub use jsonl::{ExportedRecord, JsonlSink, StoredArtifacts};
pub use summary::{write_summary, BatchSummary};

/// Receives finalized records.
pub trait RecordSink: Send {
    /// Stores one record. Raw HTML and screenshot bytes travel inside the
    /// record's fetch outcome.
    fn accept(&mut self, record: SiteAnalysisRecord) -> BoxFuture<'_, anyhow::Result<()>>;

    /// Flushes buffered output. Called once after the last record.
    fn finish(&mut self) -> BoxFuture<'_, anyhow::Result<()>>;
}
