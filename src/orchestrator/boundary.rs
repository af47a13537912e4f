//! Traits at the downstream analysis boundary.
//!
//! Both are object-safe so the coordinator can hold any mix of providers as
//! `Arc<dyn ...>`. Implementations see the record as it stands when they are
//! called (fetch, certificate and bot-protection results filled in).

use futures::future::BoxFuture;

use crate::error_handling::PhaseError;
use crate::models::{ContinueDecision, SiteAnalysisRecord};

/// One downstream analysis phase (policy review, trademark review, ...).
///
/// Returning [`PhaseError::MissingInput`] marks the phase as not applicable
/// for the site; it is not counted as a failure.
pub trait AnalysisPhase: Send + Sync {
    /// Stable name used for the record slot.
    fn name(&self) -> &str;

    fn analyze<'a>(
        &'a self,
        record: &'a SiteAnalysisRecord,
    ) -> BoxFuture<'a, Result<serde_json::Value, PhaseError>>;
}

/// External continue/skip judgment taken before downstream analysis.
pub trait ContinueDecider: Send + Sync {
    fn decide<'a>(
        &'a self,
        record: &'a SiteAnalysisRecord,
    ) -> BoxFuture<'a, Result<ContinueDecision, PhaseError>>;
}
