//! Records for sites that never reached the coordinator.

use crate::app::UrlRejection;
use crate::config::DEFAULT_USER_AGENT;
use crate::error_handling::FailureKind;
use crate::models::{FetchOutcome, FetchStatus, FetchTask, SiteAnalysisRecord, SiteState};
use crate::orchestrator::{transition, SiteEvent};

use super::controller::TaskFault;

/// Record for an input line that is not a usable URL.
///
/// It is reported like an unreachable site so every input line still yields
/// exactly one record.
pub fn invalid_input_record(
    task: &FetchTask,
    reason: &UrlRejection,
    phase_names: &[String],
) -> SiteAnalysisRecord {
    let mut record = SiteAnalysisRecord::new(task, phase_names);
    record.fetch = Some(FetchOutcome::failed(
        task.url(),
        FetchStatus::NetworkError,
        FailureKind::NetworkFailure,
        "invalid URL",
        task.config().viewport,
        DEFAULT_USER_AGENT,
        0,
    ));
    record.error = Some(format!("invalid URL: {reason}"));

    let mut state = record.state();
    for event in [SiteEvent::Start, SiteEvent::FetchFailed] {
        if let Some(next) = transition(state, event, phase_names.len()) {
            state = next;
        }
    }
    finalize(&mut record, FailureKind::NetworkFailure, state);
    record
}

/// Record for a task whose worker produced nothing.
pub fn fault_record(
    task: &FetchTask,
    fault: &TaskFault,
    phase_names: &[String],
) -> SiteAnalysisRecord {
    let mut record = SiteAnalysisRecord::new(task, phase_names);
    record.error = Some(fault.to_string());
    let kind = match fault {
        TaskFault::NotStarted => FailureKind::Cancelled,
        TaskFault::Panicked(_) | TaskFault::Aborted => FailureKind::Internal,
    };
    finalize(&mut record, kind, SiteState::Aborted);
    record
}

fn finalize(record: &mut SiteAnalysisRecord, kind: FailureKind, state: SiteState) {
    if let Err(e) = record
        .note_failure(kind)
        .and_then(|()| record.set_state(state))
    {
        log::error!("{e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FetchConfig;
    use std::sync::Arc;

    fn task(url: &str) -> FetchTask {
        FetchTask::new(url, "job_r", 3, Arc::new(FetchConfig::default()))
    }

    #[test]
    fn test_invalid_input_record_is_done_network_error() {
        let record = invalid_input_record(
            &task("ftp://files.test"),
            &UrlRejection::UnsupportedScheme("ftp".into()),
            &["policy".to_string()],
        );
        assert_eq!(record.state(), SiteState::Done);
        assert_eq!(record.index, 3);
        let fetch = record.fetch.as_ref().unwrap();
        assert_eq!(fetch.status, FetchStatus::NetworkError);
        assert_eq!(fetch.error.as_deref(), Some("invalid URL"));
        assert_eq!(record.failures, vec![FailureKind::NetworkFailure]);
        assert!(record.phases[0].is_empty());
        assert_eq!(record.outcome_label(), "network_unreachable");
    }

    #[test]
    fn test_fault_records() {
        let skipped = fault_record(&task("https://a.test/"), &TaskFault::NotStarted, &[]);
        assert_eq!(skipped.state(), SiteState::Aborted);
        assert_eq!(skipped.failures, vec![FailureKind::Cancelled]);

        let panicked = fault_record(
            &task("https://a.test/"),
            &TaskFault::Panicked("boom".into()),
            &[],
        );
        assert_eq!(panicked.state(), SiteState::Aborted);
        assert_eq!(panicked.failures, vec![FailureKind::Internal]);
        assert_eq!(panicked.error.as_deref(), Some("task panicked: boom"));
    }
}
