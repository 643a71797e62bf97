use std::sync::atomic::{AtomicU64, Ordering};

use runway_core::RunwayResult;
use runway_events::{EventSinkHandle, OperationId, RunwayEvent};
use tracing::{debug, warn};

use crate::types::{StepOutcome, StepReport};

/// Generates a unique operation ID.
pub fn next_op_id() -> OperationId {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Creates a callback for [`runway_core::package::PackageManager::install`]
/// that reports completed packages as [`RunwayEvent::InstallProgress`].
pub fn install_progress_bridge(
    events: EventSinkHandle,
    op_id: OperationId,
    total: u32,
) -> impl FnMut(usize) {
    move |completed| {
        events.emit(RunwayEvent::InstallProgress {
            op_id,
            completed: completed as u32,
            total,
        });
    }
}

/// Runs `f` as a named step, emitting start and completion events.
pub fn run_step<T, F>(
    events: &EventSinkHandle,
    op_id: OperationId,
    step: &str,
    f: F,
) -> RunwayResult<T>
where
    F: FnOnce() -> RunwayResult<T>,
{
    debug!(op_id, step, "step started");
    events.emit(RunwayEvent::StepStarted {
        op_id,
        step: step.to_string(),
    });

    let result = f();
    match &result {
        Ok(_) => {
            events.emit(RunwayEvent::StepCompleted {
                op_id,
                step: step.to_string(),
            })
        }
        Err(err) => {
            warn!("{} failed: {}", step, err);
            events.emit(RunwayEvent::StepFailed {
                op_id,
                step: step.to_string(),
                error: err.to_string(),
            });
        }
    }
    result
}

/// Like [`run_step`], but turns the result into a [`StepReport`].
pub fn report_step<F>(events: &EventSinkHandle, op_id: OperationId, step: &str, f: F) -> StepReport
where
    F: FnOnce() -> RunwayResult<()>,
{
    report_optional_step(events, op_id, step, || f().map(|()| None))
}

/// Runs a step that may turn out to have nothing to do. `f` returns the
/// skip reason in that case.
pub fn report_optional_step<F>(
    events: &EventSinkHandle,
    op_id: OperationId,
    step: &str,
    f: F,
) -> StepReport
where
    F: FnOnce() -> RunwayResult<Option<String>>,
{
    debug!(op_id, step, "step started");
    events.emit(RunwayEvent::StepStarted {
        op_id,
        step: step.to_string(),
    });

    let outcome = match f() {
        Ok(None) => {
            events.emit(RunwayEvent::StepCompleted {
                op_id,
                step: step.to_string(),
            });
            StepOutcome::Completed
        }
        Ok(Some(reason)) => {
            events.emit(RunwayEvent::StepSkipped {
                op_id,
                step: step.to_string(),
                reason: reason.clone(),
            });
            StepOutcome::Skipped(reason)
        }
        Err(err) => {
            warn!("{} failed: {}", step, err);
            let error = err.to_string();
            events.emit(RunwayEvent::StepFailed {
                op_id,
                step: step.to_string(),
                error: error.clone(),
            });
            StepOutcome::Failed(error)
        }
    };

    StepReport {
        step: step.to_string(),
        outcome,
    }
}

pub fn skip_step(
    events: &EventSinkHandle,
    op_id: OperationId,
    step: &str,
    reason: impl Into<String>,
) -> StepReport {
    let reason = reason.into();
    debug!(op_id, step, reason = %reason, "step skipped");
    events.emit(RunwayEvent::StepSkipped {
        op_id,
        step: step.to_string(),
        reason: reason.clone(),
    });
    StepReport {
        step: step.to_string(),
        outcome: StepOutcome::Skipped(reason),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use runway_core::error::RunwayError;
    use runway_events::CollectorSink;

    use super::*;

    #[test]
    fn test_next_op_id_is_unique() {
        let id1 = next_op_id();
        let id2 = next_op_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_install_progress_bridge() {
        let collector = Arc::new(CollectorSink::default());
        let mut bridge = install_progress_bridge(collector.clone(), 7, 3);
        bridge(1);
        bridge(3);

        let events = collector.events();
        assert!(matches!(
            events[1],
            RunwayEvent::InstallProgress {
                op_id: 7,
                completed: 3,
                total: 3
            }
        ));
    }

    #[test]
    fn test_run_step_events() {
        let collector = Arc::new(CollectorSink::default());
        let events: EventSinkHandle = collector.clone();

        let ok = report_step(&events, 1, "timezone", || Ok(()));
        assert_eq!(ok.outcome, StepOutcome::Completed);

        let failed = report_step(&events, 1, "locale", || {
            Err(RunwayError::ToolMissing("locale-gen".into()))
        });
        assert!(matches!(failed.outcome, StepOutcome::Failed(ref e) if e.contains("locale-gen")));

        let skipped = skip_step(&events, 1, "hostname", "not configured");
        assert_eq!(skipped.outcome, StepOutcome::Skipped("not configured".into()));

        let events = collector.events();
        assert_eq!(events.len(), 5);
        assert!(matches!(events[2], RunwayEvent::StepStarted { ref step, .. } if step == "locale"));
        assert!(matches!(events[0], RunwayEvent::StepStarted { ref step, .. } if step == "timezone"));
        assert!(matches!(events[1], RunwayEvent::StepCompleted { .. }));
        assert!(matches!(events[3], RunwayEvent::StepFailed { .. }));
        assert!(matches!(events[4], RunwayEvent::StepSkipped { .. }));
    }

    #[test]
    fn test_optional_step_skips_after_start() {
        let collector = Arc::new(CollectorSink::default());
        let events: EventSinkHandle = collector.clone();

        let report = report_optional_step(&events, 9, "swap", || {
            Ok(Some("swap already configured".to_string()))
        });
        assert_eq!(
            report.outcome,
            StepOutcome::Skipped("swap already configured".into())
        );
        assert!(!report.is_failed());

        let events = collector.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], RunwayEvent::StepStarted { op_id: 9, .. }));
        assert!(matches!(
            events[1],
            RunwayEvent::StepSkipped { ref reason, .. } if reason == "swap already configured"
        ));
    }
}
