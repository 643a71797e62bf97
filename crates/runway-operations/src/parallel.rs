use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use runway_core::{error::RunwayError, RunwayResult};
use runway_events::{RunwayEvent, TaskStage};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::{progress::next_op_id, types::FailedInfo, ParallelReport, RunwayContext};

type TaskFn = Box<dyn FnOnce() -> RunwayResult<()> + Send + 'static>;

/// A labelled unit of blocking work.
pub struct ParallelTask {
    pub label: String,
    run: TaskFn,
}

impl ParallelTask {
    pub fn new<F>(label: impl Into<String>, run: F) -> Self
    where
        F: FnOnce() -> RunwayResult<()> + Send + 'static,
    {
        Self {
            label: label.into(),
            run: Box::new(run),
        }
    }
}

/// Runs `tasks` on the blocking pool, at most `parallel_limit` at a time.
///
/// Every task runs to completion regardless of the others; failures are
/// collected into the report.
pub async fn run_parallel(
    ctx: &RunwayContext,
    tasks: Vec<ParallelTask>,
    description: &str,
) -> RunwayResult<ParallelReport> {
    let limit = ctx.config().parallel_limit.max(1);
    let total = tasks.len() as u32;
    debug!(count = total, limit, "{}", description);

    let semaphore = Arc::new(Semaphore::new(limit));
    let completed = Arc::new(AtomicU32::new(0));
    let failed_count = Arc::new(AtomicU32::new(0));
    let mut handles = Vec::with_capacity(tasks.len());

    for task in tasks {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| RunwayError::Custom(format!("Task semaphore closed: {err}")))?;
        let events = ctx.events().clone();
        let completed = completed.clone();
        let failed_count = failed_count.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let op_id = next_op_id();
            let ParallelTask { label, run } = task;
            events.emit(RunwayEvent::Task {
                op_id,
                label: label.clone(),
                stage: TaskStage::Started,
            });

            let result = run();
            let stage = match &result {
                Ok(()) => TaskStage::Complete,
                Err(err) => {
                    failed_count.fetch_add(1, Ordering::Relaxed);
                    TaskStage::Failed(err.to_string())
                }
            };
            events.emit(RunwayEvent::Task {
                op_id,
                label: label.clone(),
                stage,
            });

            let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
            events.emit(RunwayEvent::BatchProgress {
                completed: done,
                total,
                failed: failed_count.load(Ordering::Relaxed),
            });

            drop(permit);
            (label, result)
        });
        handles.push(handle);
    }

    let mut report = ParallelReport::default();
    for handle in handles {
        let (label, result) = handle
            .await
            .map_err(|err| RunwayError::Custom(format!("Join handle error: {err}")))?;
        match result {
            Ok(()) => report.completed += 1,
            Err(err) => {
                report.failed.push(FailedInfo {
                    name: label,
                    error: err.to_string(),
                })
            }
        }
    }

    Ok(report)
}
