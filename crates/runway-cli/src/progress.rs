use std::{
    collections::HashMap,
    sync::{mpsc::Receiver, Arc, LazyLock},
    time::Duration,
};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use nu_ansi_term::Color::{Cyan, Green, Red, Yellow};
use runway_events::{
    ArchiveStage, LogLevel, OperationId, PackageStage, RunwayEvent,
};
use tracing::{debug, error, info, warn};

use crate::utils::{progress_enabled, Colored, Icons};

/// Shared MultiProgress instance for suspend/stop from other modules.
static MULTI: LazyLock<Arc<MultiProgress>> = LazyLock::new(|| Arc::new(MultiProgress::new()));

/// Pause progress display, run the closure, then resume.
pub fn suspend<F: FnOnce()>(f: F) {
    MULTI.suspend(f);
}

/// Stop and clear all progress bars.
pub fn stop() {
    MULTI.clear().ok();
}

/// Owns the background thread started by [`spawn_event_handler`].
///
/// Drop the `RunwayContext` holding the channel sender before calling
/// [`finish`](ProgressGuard::finish), or the join never returns.
pub struct ProgressGuard {
    handle: Option<std::thread::JoinHandle<()>>,
}

impl ProgressGuard {
    pub fn finish(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}  {wide_bar:.cyan/dim}  {pos}/{len}")
        .map(|style| style.progress_chars("━━─"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = if progress_enabled() {
        MULTI.add(ProgressBar::new_spinner())
    } else {
        MULTI.add(ProgressBar::hidden())
    };
    pb.set_style(spinner_style());
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn create_bar(msg: &str, total: u64) -> ProgressBar {
    let pb = if progress_enabled() {
        MULTI.add(ProgressBar::new(total))
    } else {
        MULTI.add(ProgressBar::hidden())
    };
    pb.set_style(bar_style());
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn print_line(icon: Colored<&str>, subject: &str, detail: &str) {
    MULTI.suspend(|| {
        eprintln!(" {} {}: {}", icon, Colored(Cyan, subject), detail);
    });
}

/// Spawn a background thread that maps [`RunwayEvent`]s to progress output.
///
/// Steps get a spinner each, cleared with a one-line verdict when they end.
/// Package installs share one bar per operation.
pub fn spawn_event_handler(receiver: Receiver<RunwayEvent>) -> ProgressGuard {
    let handle = std::thread::spawn(move || {
        let mut steps: HashMap<(OperationId, String), ProgressBar> = HashMap::new();
        let mut installs: HashMap<OperationId, ProgressBar> = HashMap::new();
        let mut archives: HashMap<OperationId, ProgressBar> = HashMap::new();
        let mut batch_job: Option<ProgressBar> = None;

        while let Ok(event) = receiver.recv() {
            match event {
                RunwayEvent::StepStarted { op_id, step } => {
                    let pb = create_spinner(&format!("{step}..."));
                    steps.insert((op_id, step), pb);
                }
                RunwayEvent::StepCompleted { op_id, step } => {
                    if let Some(pb) = steps.remove(&(op_id, step.clone())) {
                        pb.finish_and_clear();
                    }
                    print_line(Colored(Green, Icons::CHECK), &step, "done");
                }
                RunwayEvent::StepSkipped { op_id, step, reason } => {
                    if let Some(pb) = steps.remove(&(op_id, step.clone())) {
                        pb.finish_and_clear();
                    }
                    print_line(Colored(Yellow, Icons::SKIP), &step, &reason);
                }
                RunwayEvent::StepFailed { op_id, step, error } => {
                    if let Some(pb) = steps.remove(&(op_id, step.clone())) {
                        pb.finish_and_clear();
                    }
                    print_line(Colored(Red, Icons::CROSS), &step, &error);
                }

                RunwayEvent::Package {
                    pkg_name, stage, ..
                } => {
                    match stage {
                        PackageStage::AlreadyInstalled => {
                            print_line(Colored(Yellow, Icons::SKIP), &pkg_name, "already installed");
                        }
                        PackageStage::Failed(error) => {
                            print_line(Colored(Red, Icons::CROSS), &pkg_name, &error);
                        }
                        PackageStage::Checking | PackageStage::Installing | PackageStage::Installed => {}
                    }
                }
                RunwayEvent::InstallProgress {
                    op_id,
                    completed,
                    total,
                } => {
                    let pb = installs
                        .entry(op_id)
                        .or_insert_with(|| create_bar("Installing", total as u64));
                    pb.set_position(completed as u64);
                    if completed >= total {
                        if let Some(pb) = installs.remove(&op_id) {
                            pb.finish_and_clear();
                        }
                    }
                }

                RunwayEvent::Archive { op_id, path, stage } => {
                    let name = path.display().to_string();
                    match stage {
                        ArchiveStage::Extracting { output } => {
                            let msg = format!("{name}: extracting to {}", output.display());
                            archives.insert(op_id, create_spinner(&msg));
                        }
                        ArchiveStage::Creating { files } => {
                            let msg = format!("{name}: adding {files} files");
                            archives.insert(op_id, create_spinner(&msg));
                        }
                        ArchiveStage::Complete { output } => {
                            if let Some(pb) = archives.remove(&op_id) {
                                pb.finish_and_clear();
                            }
                            print_line(
                                Colored(Green, Icons::CHECK),
                                &name,
                                &output.display().to_string(),
                            );
                        }
                        ArchiveStage::Failed(error) => {
                            if let Some(pb) = archives.remove(&op_id) {
                                pb.finish_and_clear();
                            }
                            print_line(Colored(Red, Icons::CROSS), &name, &error);
                        }
                    }
                }

                // failures surface through the operation's own events
                RunwayEvent::Task { .. } => {}

                RunwayEvent::BatchProgress {
                    completed,
                    total,
                    failed,
                } => {
                    let fail_msg = if failed > 0 {
                        format!(" ({failed} failed)")
                    } else {
                        String::new()
                    };
                    let msg = format!("Progress: {completed}/{total}{fail_msg}");
                    let pb = batch_job.get_or_insert_with(|| create_spinner(&msg));
                    pb.set_message(msg);
                    if completed >= total {
                        if let Some(pb) = batch_job.take() {
                            pb.finish_and_clear();
                        }
                    }
                }

                RunwayEvent::Log { level, message } => {
                    match level {
                        LogLevel::Debug => debug!("{}", message),
                        LogLevel::Info => info!("{}", message),
                        LogLevel::Warning => warn!("{}", message),
                        LogLevel::Error => error!("{}", message),
                    }
                }
            }
        }

        if let Some(pb) = batch_job.take() {
            pb.finish_and_clear();
        }
        for pb in steps
            .into_values()
            .chain(installs.into_values())
            .chain(archives.into_values())
        {
            pb.finish_and_clear();
        }
    });

    ProgressGuard {
        handle: Some(handle),
    }
}
