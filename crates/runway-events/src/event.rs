use std::path::PathBuf;

use crate::OperationId;

/// All event types emitted by runway operations.
#[derive(Debug, Clone)]
pub enum RunwayEvent {
    /// A named step (timezone, firewall, packages, ...) started.
    StepStarted { op_id: OperationId, step: String },
    /// A step finished successfully.
    StepCompleted { op_id: OperationId, step: String },
    /// A step was not run.
    StepSkipped {
        op_id: OperationId,
        step: String,
        reason: String,
    },
    /// A step failed. Later steps may still run.
    StepFailed {
        op_id: OperationId,
        step: String,
        error: String,
    },
    /// Per-package progress during installation.
    Package {
        op_id: OperationId,
        pkg_name: String,
        stage: PackageStage,
    },
    /// Progress of an install run: packages processed so far.
    InstallProgress {
        op_id: OperationId,
        completed: u32,
        total: u32,
    },
    /// A task inside a parallel fan-out.
    Task {
        op_id: OperationId,
        label: String,
        stage: TaskStage,
    },
    /// Archive extraction or creation.
    Archive {
        op_id: OperationId,
        path: PathBuf,
        stage: ArchiveStage,
    },
    /// Batch operation overall progress.
    BatchProgress {
        completed: u32,
        total: u32,
        failed: u32,
    },
    /// Log message.
    Log { level: LogLevel, message: String },
}

/// Package installation stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageStage {
    /// Querying the package manager for install state.
    Checking,
    /// Already present, nothing to do.
    AlreadyInstalled,
    /// Handed to the package manager.
    Installing,
    Installed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStage {
    Started,
    Complete,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveStage {
    Extracting { output: PathBuf },
    Creating { files: usize },
    Complete { output: PathBuf },
    Failed(String),
}

/// Log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}
