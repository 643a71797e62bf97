use std::sync::Arc;

use runway_config::config::Config;
use runway_core::{
    archive::ArchiveManager,
    command::CommandExecutor,
    package::PackageManager,
    paths::SystemPaths,
    security::SecurityManager,
    system::SystemManager,
    RunwayResult,
};
use runway_events::{EventSinkHandle, LogLevel, RunwayEvent};

/// Everything an operation needs: configuration, an event sink and the
/// executor used for external commands. Cloning is cheap.
#[derive(Clone)]
pub struct RunwayContext {
    config: Arc<Config>,
    events: EventSinkHandle,
    executor: Arc<dyn CommandExecutor>,
    paths: Arc<SystemPaths>,
    dry_run: bool,
}

impl RunwayContext {
    pub fn new(
        config: Config,
        events: EventSinkHandle,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            events,
            executor,
            paths: Arc::new(SystemPaths::default()),
            dry_run: false,
        }
    }

    pub fn with_paths(mut self, paths: SystemPaths) -> Self {
        self.paths = Arc::new(paths);
        self
    }

    /// Marks the context as a dry run: file writes are skipped and the
    /// executor is expected to only record commands.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn events(&self) -> &EventSinkHandle {
        &self.events
    }

    pub fn executor(&self) -> &Arc<dyn CommandExecutor> {
        &self.executor
    }

    pub fn paths(&self) -> &SystemPaths {
        &self.paths
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.events.emit(RunwayEvent::Log {
            level,
            message: message.into(),
        });
    }

    pub fn package_manager(&self) -> RunwayResult<PackageManager> {
        PackageManager::detect(self.executor.clone())
    }

    pub fn system_manager(&self) -> SystemManager {
        SystemManager::new(self.executor.clone(), (*self.paths).clone()).dry_run(self.dry_run)
    }

    pub fn security_manager(&self) -> SecurityManager {
        SecurityManager::new(self.executor.clone(), (*self.paths).clone()).dry_run(self.dry_run)
    }

    pub fn archive_manager(&self) -> ArchiveManager {
        ArchiveManager::new(self.executor.clone()).dry_run(self.dry_run)
    }
}
