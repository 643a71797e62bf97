//! Host configuration: timezone, locale, hostname, swap and cleanup.

use std::{
    fs,
    os::unix::fs::symlink,
    path::Path,
    sync::Arc,
};

use runway_utils::fs::{safe_remove, walk_dir, write_file};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    command::CommandExecutor,
    constants::{JOURNAL_RETENTION, ROTATED_LOG_SUFFIXES},
    error::{ErrorContext, RunwayError},
    package::PackageManager,
    paths::SystemPaths,
    RunwayResult,
};

pub mod info;
pub mod swap;

pub use info::SystemInfo;

/// What [`SystemManager::clean_system`] removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub temp_entries: usize,
    pub rotated_logs: usize,
    /// Steps that failed; cleaning carries on past them.
    pub warnings: Vec<String>,
}

pub struct SystemManager {
    executor: Arc<dyn CommandExecutor>,
    paths: SystemPaths,
    dry_run: bool,
}

impl SystemManager {
    pub fn new(executor: Arc<dyn CommandExecutor>, paths: SystemPaths) -> Self {
        Self {
            executor,
            paths,
            dry_run: false,
        }
    }

    /// In dry-run mode file changes are logged instead of applied.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn paths(&self) -> &SystemPaths {
        &self.paths
    }

    pub(crate) fn write(&self, path: &Path, contents: &[u8], mode: u32) -> RunwayResult<()> {
        if self.dry_run {
            info!("Would write {}", path.display());
            return Ok(());
        }
        write_file(path, contents, Some(mode))?;
        Ok(())
    }

    pub(crate) fn remove(&self, path: &Path) -> RunwayResult<()> {
        if self.dry_run {
            debug!("Would remove {}", path.display());
            return Ok(());
        }
        safe_remove(path)?;
        Ok(())
    }

    pub fn info(&self) -> SystemInfo {
        info::gather(self.executor.as_ref(), &self.paths)
    }

    /// Sets the system timezone, falling back to rewriting `/etc/localtime`
    /// when `timedatectl` is absent or fails.
    pub fn setup_timezone(&self, tz: &str) -> RunwayResult<()> {
        if tz.trim().is_empty() {
            return Err(RunwayError::InvalidTimezone(tz.to_string()));
        }

        if self.executor.exists("timedatectl") {
            let output = self.executor.run("timedatectl", &["set-timezone", tz])?;
            if output.success {
                info!("Timezone set to {}", tz);
                return Ok(());
            }
            warn!(
                "timedatectl failed ({}), updating /etc/localtime directly",
                output.stderr.trim()
            );
        }

        let zone = self.paths.zoneinfo(tz);
        if !zone.exists() {
            return Err(RunwayError::InvalidTimezone(tz.to_string()));
        }

        let localtime = self.paths.localtime();
        if self.dry_run {
            info!("Would link {} to {}", localtime.display(), zone.display());
        } else {
            safe_remove(&localtime)?;
            symlink(&zone, &localtime)
                .with_context(|| format!("linking {} to {}", localtime.display(), zone.display()))?;
        }
        self.write(&self.paths.timezone(), format!("{tz}\n").as_bytes(), 0o644)?;

        info!("Timezone set to {}", tz);
        Ok(())
    }

    pub fn setup_locale(&self, locale: &str) -> RunwayResult<()> {
        if !self.executor.exists("locale-gen") {
            return Err(RunwayError::ToolMissing("locale-gen".into()));
        }

        self.executor.check("locale-gen", &[locale])?;
        let lang = format!("LANG={locale}");
        let lc_all = format!("LC_ALL={locale}");
        self.executor.check("update-locale", &[&lang, &lc_all])?;

        info!("Locale set to {}", locale);
        Ok(())
    }

    /// Returns `false` when `name` is empty and nothing was changed.
    pub fn setup_hostname(&self, name: &str) -> RunwayResult<bool> {
        let name = name.trim();
        if name.is_empty() {
            debug!("no hostname configured, skipping");
            return Ok(false);
        }

        self.executor.check("hostnamectl", &["set-hostname", name])?;
        info!("Hostname set to {}", name);
        Ok(true)
    }

    fn clean_temp_dirs(&self, report: &mut CleanReport) {
        for dir in self.paths.temp_dirs() {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    debug!("skipping {}: {}", dir.display(), err);
                    continue;
                }
            };

            for entry in entries.flatten() {
                let path = entry.path();
                match self.remove(&path) {
                    Ok(()) => report.temp_entries += 1,
                    Err(err) => report.warnings.push(err.to_string()),
                }
            }
        }
    }

    fn clean_rotated_logs(&self, report: &mut CleanReport) {
        let mut removed = 0;
        let result = walk_dir(self.paths.log_dir(), &mut |path: &Path| {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            if ROTATED_LOG_SUFFIXES.iter().any(|s| name.ends_with(s)) {
                if self.dry_run {
                    debug!("Would remove {}", path.display());
                } else {
                    safe_remove(path)?;
                }
                removed += 1;
            }
            Ok(())
        });

        report.rotated_logs = removed;
        if let Err(err) = result {
            report.warnings.push(err.to_string());
        }
    }

    /// Removes temporary files, package caches and rotated logs.
    ///
    /// Every step is best effort; failures are collected as warnings.
    pub fn clean_system(&self, package_manager: Option<&PackageManager>) -> CleanReport {
        let mut report = CleanReport::default();

        self.clean_temp_dirs(&mut report);

        if let Some(pm) = package_manager {
            if let Err(err) = pm.clean() {
                report.warnings.push(err.to_string());
            }
        }

        self.clean_rotated_logs(&mut report);

        if self.executor.exists("journalctl") {
            let arg = format!("--vacuum-time={JOURNAL_RETENTION}");
            if let Err(err) = self.executor.check("journalctl", &[&arg]) {
                report.warnings.push(err.to_string());
            }
        }

        info!(
            "Removed {} temporary entries and {} rotated logs",
            report.temp_entries, report.rotated_logs
        );
        report
    }
}
