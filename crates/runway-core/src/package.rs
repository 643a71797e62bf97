//! Host package manager abstraction.

use std::{fmt, sync::Arc};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use runway_config::packages::PackagesConfig;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    command::{display_command, CommandExecutor},
    constants::CHECK_UPDATE_AVAILABLE,
    error::RunwayError,
    RunwayResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManagerKind {
    Apt,
    Dnf,
    Yum,
    Pacman,
    Apk,
    Zypper,
}

use PackageManagerKind::*;

impl PackageManagerKind {
    /// Probe order used by [`PackageManager::detect`].
    pub const DETECTION_ORDER: [Self; 6] = [Apt, Dnf, Yum, Pacman, Zypper, Apk];

    pub fn binary(self) -> &'static str {
        match self {
            Apt => "apt",
            Dnf => "dnf",
            Yum => "yum",
            Pacman => "pacman",
            Apk => "apk",
            Zypper => "zypper",
        }
    }

    pub fn update_cmd(self) -> &'static [&'static str] {
        match self {
            Apt => &["apt", "update"],
            Dnf => &["dnf", "check-update"],
            Yum => &["yum", "check-update"],
            Pacman => &["pacman", "-Sy"],
            Apk => &["apk", "update"],
            Zypper => &["zypper", "refresh"],
        }
    }

    pub fn upgrade_cmd(self) -> &'static [&'static str] {
        match self {
            Apt => &["apt", "upgrade", "-y"],
            Dnf => &["dnf", "update", "-y"],
            Yum => &["yum", "update", "-y"],
            Pacman => &["pacman", "-Syu", "--noconfirm"],
            Apk => &["apk", "upgrade"],
            Zypper => &["zypper", "update", "-y"],
        }
    }

    /// Install prefix; package names are appended.
    pub fn install_cmd(self) -> &'static [&'static str] {
        match self {
            Apt => &["apt", "install", "-y"],
            Dnf => &["dnf", "install", "-y"],
            Yum => &["yum", "install", "-y"],
            Pacman => &["pacman", "-S", "--noconfirm"],
            Apk => &["apk", "add"],
            Zypper => &["zypper", "install", "-y"],
        }
    }

    pub fn remove_cmd(self) -> &'static [&'static str] {
        match self {
            Apt => &["apt", "remove", "-y"],
            Dnf => &["dnf", "remove", "-y"],
            Yum => &["yum", "remove", "-y"],
            Pacman => &["pacman", "-R", "--noconfirm"],
            Apk => &["apk", "del"],
            Zypper => &["zypper", "remove", "-y"],
        }
    }

    pub fn clean_cmds(self) -> &'static [&'static [&'static str]] {
        match self {
            Apt => &[&["apt", "autoremove", "-y"], &["apt", "autoclean"]],
            Dnf => &[&["dnf", "clean", "all"]],
            Yum => &[&["yum", "clean", "all"]],
            Pacman => &[&["pacman", "-Sc", "--noconfirm"]],
            Apk => &[&["apk", "cache", "clean"]],
            Zypper => &[&["zypper", "clean"]],
        }
    }

    pub fn check_cmd(self) -> &'static [&'static str] {
        match self {
            Apt => &["apt", "list", "--upgradable"],
            Dnf => &["dnf", "check-update"],
            Yum => &["yum", "check-update"],
            Pacman => &["pacman", "-Qu"],
            Apk => &["apk", "version"],
            Zypper => &["zypper", "list-updates"],
        }
    }

    /// Whether several packages can go into one install transaction.
    pub fn supports_batch_install(self) -> bool {
        matches!(self, Apt | Dnf | Yum)
    }
}

impl fmt::Display for PackageManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// A detected package manager bound to an executor.
#[derive(Clone)]
pub struct PackageManager {
    kind: PackageManagerKind,
    executor: Arc<dyn CommandExecutor>,
}

impl PackageManager {
    pub fn new(kind: PackageManagerKind, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { kind, executor }
    }

    /// Picks the first manager in [`PackageManagerKind::DETECTION_ORDER`]
    /// whose binary exists.
    pub fn detect(executor: Arc<dyn CommandExecutor>) -> RunwayResult<Self> {
        let kind = PackageManagerKind::DETECTION_ORDER
            .into_iter()
            .find(|kind| executor.exists(kind.binary()))
            .ok_or(RunwayError::NoPackageManager)?;

        debug!(manager = %kind, "detected package manager");
        Ok(Self::new(kind, executor))
    }

    pub fn kind(&self) -> PackageManagerKind {
        self.kind
    }

    fn check_argv(&self, argv: &[&str]) -> RunwayResult<()> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            RunwayError::Custom("empty command".into())
        })?;
        self.executor.check(program, args)?;
        Ok(())
    }

    fn with_packages<'a>(prefix: &[&'a str], pkgs: &'a [String]) -> Vec<&'a str> {
        prefix
            .iter()
            .copied()
            .chain(pkgs.iter().map(String::as_str))
            .collect()
    }

    pub fn is_installed(&self, pkg: &str) -> bool {
        let exec = &self.executor;
        let result = match self.kind {
            Apt => {
                exec.run("dpkg-query", &["-W", "-f=${Status}", pkg])
                    .map(|out| out.stdout.contains("install ok installed"))
            }
            Dnf | Yum | Zypper => exec.run("rpm", &["-q", pkg]).map(|out| out.success),
            Pacman => {
                let pattern = format!("^{pkg}$");
                exec.run("pacman", &["-Qs", &pattern])
                    .map(|out| out.success && out.stdout.contains(pkg))
            }
            Apk => exec.run("apk", &["info", "-e", pkg]).map(|out| out.success),
        };

        result.unwrap_or_else(|err| {
            debug!(package = pkg, error = %err, "install state query failed");
            false
        })
    }

    /// Splits `pkgs` into `(installed, missing)`, preserving order. Install
    /// state is queried in parallel.
    pub fn partition_installed(&self, pkgs: &[String]) -> (Vec<String>, Vec<String>) {
        let states: Vec<bool> = pkgs.par_iter().map(|pkg| self.is_installed(pkg)).collect();

        let mut installed = Vec::new();
        let mut missing = Vec::new();
        for (pkg, is_installed) in pkgs.iter().zip(states) {
            if is_installed {
                installed.push(pkg.clone());
            } else {
                missing.push(pkg.clone());
            }
        }
        (installed, missing)
    }

    /// Installs all `pkgs` in one transaction.
    pub fn install_batch(&self, pkgs: &[String]) -> RunwayResult<()> {
        let argv = Self::with_packages(self.kind.install_cmd(), pkgs);
        info!("Installing {} packages with {}", pkgs.len(), self.kind);
        self.check_argv(&argv)
    }

    pub fn install_one(&self, pkg: &str) -> RunwayResult<()> {
        let mut argv = self.kind.install_cmd().to_vec();
        argv.push(pkg);
        self.check_argv(&argv).map_err(|err| {
            RunwayError::PackageInstallFailed {
                package: pkg.to_string(),
                source: Box::new(err),
            }
        })
    }

    /// Installs `pkgs` and returns the packages that failed.
    ///
    /// Batch-capable managers try one transaction first and fall back to
    /// installing one at a time. A failing package does not stop the rest.
    /// `on_result` is called once per package, in order, with the number of
    /// packages finished so far.
    pub fn install<F>(&self, pkgs: &[String], mut on_result: F) -> Vec<(String, RunwayError)>
    where
        F: FnMut(&str, Option<&RunwayError>, usize),
    {
        if self.kind.supports_batch_install() && pkgs.len() > 1 {
            match self.install_batch(pkgs) {
                Ok(()) => {
                    for (idx, pkg) in pkgs.iter().enumerate() {
                        on_result(pkg, None, idx + 1);
                    }
                    return Vec::new();
                }
                Err(err) => {
                    warn!("Batch install failed, retrying one by one: {}", err);
                }
            }
        }

        let mut failed = Vec::new();
        for (idx, pkg) in pkgs.iter().enumerate() {
            match self.install_one(pkg) {
                Ok(()) => on_result(pkg, None, idx + 1),
                Err(err) => {
                    on_result(pkg, Some(&err), idx + 1);
                    failed.push((pkg.clone(), err));
                }
            }
        }
        failed
    }

    /// Removes all `pkgs` in one transaction.
    pub fn remove(&self, pkgs: &[String]) -> RunwayResult<()> {
        if pkgs.is_empty() {
            return Ok(());
        }
        info!("Removing {} packages with {}", pkgs.len(), self.kind);
        self.check_argv(&Self::with_packages(self.kind.remove_cmd(), pkgs))
    }

    /// Refreshes the package index.
    pub fn refresh(&self) -> RunwayResult<()> {
        let argv = self.kind.update_cmd();
        if matches!(self.kind, Dnf | Yum) {
            // check-update exits 100 when updates exist
            let output = self.executor.run(argv[0], &argv[1..])?;
            if output.success || output.code == Some(CHECK_UPDATE_AVAILABLE) {
                return Ok(());
            }
            return Err(RunwayError::CommandFailed {
                command: display_command(argv[0], &argv[1..]),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        self.check_argv(argv)
    }

    pub fn upgrade(&self) -> RunwayResult<()> {
        self.check_argv(self.kind.upgrade_cmd())
    }

    /// Upgrades with the package manager attached to the terminal.
    pub fn upgrade_attached(&self) -> RunwayResult<()> {
        let (program, args) = self
            .kind
            .upgrade_cmd()
            .split_first()
            .ok_or_else(|| RunwayError::Custom("empty command".into()))?;
        self.executor.check_interactive(program, args)?;
        Ok(())
    }

    pub fn clean(&self) -> RunwayResult<()> {
        for argv in self.kind.clean_cmds() {
            self.check_argv(argv)?;
        }
        Ok(())
    }

    /// Lines describing pending upgrades.
    pub fn available_updates(&self) -> RunwayResult<Vec<String>> {
        let argv = self.kind.check_cmd();
        let output = self.executor.run(argv[0], &argv[1..])?;

        let tolerated = match self.kind {
            Dnf | Yum => output.code == Some(CHECK_UPDATE_AVAILABLE),
            // pacman -Qu exits 1 when nothing is pending
            Pacman => output.code == Some(1) && output.stdout.trim().is_empty(),
            _ => false,
        };
        if !output.success && !tolerated {
            return Err(RunwayError::CommandFailed {
                command: display_command(argv[0], &argv[1..]),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output
            .lines()
            .filter(|line| !line.contains("Listing..."))
            .map(String::from)
            .collect())
    }
}

/// A named group of packages that can be installed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageCategory {
    pub key: String,
    pub name: String,
    pub packages: Vec<String>,
    pub enabled: bool,
}

fn category_name(key: &str) -> &'static str {
    match key {
        "basic" => "Basic Utilities",
        "network" => "Network Tools",
        "monitoring" => "Monitoring Tools",
        "development" => "Development Tools",
        "archive" => "Archive Tools",
        "security" => "Security Tools",
        "system" => "System Utilities",
        "database" => "Database Tools",
        "web" => "Web Server",
        _ => "Other",
    }
}

/// Packages always added to a category on top of the configured list.
fn builtin_extras(key: &str) -> &'static [&'static str] {
    match key {
        "basic" => &["sudo", "ca-certificates"],
        "archive" => &["lbzip2", "pigz", "pbzip2"],
        _ => &[],
    }
}

/// Every category known from the config, sorted by display name.
pub fn categories(config: &PackagesConfig) -> Vec<PackageCategory> {
    let mut categories: Vec<PackageCategory> = config
        .lists()
        .into_iter()
        .map(|(key, list)| {
            let mut packages: Vec<String> = list.to_vec();
            for extra in builtin_extras(key) {
                if !packages.iter().any(|p| p == extra) {
                    packages.push(extra.to_string());
                }
            }
            PackageCategory {
                key: key.to_string(),
                name: category_name(key).to_string(),
                enabled: !packages.is_empty(),
                packages,
            }
        })
        .collect();

    categories.sort_by(|a, b| a.name.cmp(&b.name));
    categories
}

pub fn packages_for(config: &PackagesConfig, key: &str) -> RunwayResult<Vec<String>> {
    categories(config)
        .into_iter()
        .find(|c| c.key == key)
        .map(|c| c.packages)
        .ok_or_else(|| RunwayError::UnknownCategory(key.to_string()))
}
