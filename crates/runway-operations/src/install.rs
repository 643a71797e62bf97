use runway_core::{
    package::{packages_for, PackageManager},
    RunwayResult,
};
use runway_events::{OperationId, PackageStage, RunwayEvent};
use tracing::{debug, info};

use crate::{
    progress::{install_progress_bridge, next_op_id},
    types::{FailedInfo, InstallReport, RemoveReport},
    RunwayContext,
};

fn dedup(pkgs: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(pkgs.len());
    for pkg in pkgs {
        let pkg = pkg.trim();
        if !pkg.is_empty() && !out.iter().any(|p| p == pkg) {
            out.push(pkg.to_string());
        }
    }
    out
}

fn emit(ctx: &RunwayContext, op_id: OperationId, pkg: &str, stage: PackageStage) {
    ctx.events().emit(RunwayEvent::Package {
        op_id,
        pkg_name: pkg.to_string(),
        stage,
    });
}

/// Installs `pkgs` with the detected package manager.
///
/// Already installed packages are skipped. Every failure is recorded in the
/// report without stopping the rest.
pub fn install_packages(ctx: &RunwayContext, pkgs: &[String]) -> RunwayResult<InstallReport> {
    let pm = ctx.package_manager()?;
    install_with(ctx, &pm, pkgs)
}

pub(crate) fn install_with(
    ctx: &RunwayContext,
    pm: &PackageManager,
    pkgs: &[String],
) -> RunwayResult<InstallReport> {
    let op_id = next_op_id();
    let pkgs = dedup(pkgs);
    let mut report = InstallReport::default();
    if pkgs.is_empty() {
        return Ok(report);
    }

    debug!(count = pkgs.len(), manager = %pm.kind(), "checking install state");
    for pkg in &pkgs {
        emit(ctx, op_id, pkg, PackageStage::Checking);
    }

    let (installed, missing) = pm.partition_installed(&pkgs);
    for pkg in &installed {
        emit(ctx, op_id, pkg, PackageStage::AlreadyInstalled);
    }
    report.skipped = installed;

    if missing.is_empty() {
        info!("All {} packages are already installed", report.skipped.len());
        return Ok(report);
    }

    let mut progress = install_progress_bridge(ctx.events().clone(), op_id, missing.len() as u32);
    for pkg in &missing {
        emit(ctx, op_id, pkg, PackageStage::Installing);
    }

    let failed = pm.install(&missing, |pkg, err, completed| {
        match err {
            None => {
                emit(ctx, op_id, pkg, PackageStage::Installed);
                report.installed.push(pkg.to_string());
            }
            Some(err) => emit(ctx, op_id, pkg, PackageStage::Failed(err.root_cause())),
        }
        progress(completed);
    });

    report.failed = failed
        .into_iter()
        .map(|(name, err)| FailedInfo {
            name,
            error: err.root_cause(),
        })
        .collect();
    Ok(report)
}

/// Removes installed packages from `pkgs`; the rest are reported as skipped.
pub fn remove_packages(ctx: &RunwayContext, pkgs: &[String]) -> RunwayResult<RemoveReport> {
    let pm = ctx.package_manager()?;
    let pkgs = dedup(pkgs);
    let (installed, absent) = pm.partition_installed(&pkgs);

    if installed.is_empty() {
        info!("None of the {} packages are installed", absent.len());
    } else {
        pm.remove(&installed)?;
    }
    Ok(RemoveReport {
        removed: installed,
        not_installed: absent,
    })
}

/// Packages for the given category keys; an empty list selects every
/// enabled category.
pub fn resolve_categories(ctx: &RunwayContext, keys: &[String]) -> RunwayResult<Vec<String>> {
    let config = &ctx.config().packages;
    if keys.is_empty() {
        return Ok(runway_core::package::categories(config)
            .into_iter()
            .filter(|c| c.enabled)
            .flat_map(|c| c.packages)
            .collect());
    }

    let mut pkgs = Vec::new();
    for key in keys {
        pkgs.extend(packages_for(config, key)?);
    }
    Ok(pkgs)
}

pub fn install_categories(ctx: &RunwayContext, keys: &[String]) -> RunwayResult<InstallReport> {
    let pkgs = resolve_categories(ctx, keys)?;
    install_packages(ctx, &pkgs)
}

#[cfg(test)]
mod tests {
    use runway_config::config::Config;
    use runway_core::{
        command::{CommandOutput, RecordingExecutor},
        error::RunwayError,
    };

    use super::*;
    use crate::context::test_support::test_context;

    fn names(pkgs: &[&str]) -> Vec<String> {
        pkgs.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_install_skips_installed_and_batches() {
        let t = test_context(
            Config::default_config(),
            RecordingExecutor::new()
                .with_tools(&["apt"])
                .reply("dpkg-query -W -f=${Status} curl", CommandOutput::ok("install ok installed")),
        );

        let report = install_packages(&t.ctx, &names(&["curl", "git", "jq", "git"])).unwrap();
        assert_eq!(report.skipped, names(&["curl"]));
        assert_eq!(report.installed, names(&["git", "jq"]));
        assert!(report.is_success());
        assert!(t.exec.calls().contains(&"apt install -y git jq".to_string()));

        let events = t.events.events();
        assert!(events.iter().any(|e| matches!(
            e,
            RunwayEvent::Package { pkg_name, stage: PackageStage::AlreadyInstalled, .. } if pkg_name == "curl"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            RunwayEvent::InstallProgress { completed: 2, total: 2, .. }
        )));
    }

    #[test]
    fn test_install_fallback_records_every_failure() {
        let t = test_context(
            Config::default_config(),
            RecordingExecutor::new()
                .with_tools(&["dnf"])
                .reply("rpm -q", CommandOutput::failed(1, ""))
                .reply("dnf install -y bad1 good bad2", CommandOutput::failed(1, "No match"))
                .reply("dnf install -y bad1", CommandOutput::failed(1, "No match for bad1"))
                .reply("dnf install -y bad2", CommandOutput::failed(1, "No match for bad2")),
        );

        let report = install_packages(&t.ctx, &names(&["bad1", "good", "bad2"])).unwrap();
        assert_eq!(report.installed, names(&["good"]));
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].name, "bad1");
        assert!(report.failed[1].error.contains("No match for bad2"));
    }

    #[test]
    fn test_install_without_package_manager() {
        let t = test_context(Config::default_config(), RecordingExecutor::new().with_tools(&[]));
        assert!(matches!(
            install_packages(&t.ctx, &names(&["curl"])),
            Err(RunwayError::NoPackageManager)
        ));
    }

    #[test]
    fn test_remove_only_installed() {
        let t = test_context(
            Config::default_config(),
            RecordingExecutor::new()
                .with_tools(&["dnf"])
                .reply("rpm -q telnet", CommandOutput::failed(1, "package telnet is not installed")),
        );

        let report = remove_packages(&t.ctx, &names(&["nano", "telnet", "nano"])).unwrap();
        assert_eq!(report.removed, names(&["nano"]));
        assert_eq!(report.not_installed, names(&["telnet"]));
        assert_eq!(t.exec.calls().last().unwrap(), "dnf remove -y nano");
    }

    #[test]
    fn test_remove_nothing_installed_runs_no_remove() {
        let t = test_context(
            Config::default_config(),
            RecordingExecutor::new()
                .with_tools(&["apk"])
                .reply("apk info -e", CommandOutput::failed(1, "")),
        );

        let report = remove_packages(&t.ctx, &names(&["htop"])).unwrap();
        assert!(report.removed.is_empty());
        assert!(!t.exec.calls().iter().any(|c| c.starts_with("apk del")));
    }

    #[test]
    fn test_resolve_categories() {
        let t = test_context(Config::default_config(), RecordingExecutor::new());
        let archive = resolve_categories(&t.ctx, &names(&["archive"])).unwrap();
        assert!(archive.contains(&"pigz".to_string()));

        assert!(matches!(
            resolve_categories(&t.ctx, &names(&["games"])),
            Err(RunwayError::UnknownCategory(_))
        ));

        let all = resolve_categories(&t.ctx, &[]).unwrap();
        assert!(all.contains(&"sudo".to_string()));
    }

    #[test]
    fn test_install_categories() {
        let t = test_context(
            Config::default_config(),
            RecordingExecutor::new()
                .with_tools(&["apk"])
                .reply("apk info -e", CommandOutput::ok("")),
        );
        let report = install_categories(&t.ctx, &names(&["archive"])).unwrap();
        assert!(report.installed.is_empty());
        assert!(report.skipped.contains(&"pigz".to_string()));
    }
}
