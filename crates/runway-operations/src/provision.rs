use runway_core::{error::RunwayError, RunwayResult};
use runway_utils::lock::FileLock;
use tracing::info;

use crate::{
    install::{install_with, resolve_categories},
    progress::{next_op_id, report_step, skip_step},
    security::secure_system,
    system::configure_system,
    types::{ProvisionPlan, ProvisionReport, SecurityStep, SystemStep},
    RunwayContext,
};

const LOCK_NAME: &str = "provision";
const SKIPPED_BY_REQUEST: &str = "skipped by request";

/// Runs a full provisioning pass: package update, package install, host
/// configuration and security hardening, in that order.
///
/// A failed step is recorded and the run moves on. Only one provisioning run
/// may be active on a host at a time.
pub fn provision(ctx: &RunwayContext, plan: &ProvisionPlan) -> RunwayResult<ProvisionReport> {
    let _lock = FileLock::try_acquire(LOCK_NAME)?.ok_or(RunwayError::Locked)?;
    let op_id = next_op_id();
    let events = ctx.events();
    let mut report = ProvisionReport::default();

    let pm = ctx.package_manager();

    if plan.update {
        report.steps.push(report_step(events, op_id, "update", || {
            let pm = pm.as_ref().map_err(|_| RunwayError::NoPackageManager)?;
            pm.refresh()?;
            pm.upgrade()
        }));
    } else {
        report
            .steps
            .push(skip_step(events, op_id, "update", SKIPPED_BY_REQUEST));
    }

    if plan.packages {
        report.steps.push(report_step(events, op_id, "packages", || {
            let pm = pm.as_ref().map_err(|_| RunwayError::NoPackageManager)?;
            let pkgs = resolve_categories(ctx, &plan.categories)?;
            let installed = install_with(ctx, pm, &pkgs)?;
            if installed.is_success() {
                return Ok(());
            }
            let names: Vec<&str> = installed.failed.iter().map(|f| f.name.as_str()).collect();
            Err(RunwayError::Custom(format!(
                "{} packages failed to install: {}",
                names.len(),
                names.join(", ")
            )))
        }));
    } else {
        report
            .steps
            .push(skip_step(events, op_id, "packages", SKIPPED_BY_REQUEST));
    }

    if plan.system {
        report.steps.extend(configure_system(ctx, &SystemStep::ALL));
    } else {
        report
            .steps
            .push(skip_step(events, op_id, "system", SKIPPED_BY_REQUEST));
    }

    if plan.security {
        report.steps.extend(secure_system(ctx, &SecurityStep::ALL));
    } else {
        report
            .steps
            .push(skip_step(events, op_id, "security", SKIPPED_BY_REQUEST));
    }

    info!(
        "Provisioning finished: {} steps, {} failed",
        report.steps.len(),
        report.failed().count()
    );
    Ok(report)
}
