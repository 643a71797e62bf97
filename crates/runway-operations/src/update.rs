use runway_core::{package::PackageManagerKind, system::CleanReport, RunwayResult};
use tracing::{debug, info};

use crate::{
    progress::{next_op_id, run_step},
    RunwayContext,
};

/// Refreshes the package index and upgrades every installed package.
///
/// With `attach` the upgrade inherits the terminal so the package manager's
/// own output is shown.
pub fn update_system(ctx: &RunwayContext, attach: bool) -> RunwayResult<PackageManagerKind> {
    let pm = ctx.package_manager()?;
    let op_id = next_op_id();

    run_step(ctx.events(), op_id, "refresh", || pm.refresh())?;
    if attach {
        run_step(ctx.events(), op_id, "upgrade", || pm.upgrade_attached())?;
    } else {
        run_step(ctx.events(), op_id, "upgrade", || pm.upgrade())?;
    }

    info!("System packages updated with {}", pm.kind());
    Ok(pm.kind())
}

/// Pending upgrades as reported by the package manager.
pub fn list_updates(ctx: &RunwayContext) -> RunwayResult<Vec<String>> {
    ctx.package_manager()?.available_updates()
}

/// Removes temporary files, rotated logs and package caches. Without a
/// package manager the cache step is left out.
pub fn clean_system(ctx: &RunwayContext) -> CleanReport {
    let pm = match ctx.package_manager() {
        Ok(pm) => Some(pm),
        Err(err) => {
            debug!("skipping package cache cleanup: {}", err);
            None
        }
    };
    ctx.system_manager().clean_system(pm.as_ref())
}
