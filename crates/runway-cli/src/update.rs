use nu_ansi_term::Color::{Green, Yellow};
use runway_core::RunwayResult;
use runway_operations::{update, RunwayContext};
use tracing::{info, warn};

use crate::utils::{json_output, key_value_table, print_json, print_list, Colored, Icons};

pub fn update_packages(ctx: &RunwayContext, attach: bool) -> RunwayResult<()> {
    let kind = update::update_system(ctx, attach)?;
    if json_output() {
        return print_json(&serde_json::json!({ "package_manager": kind }));
    }
    info!("{} Packages updated with {}", Colored(Green, Icons::CHECK), kind);
    Ok(())
}

pub fn display_updates(ctx: &RunwayContext) -> RunwayResult<()> {
    let updates = update::list_updates(ctx)?;

    if json_output() {
        return print_json(&updates);
    }

    if updates.is_empty() {
        info!("{} System is up to date", Colored(Green, Icons::CHECK));
    } else {
        print_list(
            &format!("{} pending updates:", Colored(Yellow, updates.len())),
            &updates,
        );
    }
    Ok(())
}

pub fn clean(ctx: &RunwayContext) -> RunwayResult<()> {
    let report = update::clean_system(ctx);

    if json_output() {
        return print_json(&report);
    }

    for warning in &report.warnings {
        warn!("{}", warning);
    }
    let table = key_value_table(
        "Cleanup",
        [
            ("Temporary entries removed", report.temp_entries.to_string()),
            ("Rotated logs removed", report.rotated_logs.to_string()),
            ("Warnings", report.warnings.len().to_string()),
        ],
    );
    info!("\n{table}");
    Ok(())
}
