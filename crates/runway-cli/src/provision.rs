use nu_ansi_term::Color::{Cyan, Yellow};
use runway_core::RunwayResult;
use runway_operations::{provision, ProvisionPlan, RunwayContext};
use tracing::info;

use crate::utils::{confirm_action, finish_steps, json_output, Colored, Icons};

fn describe(plan: &ProvisionPlan) -> Vec<&'static str> {
    [
        (plan.update, "update packages"),
        (plan.packages, "install packages"),
        (plan.system, "configure the host"),
        (plan.security, "harden security"),
    ]
    .into_iter()
    .filter_map(|(enabled, label)| enabled.then_some(label))
    .collect()
}

/// Runs the full provisioning pass after asking for confirmation. Dry runs,
/// JSON output and `assume_yes` skip the prompt.
pub fn run_provision(ctx: &RunwayContext, plan: &ProvisionPlan, assume_yes: bool) -> RunwayResult<()> {
    let stages = describe(plan);
    if stages.is_empty() {
        info!("{} Every stage is skipped, nothing to do", Colored(Yellow, Icons::SKIP));
        return Ok(());
    }

    if !assume_yes && !ctx.is_dry_run() && !json_output() {
        info!("This will {}", Colored(Cyan, stages.join(", ")));
        if !confirm_action("Continue?")? {
            info!("Aborted");
            return Ok(());
        }
    }

    let report = provision::provision(ctx, plan)?;
    finish_steps("Provisioning", &report.steps)
}
