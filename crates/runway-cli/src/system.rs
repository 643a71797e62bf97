use runway_core::RunwayResult;
use runway_operations::{system, RunwayContext, SystemStep};

use crate::{cli::SystemAction, utils::finish_steps};

fn steps_for(action: SystemAction) -> Vec<SystemStep> {
    match action {
        SystemAction::Timezone => vec![SystemStep::Timezone],
        SystemAction::Locale => vec![SystemStep::Locale],
        SystemAction::Hostname => vec![SystemStep::Hostname],
        SystemAction::Swap => vec![SystemStep::Swap],
        SystemAction::All => SystemStep::ALL.to_vec(),
    }
}

pub fn run_system(ctx: &RunwayContext, action: SystemAction) -> RunwayResult<()> {
    let reports = system::configure_system(ctx, &steps_for(action));
    finish_steps("System Configuration", &reports)
}
