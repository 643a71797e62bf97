use runway_core::{
    package::PackageManager,
    security::{FirewallConfig, FirewallOutcome, SecurityAudit, SshSettings},
};
use tracing::{debug, info};

use crate::{
    progress::{next_op_id, report_optional_step},
    types::{SecurityStep, StepReport},
    RunwayContext,
};

fn optional_package_manager(ctx: &RunwayContext) -> Option<PackageManager> {
    ctx.package_manager()
        .inspect_err(|err| debug!("no package manager for tool installs: {}", err))
        .ok()
}

/// Applies the `security` config section: UFW, Fail2ban and sshd hardening.
///
/// Firewall and Fail2ban are skipped when disabled in the config. A failed
/// step does not stop the ones after it.
pub fn secure_system(ctx: &RunwayContext, steps: &[SecurityStep]) -> Vec<StepReport> {
    let op_id = next_op_id();
    let config = &ctx.config().security;
    let manager = ctx.security_manager();
    let pm = optional_package_manager(ctx);

    steps
        .iter()
        .map(|step| {
            let name = step.to_string();
            report_optional_step(ctx.events(), op_id, &name, || {
                match step {
                    SecurityStep::Firewall => {
                        let firewall = FirewallConfig::from(config);
                        match manager.setup_firewall(&firewall, pm.as_ref())? {
                            FirewallOutcome::Disabled => Ok(Some("ufw disabled in config".into())),
                            FirewallOutcome::AlreadyActive { rules } => {
                                info!("Current UFW rules:\n{}", rules.trim_end());
                                Ok(Some("ufw already active".into()))
                            }
                            FirewallOutcome::Configured { status, .. } => {
                                debug!("ufw status:\n{}", status.trim_end());
                                Ok(None)
                            }
                        }
                    }
                    SecurityStep::Fail2ban => {
                        if !config.enable_fail2ban {
                            return Ok(Some("fail2ban disabled in config".into()));
                        }
                        manager.setup_fail2ban(config.ssh_port, pm.as_ref())?;
                        Ok(None)
                    }
                    SecurityStep::Ssh => {
                        manager.setup_ssh(&SshSettings::from(config))?;
                        Ok(None)
                    }
                }
            })
        })
        .collect()
}

pub fn security_audit(ctx: &RunwayContext) -> SecurityAudit {
    let pm = optional_package_manager(ctx);
    ctx.security_manager().audit(pm.as_ref())
}
