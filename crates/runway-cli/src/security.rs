use nu_ansi_term::Color::{Cyan, Green, Yellow};
use runway_core::{security::SecurityAudit, RunwayResult};
use runway_operations::{security, RunwayContext, SecurityStep};
use tracing::info;

use crate::{
    cli::SecurityAction,
    utils::{finish_steps, json_output, key_value_table, print_json, print_list, Colored},
};

fn steps_for(action: SecurityAction) -> Vec<SecurityStep> {
    match action {
        SecurityAction::Firewall => vec![SecurityStep::Firewall],
        SecurityAction::Fail2ban => vec![SecurityStep::Fail2ban],
        SecurityAction::Ssh => vec![SecurityStep::Ssh],
        SecurityAction::All => SecurityStep::ALL.to_vec(),
        SecurityAction::Audit => Vec::new(),
    }
}

pub fn run_security(ctx: &RunwayContext, action: SecurityAction) -> RunwayResult<()> {
    if action == SecurityAction::Audit {
        return display_audit(ctx);
    }

    let reports = security::secure_system(ctx, &steps_for(action));
    finish_steps("Security Hardening", &reports)
}

fn display_audit(ctx: &RunwayContext) -> RunwayResult<()> {
    let audit = security::security_audit(ctx);

    if json_output() {
        return print_json(&audit);
    }

    print_audit(&audit);
    Ok(())
}

fn print_audit(audit: &SecurityAudit) {
    if audit.listening.is_empty() {
        info!("{}", Colored(Yellow, "No listening sockets reported"));
    } else {
        print_list("Listening ports:", &audit.listening);
    }

    let updates = if audit.update_count == 0 {
        Colored(Green, "none".to_string()).to_string()
    } else {
        Colored(Yellow, format!("{} pending", audit.update_count)).to_string()
    };
    let table = key_value_table(
        "Security Audit",
        [
            ("Updates".to_string(), updates),
            ("UFW".to_string(), audit.ufw.clone()),
            ("Fail2ban".to_string(), audit.fail2ban.clone()),
        ],
    );
    info!("\n{table}");

    if !audit.updates.is_empty() {
        print_list("Pending updates:", &audit.updates);
        if audit.update_count > audit.updates.len() {
            info!(
                "  ... and {} more, see {}",
                audit.update_count - audit.updates.len(),
                Colored(Cyan, "runway updates")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_for() {
        assert_eq!(steps_for(SecurityAction::Ssh), vec![SecurityStep::Ssh]);
        assert_eq!(steps_for(SecurityAction::All), SecurityStep::ALL.to_vec());
        assert!(steps_for(SecurityAction::Audit).is_empty());
    }
}
