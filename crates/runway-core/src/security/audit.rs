use serde::Serialize;
use tracing::debug;

use super::SecurityManager;
use crate::{constants::AUDIT_UPDATE_PREVIEW, package::PackageManager};

/// Snapshot of the host's exposure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecurityAudit {
    /// `ss -tulpn` lines in LISTEN state.
    pub listening: Vec<String>,
    /// The first few pending updates.
    pub updates: Vec<String>,
    pub update_count: usize,
    pub ufw: String,
    pub fail2ban: String,
}

pub fn parse_listening(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.contains("LISTEN"))
        .map(|line| line.trim().to_string())
        .collect()
}

impl SecurityManager {
    fn tool_output(&self, tool: &str, args: &[&str]) -> String {
        if !self.executor.exists(tool) {
            return format!("{tool} not installed");
        }
        match self.executor.run(tool, args) {
            Ok(out) if out.success => out.stdout.trim().to_string(),
            Ok(out) => out.stderr.trim().to_string(),
            Err(err) => err.to_string(),
        }
    }

    /// Gathers listening sockets, pending updates and firewall state.
    /// Individual probes that fail are reported in place.
    pub fn audit(&self, package_manager: Option<&PackageManager>) -> SecurityAudit {
        let listening = match self.executor.run("ss", &["-tulpn"]) {
            Ok(out) => parse_listening(&out.stdout),
            Err(err) => {
                debug!(error = %err, "ss unavailable");
                Vec::new()
            }
        };

        let all_updates = package_manager
            .map(|pm| {
                pm.available_updates().unwrap_or_else(|err| {
                    debug!(error = %err, "update check failed");
                    Vec::new()
                })
            })
            .unwrap_or_default();

        SecurityAudit {
            listening,
            update_count: all_updates.len(),
            updates: all_updates.into_iter().take(AUDIT_UPDATE_PREVIEW).collect(),
            ufw: self.tool_output("ufw", &["status"]),
            fail2ban: self.tool_output("fail2ban-client", &["status"]),
        }
    }
}
