//! Firewall, intrusion prevention and SSH hardening.

use std::{path::Path, sync::Arc};

use runway_utils::fs::write_file;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    command::CommandExecutor,
    error::RunwayError,
    package::PackageManager,
    paths::SystemPaths,
    RunwayResult,
};

pub mod audit;
pub mod fail2ban;
pub mod firewall;
pub mod ssh;

pub use audit::SecurityAudit;
pub use firewall::{plan_firewall_rules, FirewallConfig, UfwRule, UfwStatus};
pub use ssh::{harden_sshd_config, SshSettings};

/// Result of [`SecurityManager::setup_firewall`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FirewallOutcome {
    Disabled,
    /// UFW was already running; its numbered rule list is returned untouched.
    AlreadyActive { rules: String },
    Configured { applied: usize, status: String },
}

pub struct SecurityManager {
    executor: Arc<dyn CommandExecutor>,
    paths: SystemPaths,
    dry_run: bool,
}

impl SecurityManager {
    pub fn new(executor: Arc<dyn CommandExecutor>, paths: SystemPaths) -> Self {
        Self {
            executor,
            paths,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub(crate) fn write(&self, path: &Path, contents: &[u8], mode: u32) -> RunwayResult<()> {
        if self.dry_run {
            info!("Would write {}", path.display());
            return Ok(());
        }
        write_file(path, contents, Some(mode))?;
        Ok(())
    }

    /// Installs `package` when `tool` is not on the PATH.
    pub(crate) fn ensure_tool(
        &self,
        tool: &str,
        package: &str,
        package_manager: Option<&PackageManager>,
    ) -> RunwayResult<()> {
        if self.executor.exists(tool) {
            return Ok(());
        }

        let pm = package_manager.ok_or(RunwayError::NoPackageManager)?;
        info!("Installing {}", package);
        pm.install_one(package)
    }

    fn ufw(&self, args: &[&str]) -> RunwayResult<String> {
        Ok(self.executor.check("ufw", args)?.stdout)
    }

    pub fn ufw_status(&self) -> RunwayResult<UfwStatus> {
        let output = self.executor.run("ufw", &["status"])?;
        Ok(UfwStatus::parse(&output.stdout))
    }

    /// Configures and enables UFW from scratch unless it is already active.
    pub fn setup_firewall(
        &self,
        config: &FirewallConfig,
        package_manager: Option<&PackageManager>,
    ) -> RunwayResult<FirewallOutcome> {
        if !config.enabled {
            debug!("ufw disabled in config");
            return Ok(FirewallOutcome::Disabled);
        }

        // Rejected rules must fail before the firewall is reset.
        let rules = plan_firewall_rules(config)?;

        self.ensure_tool("ufw", "ufw", package_manager)?;

        match self.ufw_status()? {
            UfwStatus::Active => {
                info!("UFW is already active, leaving its rules in place");
                let rules = self.ufw(&["status", "numbered"])?;
                return Ok(FirewallOutcome::AlreadyActive { rules });
            }
            UfwStatus::Inactive => {}
            // Recorded commands have no real status to report.
            UfwStatus::Unknown if self.dry_run => {
                debug!("ufw status unknown in dry run, assuming inactive");
            }
            UfwStatus::Unknown => return Err(RunwayError::FirewallStatusUnknown),
        }

        self.ufw(&["--force", "reset"])?;
        self.ufw(&["default", "deny", "incoming"])?;
        self.ufw(&["default", "allow", "outgoing"])?;

        for rule in &rules {
            let args = rule.args();
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            self.ufw(&args)?;
        }

        self.ufw(&["logging", "on"])?;
        self.ufw(&["--force", "enable"])?;
        let status = self.ufw(&["status", "verbose"])?;

        info!("UFW enabled with {} rules", rules.len());
        Ok(FirewallOutcome::Configured {
            applied: rules.len(),
            status,
        })
    }
}
