use std::fmt;

use serde::Serialize;

// ---- Steps ----

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: String,
    pub outcome: StepOutcome,
}

impl StepReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, StepOutcome::Failed(_))
    }
}

/// Host configuration steps, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStep {
    Timezone,
    Locale,
    Hostname,
    Swap,
}

impl SystemStep {
    pub const ALL: [Self; 4] = [Self::Timezone, Self::Locale, Self::Hostname, Self::Swap];
}

impl fmt::Display for SystemStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Timezone => "timezone",
            Self::Locale => "locale",
            Self::Hostname => "hostname",
            Self::Swap => "swap",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityStep {
    Firewall,
    Fail2ban,
    Ssh,
}

impl SecurityStep {
    pub const ALL: [Self; 3] = [Self::Firewall, Self::Fail2ban, Self::Ssh];
}

impl fmt::Display for SecurityStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Firewall => "firewall",
            Self::Fail2ban => "fail2ban",
            Self::Ssh => "ssh",
        })
    }
}

// ---- Install ----

/// Report returned after installation completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub installed: Vec<String>,
    /// Already present before the run.
    pub skipped: Vec<String>,
    pub failed: Vec<FailedInfo>,
}

impl InstallReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoveReport {
    pub removed: Vec<String>,
    pub not_installed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedInfo {
    pub name: String,
    pub error: String,
}

// ---- Parallel ----

/// Aggregated result of [`crate::parallel::run_parallel`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParallelReport {
    pub completed: usize,
    pub failed: Vec<FailedInfo>,
}

impl ParallelReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

// ---- Provision ----

/// Which top-level stages a provisioning run includes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionPlan {
    pub update: bool,
    pub packages: bool,
    pub system: bool,
    pub security: bool,
    /// Package categories to install; empty means every enabled category.
    pub categories: Vec<String>,
}

impl Default for ProvisionPlan {
    fn default() -> Self {
        Self {
            update: true,
            packages: true,
            system: true,
            security: true,
            categories: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    pub steps: Vec<StepReport>,
}

impl ProvisionReport {
    pub fn failed(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.is_failed())
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}
