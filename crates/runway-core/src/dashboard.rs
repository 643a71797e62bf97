//! Data behind the login dashboard.

use std::{fmt, fs};

use chrono::{DateTime, Local};
use runway_config::config::Config;
use serde::Serialize;
use tracing::debug;

use crate::{
    command::CommandExecutor,
    constants::{CHECK_UPDATE_AVAILABLE, DASHBOARD_TIME_FORMAT},
    package::categories,
    paths::SystemPaths,
    security::UfwStatus,
    system::info::{parse_uptime_pretty, read_os_release},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Active,
    Inactive,
    NotInstalled,
    Unknown,
}

impl ServiceState {
    /// Classifies `systemctl is-active` output.
    pub fn from_systemctl(output: &str) -> Self {
        match output.trim() {
            "active" => Self::Active,
            "inactive" | "failed" | "deactivating" => Self::Inactive,
            _ => Self::Unknown,
        }
    }

    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::NotInstalled => "not installed",
            Self::Unknown => "unknown",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub hostname: String,
    pub time: String,
    pub os: String,
    pub kernel: String,
    pub uptime: String,
    pub load: String,
    pub memory: String,
    pub processes: usize,
    pub ssh_service: ServiceState,
    pub ssh_port: u32,
    pub ufw: ServiceState,
    pub fail2ban: ServiceState,
    /// Pending update counts per package manager.
    pub updates: Vec<(String, usize)>,
    pub last_update: String,
    pub config: ConfigSummary,
}

/// What the loaded configuration asks for, shown next to the live state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSummary {
    pub timezone: String,
    /// Empty when the hostname is left alone.
    pub hostname: String,
    pub swap_size: String,
    pub open_ports: Vec<u32>,
    pub allow_ips: Vec<String>,
    /// Package count per category key, including built-in extras.
    pub packages: Vec<(String, usize)>,
}

impl ConfigSummary {
    pub fn from_config(config: &Config) -> Self {
        let mut packages: Vec<(String, usize)> = categories(&config.packages)
            .into_iter()
            .map(|c| (c.key, c.packages.len()))
            .collect();
        packages.sort();

        Self {
            timezone: config.system.timezone.clone(),
            hostname: config.system.hostname.clone(),
            swap_size: config.system.swap_size.clone(),
            open_ports: config.security.open_ports.clone(),
            allow_ips: config.security.allow_ips.clone(),
            packages,
        }
    }
}

/// First three fields of `/proc/loadavg`.
pub fn parse_loadavg(content: &str) -> String {
    content
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

fn meminfo_kb(content: &str, key: &str) -> Option<f64> {
    content.lines().find_map(|line| {
        line.strip_prefix(key)?
            .strip_prefix(':')?
            .split_whitespace()
            .next()?
            .parse()
            .ok()
    })
}

/// `used/totalGB (pct%)` from `/proc/meminfo`, counting MemAvailable as free.
pub fn parse_meminfo(content: &str) -> Option<String> {
    let total = meminfo_kb(content, "MemTotal")?;
    let available = meminfo_kb(content, "MemAvailable")
        .or_else(|| meminfo_kb(content, "MemFree"))?;
    if total <= 0.0 {
        return None;
    }

    let to_gb = |kb: f64| kb / 1024.0 / 1024.0;
    let used = total - available;
    Some(format!(
        "{:.1}/{:.1}GB ({:.0}%)",
        to_gb(used),
        to_gb(total),
        used / total * 100.0
    ))
}

/// Pending updates reported by `apt list --upgradable`, minus its header.
pub fn count_apt_updates(output: &str) -> usize {
    let lines = output.lines().filter(|l| !l.trim().is_empty()).count();
    lines.saturating_sub(1)
}

fn run_stdout(executor: &dyn CommandExecutor, program: &str, args: &[&str]) -> Option<String> {
    match executor.run(program, args) {
        Ok(out) if out.success => Some(out.stdout),
        Ok(_) => None,
        Err(err) => {
            debug!(program, error = %err, "dashboard probe failed");
            None
        }
    }
}

fn hostname() -> String {
    nix::unistd::gethostname()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn count_processes(paths: &SystemPaths) -> usize {
    fs::read_dir(paths.proc_dir())
        .map(|entries| {
            entries
                .flatten()
                .filter(|e| {
                    e.file_name()
                        .to_str()
                        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
                })
                .count()
        })
        .unwrap_or(0)
}

fn ssh_state(executor: &dyn CommandExecutor) -> ServiceState {
    if !executor.exists("systemctl") {
        return ServiceState::Unknown;
    }
    let mut state = ServiceState::Unknown;
    for unit in ["ssh", "sshd"] {
        if let Ok(out) = executor.run("systemctl", &["is-active", unit]) {
            state = ServiceState::from_systemctl(&out.stdout);
            if state.is_active() {
                break;
            }
        }
    }
    state
}

fn ufw_state(executor: &dyn CommandExecutor) -> ServiceState {
    if !executor.exists("ufw") {
        return ServiceState::NotInstalled;
    }
    match executor.run("ufw", &["status"]) {
        Ok(out) => {
            match UfwStatus::parse(&out.stdout) {
                UfwStatus::Active => ServiceState::Active,
                UfwStatus::Inactive => ServiceState::Inactive,
                UfwStatus::Unknown => ServiceState::Unknown,
            }
        }
        Err(_) => ServiceState::Unknown,
    }
}

fn fail2ban_state(executor: &dyn CommandExecutor) -> ServiceState {
    if !executor.exists("fail2ban-client") {
        return ServiceState::NotInstalled;
    }
    match executor.run("fail2ban-client", &["status"]) {
        Ok(out) if out.success => ServiceState::Active,
        Ok(_) => ServiceState::Inactive,
        Err(_) => ServiceState::Unknown,
    }
}

fn pending_updates(executor: &dyn CommandExecutor) -> Vec<(String, usize)> {
    let mut updates = Vec::new();

    if executor.exists("apt") {
        if let Some(out) = run_stdout(executor, "apt", &["list", "--upgradable"]) {
            updates.push(("apt".to_string(), count_apt_updates(&out)));
        }
    }

    for manager in ["dnf", "yum"] {
        if !executor.exists(manager) {
            continue;
        }
        match executor.run(manager, &["check-update", "--quiet"]) {
            Ok(out) if out.success || out.code == Some(CHECK_UPDATE_AVAILABLE) => {
                updates.push((manager.to_string(), out.lines().count()));
            }
            Ok(_) | Err(_) => debug!(manager, "update count unavailable"),
        }
    }

    updates
}

fn last_update(paths: &SystemPaths) -> String {
    fs::metadata(paths.apt_update_stamp())
        .and_then(|m| m.modified())
        .map(|mtime| {
            DateTime::<Local>::from(mtime)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|_| "Never".to_string())
}

/// Gathers everything the dashboard shows. Probes never fail the snapshot;
/// missing data is left empty.
pub fn collect(executor: &dyn CommandExecutor, paths: &SystemPaths, config: &Config) -> DashboardSnapshot {
    let memory = fs::read_to_string(paths.meminfo())
        .ok()
        .and_then(|c| parse_meminfo(&c))
        .unwrap_or_default();
    let load = fs::read_to_string(paths.loadavg())
        .map(|c| parse_loadavg(&c))
        .unwrap_or_default();

    DashboardSnapshot {
        hostname: hostname(),
        time: Local::now().format(DASHBOARD_TIME_FORMAT).to_string(),
        os: read_os_release(paths).display_name().to_string(),
        kernel: run_stdout(executor, "uname", &["-r"])
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        uptime: run_stdout(executor, "uptime", &["-p"])
            .map(|s| parse_uptime_pretty(&s))
            .unwrap_or_default(),
        load,
        memory,
        processes: count_processes(paths),
        ssh_service: ssh_state(executor),
        ssh_port: config.security.ssh_port,
        ufw: ufw_state(executor),
        fail2ban: fail2ban_state(executor),
        updates: pending_updates(executor),
        last_update: last_update(paths),
        config: ConfigSummary::from_config(config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOutput, RecordingExecutor};

    const MEMINFO: &str = "MemTotal:        8000000 kB
MemFree:          500000 kB
MemAvailable:    6000000 kB
Buffers:          100000 kB
";

    #[test]
    fn test_parse_loadavg() {
        assert_eq!(parse_loadavg("0.52 0.58 0.59 1/389 12345\n"), "0.52 0.58 0.59");
    }

    #[test]
    fn test_parse_meminfo() {
        assert_eq!(parse_meminfo(MEMINFO).unwrap(), "1.9/7.6GB (25%)");
        assert_eq!(parse_meminfo("Buffers: 1 kB\n"), None);
    }

    #[test]
    fn test_service_state() {
        assert_eq!(ServiceState::from_systemctl("active\n"), ServiceState::Active);
        assert_eq!(ServiceState::from_systemctl("failed"), ServiceState::Inactive);
        assert_eq!(ServiceState::from_systemctl("activating"), ServiceState::Unknown);
        assert_eq!(ServiceState::NotInstalled.to_string(), "not installed");
    }

    #[test]
    fn test_count_apt_updates() {
        assert_eq!(count_apt_updates("Listing... Done\n"), 0);
        assert_eq!(count_apt_updates("Listing... Done\na/b 1\nc/d 2\n"), 2);
        assert_eq!(count_apt_updates(""), 0);
    }

    #[test]
    fn test_collect() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SystemPaths::with_root(dir.path());
        fs::create_dir_all(dir.path().join("proc/1")).unwrap();
        fs::create_dir_all(dir.path().join("proc/42")).unwrap();
        fs::create_dir_all(dir.path().join("proc/self")).unwrap();
        fs::write(paths.meminfo(), MEMINFO).unwrap();
        fs::write(paths.loadavg(), "0.10 0.20 0.30 1/100 999").unwrap();

        let exec = RecordingExecutor::new()
            .with_tools(&["systemctl", "ufw", "dnf"])
            .reply("systemctl is-active ssh", CommandOutput::with_code(3, "inactive\n"))
            .reply("systemctl is-active sshd", CommandOutput::ok("active\n"))
            .reply("ufw status", CommandOutput::ok("Status: inactive"))
            .reply("dnf check-update", CommandOutput::with_code(100, "a.x86_64 1 updates\nb.noarch 2 updates\n"))
            .reply("uname -r", CommandOutput::ok("6.8.0\n"));

        let mut config = Config::default_config();
        config.security.ssh_port = 2222;
        let snap = collect(&exec, &paths, &config);
        assert_eq!(snap.kernel, "6.8.0");
        assert_eq!(snap.load, "0.10 0.20 0.30");
        assert_eq!(snap.memory, "1.9/7.6GB (25%)");
        assert_eq!(snap.processes, 2);
        assert_eq!(snap.ssh_service, ServiceState::Active);
        assert_eq!(snap.ssh_port, 2222);
        assert_eq!(snap.ufw, ServiceState::Inactive);
        assert_eq!(snap.fail2ban, ServiceState::NotInstalled);
        assert_eq!(snap.updates, vec![("dnf".to_string(), 2)]);
        assert_eq!(snap.last_update, "Never");
        assert_eq!(snap.config.timezone, config.system.timezone);
    }

    #[test]
    fn test_config_summary() {
        let mut config = Config::default_config();
        config.system.swap_size = "4G".into();
        config.security.open_ports = vec![80, 443];
        config.security.allow_ips = vec!["10.0.0.0/8".into()];
        config.packages.web = vec!["nginx".into(), "certbot".into()];
        config.packages.database = Vec::new();

        let summary = ConfigSummary::from_config(&config);
        assert_eq!(summary.swap_size, "4G");
        assert_eq!(summary.open_ports, vec![80, 443]);
        assert_eq!(summary.allow_ips, vec!["10.0.0.0/8"]);
        assert_eq!(summary.packages.len(), 9);
        assert!(summary.packages.contains(&("web".to_string(), 2)));
        assert!(summary.packages.contains(&("database".to_string(), 0)));
        assert!(summary.packages.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
