use std::fs;

use serde::Serialize;
use tracing::debug;

use crate::{command::CommandExecutor, paths::SystemPaths};

/// Host overview. Fields whose probe failed are left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub distro: String,
    pub version: String,
    pub kernel: String,
    pub uptime: String,
    pub memory: String,
    pub disk: String,
    pub cpu: String,
    pub ip_address: String,
    pub processes: usize,
    pub load_average: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: String,
    pub version_id: String,
    pub pretty_name: String,
}

impl OsRelease {
    /// Pretty name when present, else the bare id.
    pub fn display_name(&self) -> &str {
        if self.pretty_name.is_empty() {
            &self.id
        } else {
            &self.pretty_name
        }
    }
}

pub fn parse_os_release(content: &str) -> OsRelease {
    let mut release = OsRelease::default();
    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'').to_string();
        match key.trim() {
            "ID" => release.id = value,
            "VERSION_ID" => release.version_id = value,
            "PRETTY_NAME" => release.pretty_name = value,
            _ => {}
        }
    }
    release
}

/// Summarises the `Mem:` row of `free -h`.
pub fn parse_free_human(output: &str) -> Option<String> {
    let line = output.lines().nth(1)?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 7 {
        return None;
    }
    Some(format!(
        "Total: {}, Used: {}, Free: {}",
        fields[1], fields[2], fields[6]
    ))
}

/// Total RAM in bytes from `free -b`.
pub fn parse_free_total_bytes(output: &str) -> Option<u64> {
    output
        .lines()
        .nth(1)?
        .split_whitespace()
        .nth(1)?
        .parse()
        .ok()
}

/// First three filesystems of `df -h --output=...`, joined with "; ".
pub fn parse_df(output: &str) -> String {
    output
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(3)
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn parse_lscpu_model(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        line.trim()
            .strip_prefix("Model name:")
            .map(|model| model.trim().to_string())
    })
}

/// The part of `uptime` output after "load average:".
pub fn parse_load_average(output: &str) -> Option<String> {
    output
        .split_once("load average:")
        .map(|(_, load)| load.trim().to_string())
}

pub fn parse_uptime_pretty(output: &str) -> String {
    let trimmed = output.trim();
    trimmed.strip_prefix("up ").unwrap_or(trimmed).to_string()
}

fn probe(executor: &dyn CommandExecutor, program: &str, args: &[&str]) -> Option<String> {
    match executor.run(program, args) {
        Ok(output) if output.success => Some(output.stdout),
        Ok(output) => {
            debug!(program, code = ?output.code, "probe failed");
            None
        }
        Err(err) => {
            debug!(program, error = %err, "probe failed");
            None
        }
    }
}

pub(crate) fn read_os_release(paths: &SystemPaths) -> OsRelease {
    fs::read_to_string(paths.os_release())
        .map(|content| parse_os_release(&content))
        .unwrap_or_default()
}

pub(crate) fn gather(executor: &dyn CommandExecutor, paths: &SystemPaths) -> SystemInfo {
    let release = read_os_release(paths);

    let mut info = SystemInfo {
        distro: release.display_name().to_string(),
        version: release.version_id.clone(),
        ..Default::default()
    };

    if let Some(out) = probe(executor, "uname", &["-r"]) {
        info.kernel = out.trim().to_string();
    }
    if let Some(out) = probe(executor, "uptime", &["-p"]) {
        info.uptime = parse_uptime_pretty(&out);
    }
    if let Some(out) = probe(executor, "free", &["-h"]) {
        info.memory = parse_free_human(&out).unwrap_or_default();
    }
    if let Some(out) = probe(
        executor,
        "df",
        &["-h", "--output=source,size,used,avail,pcent,target"],
    ) {
        info.disk = parse_df(&out);
    }
    if let Some(out) = probe(executor, "lscpu", &[]) {
        info.cpu = parse_lscpu_model(&out).unwrap_or_default();
    }
    if let Some(out) = probe(executor, "hostname", &["-I"]) {
        info.ip_address = out.trim().to_string();
    }
    if let Some(out) = probe(executor, "ps", &["-e", "--no-headers"]) {
        info.processes = out.lines().filter(|l| !l.trim().is_empty()).count();
    }
    if let Some(out) = probe(executor, "uptime", &[]) {
        info.load_average = parse_load_average(&out).unwrap_or_default();
    }

    info
}
