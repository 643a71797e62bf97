use std::{collections::HashSet, fs, path::PathBuf};

use chrono::Local;
use runway_config::security::SecurityConfig;
use tracing::{info, warn};

use super::SecurityManager;
use crate::{
    constants::{SSHD_BACKUP_TIME_FORMAT, SSHD_RECOMMENDED},
    error::ErrorContext,
    RunwayResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SshSettings {
    pub port: u32,
    pub permit_root_login: bool,
    pub password_authentication: bool,
}

impl From<&SecurityConfig> for SshSettings {
    fn from(config: &SecurityConfig) -> Self {
        Self {
            port: config.ssh_port,
            permit_root_login: config.permit_root_login,
            password_authentication: config.password_authentication,
        }
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn directive_key(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    trimmed.split_whitespace().next()
}

/// Rewrites an sshd_config.
///
/// Active `Port`, `PermitRootLogin` and `PasswordAuthentication` lines take the
/// configured values; missing ones are added together with any recommended
/// option not already set. Comments, blank lines and `Match` blocks are kept
/// as they are, and new lines go before the first `Match` so they stay global.
pub fn harden_sshd_config(content: &str, settings: &SshSettings) -> String {
    let managed = [
        ("Port", settings.port.to_string()),
        ("PermitRootLogin", yes_no(settings.permit_root_login).to_string()),
        (
            "PasswordAuthentication",
            yes_no(settings.password_authentication).to_string(),
        ),
    ];

    let mut global: Vec<String> = Vec::new();
    let mut match_block: Vec<String> = Vec::new();
    let mut present: HashSet<String> = HashSet::new();

    for line in content.lines() {
        let key = directive_key(line);
        if !match_block.is_empty() || key.is_some_and(|k| k.eq_ignore_ascii_case("Match")) {
            match_block.push(line.to_string());
            continue;
        }

        let Some(key) = key else {
            global.push(line.to_string());
            continue;
        };

        match managed.iter().find(|(name, _)| name.eq_ignore_ascii_case(key)) {
            Some((name, value)) => global.push(format!("{name} {value}")),
            None => global.push(line.to_string()),
        }
        present.insert(key.to_ascii_lowercase());
    }

    for (name, value) in &managed {
        if !present.contains(&name.to_ascii_lowercase()) {
            global.push(format!("{name} {value}"));
        }
    }

    let missing: Vec<_> = SSHD_RECOMMENDED
        .iter()
        .filter(|(name, _)| !present.contains(&name.to_ascii_lowercase()))
        .collect();
    if !missing.is_empty() {
        global.push(String::new());
        global.push("# Additional security settings".into());
        global.extend(missing.iter().map(|(name, value)| format!("{name} {value}")));
    }

    if !match_block.is_empty() {
        global.push(String::new());
        global.extend(match_block);
    }

    let mut out = global.join("\n");
    out.push('\n');
    out
}

impl SecurityManager {
    /// Backs up and rewrites sshd_config, then restarts the SSH service.
    ///
    /// Returns the backup path.
    pub fn setup_ssh(&self, settings: &SshSettings) -> RunwayResult<PathBuf> {
        let config_path = self.paths.sshd_config();
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;

        let stamp = Local::now().format(SSHD_BACKUP_TIME_FORMAT);
        let mut backup = config_path.clone().into_os_string();
        backup.push(format!(".backup.{stamp}"));
        let backup = PathBuf::from(backup);

        self.write(&backup, content.as_bytes(), 0o600)?;
        info!("Backed up sshd_config to {}", backup.display());

        let hardened = harden_sshd_config(&content, settings);
        self.write(&config_path, hardened.as_bytes(), 0o644)?;

        let restarted = self.executor.run("systemctl", &["restart", "ssh"])?;
        if !restarted.success {
            warn!("ssh.service restart failed, trying sshd");
            self.executor.check("systemctl", &["restart", "sshd"])?;
        }

        info!("SSH hardened on port {}", settings.port);
        Ok(backup)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        command::{CommandOutput, RecordingExecutor},
        paths::SystemPaths,
    };

    const SETTINGS: SshSettings = SshSettings {
        port: 2222,
        permit_root_login: false,
        password_authentication: true,
    };

    #[test]
    fn test_harden_replaces_active_lines() {
        let content = "# Port 22\nPort 22\n\nPermitRootLogin yes\nUsePAM yes\n";
        let out = harden_sshd_config(content, &SETTINGS);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "# Port 22");
        assert_eq!(lines[1], "Port 2222");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "PermitRootLogin no");
        assert_eq!(lines[4], "UsePAM yes");
        assert_eq!(lines[5], "PasswordAuthentication yes");
        assert!(out.contains("# Additional security settings\nProtocol 2\n"));
        assert!(out.contains("X11Forwarding no\n"));
    }

    #[test]
    fn test_harden_is_idempotent() {
        let once = harden_sshd_config("Port 22\n", &SETTINGS);
        let twice = harden_sshd_config(&once, &SETTINGS);
        assert_eq!(once, twice);
        assert_eq!(twice.matches("MaxAuthTries").count(), 1);
    }

    #[test]
    fn test_harden_keeps_existing_recommended_values() {
        let out = harden_sshd_config("MaxAuthTries 6\nx11forwarding yes\n", &SETTINGS);
        assert!(out.contains("MaxAuthTries 6"));
        assert!(!out.contains("MaxAuthTries 3"));
        assert!(out.contains("x11forwarding yes"));
        assert!(!out.contains("X11Forwarding no"));
    }

    #[test]
    fn test_harden_inserts_before_match() {
        let content = "Port 22\nMatch User backup\n    PasswordAuthentication no\n";
        let out = harden_sshd_config(content, &SETTINGS);
        let match_at = out.find("Match User backup").unwrap();
        let global_pw = out.find("PasswordAuthentication yes").unwrap();
        assert!(global_pw < match_at);
        assert!(out.ends_with("Match User backup\n    PasswordAuthentication no\n"));
    }

    #[test]
    fn test_setup_ssh_writes_backup_and_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SystemPaths::with_root(dir.path());
        fs::create_dir_all(paths.sshd_config().parent().unwrap()).unwrap();
        fs::write(paths.sshd_config(), "Port 22\n").unwrap();

        let exec = Arc::new(
            RecordingExecutor::new()
                .reply("systemctl restart ssh", CommandOutput::failed(5, "Unit ssh.service not found"))
                .reply("systemctl restart sshd", CommandOutput::ok("")),
        );
        let manager = SecurityManager::new(exec.clone(), paths.clone());
        let backup = manager.setup_ssh(&SETTINGS).unwrap();

        assert_eq!(fs::read_to_string(&backup).unwrap(), "Port 22\n");
        assert!(backup
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("sshd_config.backup."));
        assert!(fs::read_to_string(paths.sshd_config())
            .unwrap()
            .starts_with("Port 2222\n"));
        assert_eq!(
            exec.calls(),
            vec!["systemctl restart ssh", "systemctl restart sshd"]
        );
    }
}
