use tracing::info;

use super::SecurityManager;
use crate::{
    constants::{FAIL2BAN_BANTIME, FAIL2BAN_FINDTIME, FAIL2BAN_IGNOREIP, FAIL2BAN_MAXRETRY},
    package::PackageManager,
    RunwayResult,
};

/// Contents of `/etc/fail2ban/jail.local` protecting sshd on `ssh_port`.
pub fn render_jail_local(ssh_port: u32) -> String {
    format!(
        "[DEFAULT]
bantime = {FAIL2BAN_BANTIME}
findtime = {FAIL2BAN_FINDTIME}
maxretry = {FAIL2BAN_MAXRETRY}
ignoreip = {FAIL2BAN_IGNOREIP}

[sshd]
enabled = true
port = {ssh_port}
logpath = %(sshd_log)s
backend = %(sshd_backend)s
"
    )
}

impl SecurityManager {
    pub fn setup_fail2ban(
        &self,
        ssh_port: u32,
        package_manager: Option<&PackageManager>,
    ) -> RunwayResult<()> {
        self.ensure_tool("fail2ban-client", "fail2ban", package_manager)?;

        let jail = self.paths.fail2ban_jail();
        self.write(&jail, render_jail_local(ssh_port).as_bytes(), 0o644)?;

        self.executor.check("systemctl", &["enable", "fail2ban"])?;
        self.executor.check("systemctl", &["restart", "fail2ban"])?;

        info!("Fail2ban protecting sshd on port {}", ssh_port);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc};

    use super::*;
    use crate::{
        command::RecordingExecutor, error::RunwayError, package::PackageManagerKind,
        paths::SystemPaths,
    };

    #[test]
    fn test_render_jail_local() {
        let jail = render_jail_local(2222);
        assert!(jail.starts_with("[DEFAULT]\nbantime = 3600\nfindtime = 600\nmaxretry = 5\n"));
        assert!(jail.contains("ignoreip = 127.0.0.1/8\n"));
        assert!(jail.contains("[sshd]\nenabled = true\nport = 2222\n"));
        assert!(jail.contains("logpath = %(sshd_log)s"));
    }

    #[test]
    fn test_setup_fail2ban_installs_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SystemPaths::with_root(dir.path());
        let exec = Arc::new(RecordingExecutor::new().with_tools(&["apt"]));
        let pm = PackageManager::new(PackageManagerKind::Apt, exec.clone());
        let manager = SecurityManager::new(exec.clone(), paths.clone());

        manager.setup_fail2ban(22, Some(&pm)).unwrap();

        assert_eq!(
            exec.calls(),
            vec![
                "apt install -y fail2ban",
                "systemctl enable fail2ban",
                "systemctl restart fail2ban"
            ]
        );
        let jail = fs::read_to_string(paths.fail2ban_jail()).unwrap();
        assert!(jail.contains("port = 22\n"));
    }

    #[test]
    fn test_setup_fail2ban_without_package_manager() {
        let dir = tempfile::tempdir().unwrap();
        let exec = Arc::new(RecordingExecutor::new().with_tools(&[]));
        let manager = SecurityManager::new(exec, SystemPaths::with_root(dir.path()));
        assert!(matches!(
            manager.setup_fail2ban(22, None),
            Err(RunwayError::NoPackageManager)
        ));
    }
}
