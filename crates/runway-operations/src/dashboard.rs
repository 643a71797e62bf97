use runway_core::dashboard::{self, DashboardSnapshot};

use crate::RunwayContext;

/// Snapshot for the login dashboard, including a summary of the loaded
/// configuration.
pub fn collect(ctx: &RunwayContext) -> DashboardSnapshot {
    dashboard::collect(ctx.executor().as_ref(), ctx.paths(), ctx.config())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use runway_config::config::Config;
    use runway_core::{command::RecordingExecutor, dashboard::ServiceState};

    use super::*;
    use crate::context::test_support::test_context;

    #[test]
    fn test_collect_uses_loaded_config() {
        let mut config = Config::default_config();
        config.security.ssh_port = 2200;
        config.system.timezone = "Asia/Tokyo".into();
        config.security.open_ports = vec![8080];
        let t = test_context(config, RecordingExecutor::new().with_tools(&[]));
        fs::create_dir_all(t.root.path().join("etc")).unwrap();
        fs::write(t.ctx.paths().os_release(), "PRETTY_NAME=\"Alpine Linux v3.20\"\n").unwrap();

        let snap = collect(&t.ctx);
        assert_eq!(snap.ssh_port, 2200);
        assert_eq!(snap.os, "Alpine Linux v3.20");
        assert_eq!(snap.ssh_service, ServiceState::Unknown);
        assert_eq!(snap.ufw, ServiceState::NotInstalled);
        assert!(snap.updates.is_empty());
        assert_eq!(snap.processes, 0);
        assert_eq!(snap.config.timezone, "Asia/Tokyo");
        assert_eq!(snap.config.open_ports, vec![8080]);
    }
}
