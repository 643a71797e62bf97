use runway_core::{error::RunwayError, system::SystemInfo};
use tracing::info;

use crate::{
    progress::{next_op_id, report_optional_step},
    types::{StepReport, SystemStep},
    RunwayContext,
};

fn not_configured(what: &str) -> Option<String> {
    Some(format!("no {what} configured"))
}

/// Applies the host settings from the `system` config section.
///
/// Steps run in the order given and never stop each other; the returned
/// reports say which completed, were skipped or failed.
pub fn configure_system(ctx: &RunwayContext, steps: &[SystemStep]) -> Vec<StepReport> {
    let op_id = next_op_id();
    let config = &ctx.config().system;
    let manager = ctx.system_manager();

    steps
        .iter()
        .map(|step| {
            let name = step.to_string();
            report_optional_step(ctx.events(), op_id, &name, || {
                match step {
                    SystemStep::Timezone => {
                        if config.timezone.trim().is_empty() {
                            return Ok(not_configured("timezone"));
                        }
                        manager.setup_timezone(&config.timezone)?;
                        Ok(None)
                    }
                    SystemStep::Locale => {
                        if config.locale.trim().is_empty() {
                            return Ok(not_configured("locale"));
                        }
                        manager.setup_locale(&config.locale)?;
                        Ok(None)
                    }
                    SystemStep::Hostname => {
                        let changed = manager.setup_hostname(&config.hostname)?;
                        Ok(if changed {
                            None
                        } else {
                            not_configured("hostname")
                        })
                    }
                    SystemStep::Swap => {
                        match manager.setup_swap(&config.swap_size) {
                            Ok(size) => {
                                info!("Swap enabled: {}", size);
                                Ok(None)
                            }
                            Err(RunwayError::SwapAlreadyConfigured) => {
                                Ok(Some("swap already configured".to_string()))
                            }
                            Err(err) => Err(err),
                        }
                    }
                }
            })
        })
        .collect()
}

pub fn system_info(ctx: &RunwayContext) -> SystemInfo {
    ctx.system_manager().info()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use runway_config::config::Config;
    use runway_core::command::{CommandOutput, RecordingExecutor};
    use runway_events::RunwayEvent;

    use super::*;
    use crate::{context::test_support::test_context, types::StepOutcome};

    #[test]
    fn test_configure_system_continues_after_failure() {
        let mut config = Config::default_config();
        config.system.hostname = "web-01".into();
        let t = test_context(
            config,
            RecordingExecutor::new()
                .with_tools(&["timedatectl", "hostnamectl"])
                .reply("swapon --show", CommandOutput::ok("/swapfile file 2G 0B -2\n")),
        );

        let reports = configure_system(&t.ctx, &SystemStep::ALL);
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].outcome, StepOutcome::Completed);
        assert!(
            matches!(&reports[1].outcome, StepOutcome::Failed(e) if e.contains("locale-gen"))
        );
        assert_eq!(reports[2].outcome, StepOutcome::Completed);
        assert_eq!(
            reports[3].outcome,
            StepOutcome::Skipped("swap already configured".into())
        );

        let calls = t.exec.calls();
        assert!(calls.contains(&"timedatectl set-timezone Europe/Moscow".to_string()));
        assert!(calls.contains(&"hostnamectl set-hostname web-01".to_string()));
    }

    #[test]
    fn test_configure_system_skips_unset_values() {
        let mut config = Config::default_config();
        config.system.timezone.clear();
        let t = test_context(config, RecordingExecutor::new().with_tools(&[]));

        let reports =
            configure_system(&t.ctx, &[SystemStep::Timezone, SystemStep::Hostname]);
        assert_eq!(
            reports[0].outcome,
            StepOutcome::Skipped("no timezone configured".into())
        );
        assert_eq!(
            reports[1].outcome,
            StepOutcome::Skipped("no hostname configured".into())
        );
        assert!(t.exec.calls().is_empty());

        let skipped = t
            .events
            .events()
            .iter()
            .filter(|e| matches!(e, RunwayEvent::StepSkipped { .. }))
            .count();
        assert_eq!(skipped, 2);
    }

    #[test]
    fn test_configure_swap_dry_run_writes_nothing() {
        let t = test_context(
            Config::default_config(),
            RecordingExecutor::new().with_tools(&["fallocate"]),
        );
        let ctx = t.ctx.clone().with_dry_run(true);

        let reports = configure_system(&ctx, &[SystemStep::Swap]);
        assert_eq!(reports[0].outcome, StepOutcome::Completed);
        assert!(!ctx.paths().fstab().exists());

        let calls = t.exec.calls();
        assert!(calls.iter().any(|c| c.starts_with("fallocate -l 2G")));
        assert!(calls.iter().any(|c| c.starts_with("mkswap")));
    }

    #[test]
    fn test_system_info_reads_os_release() {
        let t = test_context(Config::default_config(), RecordingExecutor::new().with_tools(&[]));
        fs::create_dir_all(t.root.path().join("etc")).unwrap();
        fs::write(
            t.ctx.paths().os_release(),
            "ID=debian\nVERSION_ID=\"12\"\nPRETTY_NAME=\"Debian GNU/Linux 12 (bookworm)\"\n",
        )
        .unwrap();

        let info = system_info(&t.ctx);
        assert_eq!(info.distro, "Debian GNU/Linux 12 (bookworm)");
    }
}
