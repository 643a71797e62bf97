use nu_ansi_term::Color::{Blue, Cyan, Green, Red, Yellow};
use runway_core::{
    dashboard::{ConfigSummary, ServiceState},
    RunwayResult,
};
use runway_operations::{dashboard, system, RunwayContext};
use runway_utils::system::platform;
use tracing::info;

use crate::utils::{json_output, key_value_table, print_json, Colored, Icons};

fn service_cell(state: ServiceState) -> String {
    match state {
        ServiceState::Active => format!("{} {}", Colored(Green, Icons::CHECK), state),
        ServiceState::Inactive => format!("{} {}", Colored(Red, Icons::CROSS), state),
        ServiceState::NotInstalled | ServiceState::Unknown => {
            format!("{} {}", Colored(Yellow, Icons::WARNING), state)
        }
    }
}

fn or_unset(value: &str) -> String {
    if value.is_empty() {
        "not set".to_string()
    } else {
        value.to_string()
    }
}

fn config_rows(config: &ConfigSummary) -> Vec<(String, String)> {
    let ports = if config.open_ports.is_empty() {
        "none".to_string()
    } else {
        config
            .open_ports
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let allow_ips = if config.allow_ips.is_empty() {
        "any".to_string()
    } else {
        config.allow_ips.join(", ")
    };
    let packages = config
        .packages
        .iter()
        .filter(|(_, count)| *count > 0)
        .map(|(key, count)| format!("{key} {count}"))
        .collect::<Vec<_>>()
        .join(", ");

    vec![
        ("Timezone".to_string(), or_unset(&config.timezone)),
        ("Hostname".to_string(), or_unset(&config.hostname)),
        ("Swap".to_string(), or_unset(&config.swap_size)),
        ("Open ports".to_string(), ports),
        ("Allowed IPs".to_string(), allow_ips),
        ("Packages".to_string(), or_unset(&packages)),
    ]
}

pub fn display_dashboard(ctx: &RunwayContext) -> RunwayResult<()> {
    let snap = dashboard::collect(ctx);

    if json_output() {
        return print_json(&snap);
    }

    let mut rows = vec![
        ("Hostname".to_string(), Colored(Cyan, &snap.hostname).to_string()),
        ("Time".to_string(), snap.time.clone()),
        ("OS".to_string(), snap.os.clone()),
        ("Kernel".to_string(), snap.kernel.clone()),
        ("Uptime".to_string(), snap.uptime.clone()),
        ("Load".to_string(), snap.load.clone()),
        ("Memory".to_string(), snap.memory.clone()),
        ("Processes".to_string(), snap.processes.to_string()),
        (
            "SSH".to_string(),
            format!(
                "{} (port {})",
                service_cell(snap.ssh_service),
                Colored(Blue, snap.ssh_port)
            ),
        ),
        ("UFW".to_string(), service_cell(snap.ufw)),
        ("Fail2ban".to_string(), service_cell(snap.fail2ban)),
    ];

    if snap.updates.is_empty() {
        rows.push(("Updates".to_string(), "unknown".to_string()));
    }
    for (manager, count) in &snap.updates {
        let count = if *count == 0 {
            Colored(Green, "up to date".to_string())
        } else {
            Colored(Yellow, format!("{count} pending"))
        };
        rows.push((format!("Updates ({manager})"), count.to_string()));
    }
    rows.push(("Last update".to_string(), snap.last_update.clone()));

    info!("\n{}", key_value_table("Server Dashboard", rows));
    info!("{}", key_value_table("Configuration", config_rows(&snap.config)));
    Ok(())
}

pub fn display_info(ctx: &RunwayContext) -> RunwayResult<()> {
    let info = system::system_info(ctx);

    if json_output() {
        return print_json(&info);
    }

    let distro = if info.version.is_empty() {
        info.distro.clone()
    } else {
        format!("{} {}", info.distro, info.version)
    };

    let table = key_value_table(
        "System Information",
        [
            ("Distribution", distro),
            ("Platform", platform()),
            ("Kernel", info.kernel),
            ("Uptime", info.uptime),
            ("CPU", info.cpu),
            ("Memory", info.memory),
            ("Disk (/)", info.disk),
            ("IP address", info.ip_address),
            ("Processes", info.processes.to_string()),
            ("Load average", info.load_average),
        ],
    );
    info!("\n{table}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::utils::{set_flag, COLOR};

    #[test]
    #[serial]
    fn test_service_cell() {
        set_flag(&COLOR, false);
        assert_eq!(service_cell(ServiceState::Active), "✓ active");
        assert_eq!(service_cell(ServiceState::Inactive), "✗ inactive");
        assert_eq!(service_cell(ServiceState::NotInstalled), "⚠ not installed");
        set_flag(&COLOR, true);
    }

    #[test]
    fn test_config_rows() {
        let config = ConfigSummary {
            timezone: "UTC".into(),
            hostname: String::new(),
            swap_size: "1G".into(),
            open_ports: vec![80, 443],
            allow_ips: Vec::new(),
            packages: vec![("basic".into(), 5), ("database".into(), 0), ("web".into(), 2)],
        };

        let rows = config_rows(&config);
        let value = |key: &str| rows.iter().find(|(k, _)| k == key).unwrap().1.clone();
        assert_eq!(value("Hostname"), "not set");
        assert_eq!(value("Open ports"), "80, 443");
        assert_eq!(value("Allowed IPs"), "any");
        assert_eq!(value("Packages"), "basic 5, web 2");
    }
}
