use std::{collections::HashSet, fmt, str::FromStr};

use runway_config::security::{FirewallRule, SecurityConfig};
use serde::Serialize;

use crate::{error::RunwayError, RunwayResult};

/// Firewall settings, taken from the security section of the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallConfig {
    pub enabled: bool,
    pub ssh_port: u32,
    pub open_ports: Vec<u32>,
    pub allow_ips: Vec<String>,
    pub rules: Vec<FirewallRule>,
}

impl From<&SecurityConfig> for FirewallConfig {
    fn from(config: &SecurityConfig) -> Self {
        Self {
            enabled: config.enable_ufw,
            ssh_port: config.ssh_port,
            open_ports: config.open_ports.clone(),
            allow_ips: config.allow_ips.clone(),
            rules: config.firewall_rules.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UfwStatus {
    Active,
    Inactive,
    Unknown,
}

impl UfwStatus {
    /// Classifies `ufw status` output.
    pub fn parse(output: &str) -> Self {
        if output.contains("Status: active") {
            Self::Active
        } else if output.contains("Status: inactive") {
            Self::Inactive
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for UfwStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Inactive => f.write_str("inactive"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    Allow,
    Deny,
}

impl FromStr for RuleAction {
    type Err = RunwayError;

    fn from_str(s: &str) -> RunwayResult<Self> {
        match s {
            "allow" => Ok(Self::Allow),
            "deny" => Ok(Self::Deny),
            other => Err(RunwayError::UnsupportedRuleAction(other.to_string())),
        }
    }
}

impl RuleAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

/// A single `ufw` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UfwRule {
    Port {
        action: RuleAction,
        port: u32,
        protocol: String,
        comment: Option<String>,
    },
    AllowFrom(String),
}

impl UfwRule {
    fn port(action: RuleAction, port: u32, protocol: &str, comment: impl Into<String>) -> Self {
        let comment = comment.into();
        Self::Port {
            action,
            port,
            protocol: protocol.to_string(),
            comment: (!comment.is_empty()).then_some(comment),
        }
    }

    /// Arguments passed to `ufw`.
    pub fn args(&self) -> Vec<String> {
        match self {
            Self::Port {
                action,
                port,
                protocol,
                comment,
            } => {
                let mut args = vec![action.as_str().to_string(), format!("{port}/{protocol}")];
                if let Some(comment) = comment {
                    args.push("comment".into());
                    args.push(comment.clone());
                }
                args
            }
            Self::AllowFrom(ip) => vec!["allow".into(), "from".into(), ip.clone()],
        }
    }
}

fn valid_port(port: u32) -> bool {
    (1..=65535).contains(&port)
}

/// Orders the rules to apply: SSH first, then open ports, custom rules and
/// finally the trusted source addresses.
///
/// Open ports that are out of range or already covered are skipped. Custom
/// rules with an action other than allow/deny are rejected.
pub fn plan_firewall_rules(config: &FirewallConfig) -> RunwayResult<Vec<UfwRule>> {
    let mut rules = vec![UfwRule::port(
        RuleAction::Allow,
        config.ssh_port,
        "tcp",
        "SSH access",
    )];

    let mut seen = HashSet::from([config.ssh_port]);
    for &port in &config.open_ports {
        if !valid_port(port) || !seen.insert(port) {
            continue;
        }
        rules.push(UfwRule::port(
            RuleAction::Allow,
            port,
            "tcp",
            format!("Port {port}"),
        ));
    }

    for rule in &config.rules {
        let action: RuleAction = rule.action.parse()?;
        rules.push(UfwRule::port(
            action,
            rule.port,
            &rule.protocol,
            rule.comment.clone(),
        ));
    }

    rules.extend(config.allow_ips.iter().cloned().map(UfwRule::AllowFrom));
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> FirewallConfig {
        FirewallConfig {
            enabled: true,
            ssh_port: 2222,
            open_ports: vec![80, 443, 80, 0, 70000, 2222],
            allow_ips: vec!["10.0.0.0/8".into()],
            rules: vec![FirewallRule::new(53, "udp", "deny", "")],
        }
    }

    #[test]
    fn test_ufw_status_parse() {
        assert_eq!(UfwStatus::parse("Status: active\n\nTo Action From"), UfwStatus::Active);
        assert_eq!(UfwStatus::parse("Status: inactive\n"), UfwStatus::Inactive);
        assert_eq!(UfwStatus::parse("ERROR: You need to be root"), UfwStatus::Unknown);
    }

    #[test]
    fn test_plan_firewall_rules() {
        let rules = plan_firewall_rules(&config()).unwrap();
        let rendered: Vec<String> = rules.iter().map(|r| r.args().join(" ")).collect();
        assert_eq!(
            rendered,
            vec![
                "allow 2222/tcp comment SSH access",
                "allow 80/tcp comment Port 80",
                "allow 443/tcp comment Port 443",
                "deny 53/udp",
                "allow from 10.0.0.0/8",
            ]
        );
    }

    #[test]
    fn test_plan_rejects_unknown_action() {
        let mut cfg = config();
        cfg.rules.push(FirewallRule::new(25, "tcp", "reject", "smtp"));
        assert!(matches!(
            plan_firewall_rules(&cfg),
            Err(RunwayError::UnsupportedRuleAction(ref a)) if a == "reject"
        ));
    }

    #[test]
    fn test_from_security_config() {
        let security = SecurityConfig::default();
        let cfg = FirewallConfig::from(&security);
        assert!(cfg.enabled);
        assert_eq!(cfg.ssh_port, 22);
        assert_eq!(cfg.open_ports, vec![80, 443]);
    }
}
