use serde::{Deserialize, Serialize};

/// A single UFW rule from the configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct FirewallRule {
    pub port: u32,

    /// `tcp` or `udp`.
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// `allow` or `deny`.
    #[serde(default = "default_action")]
    pub action: String,

    #[serde(default)]
    pub comment: String,
}

fn default_protocol() -> String {
    "tcp".into()
}

fn default_action() -> String {
    "allow".into()
}

impl FirewallRule {
    pub fn new(port: u32, protocol: &str, action: &str, comment: &str) -> Self {
        Self {
            port,
            protocol: protocol.into(),
            action: action.into(),
            comment: comment.into(),
        }
    }
}

/// Firewall, intrusion prevention and SSH settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub ssh_port: u32,
    pub open_ports: Vec<u32>,

    /// Addresses or CIDR blocks granted full access through UFW.
    pub allow_ips: Vec<String>,

    pub enable_ufw: bool,
    pub enable_fail2ban: bool,
    pub firewall_rules: Vec<FirewallRule>,

    /// Written to sshd_config as `PermitRootLogin yes|no`.
    pub permit_root_login: bool,

    /// Written to sshd_config as `PasswordAuthentication yes|no`.
    pub password_authentication: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            ssh_port: 22,
            open_ports: vec![80, 443],
            allow_ips: vec!["127.0.0.1".into()],
            enable_ufw: true,
            enable_fail2ban: true,
            firewall_rules: vec![
                FirewallRule::new(22, "tcp", "allow", "SSH access"),
                FirewallRule::new(80, "tcp", "allow", "HTTP"),
                FirewallRule::new(443, "tcp", "allow", "HTTPS"),
            ],
            permit_root_login: false,
            password_authentication: true,
        }
    }
}

impl SecurityConfig {
    pub(crate) fn blank() -> Self {
        Self {
            ssh_port: 0,
            open_ports: Vec::new(),
            allow_ips: Vec::new(),
            firewall_rules: Vec::new(),
            ..Self::default()
        }
    }

    /// Overrides apply only where the other side is set. Boolean switches are
    /// never overridden here since `false` cannot be told apart from unset.
    pub(crate) fn merge(&mut self, other: SecurityConfig) {
        if other.ssh_port != 0 {
            self.ssh_port = other.ssh_port;
        }
        if !other.open_ports.is_empty() {
            self.open_ports = other.open_ports;
        }
        if !other.allow_ips.is_empty() {
            self.allow_ips = other.allow_ips;
        }
        if !other.firewall_rules.is_empty() {
            self.firewall_rules = other.firewall_rules;
        }
    }
}
