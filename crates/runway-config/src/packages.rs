use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Package lists grouped by purpose. Each list can be installed with
/// `runway install --category <key>`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PackagesConfig {
    pub basic: Vec<String>,
    pub network: Vec<String>,
    pub monitoring: Vec<String>,
    pub development: Vec<String>,
    pub archive: Vec<String>,
    pub security: Vec<String>,
    pub system: Vec<String>,
    pub database: Vec<String>,
    pub web: Vec<String>,
}

fn list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for PackagesConfig {
    fn default() -> Self {
        Self {
            basic: list(&[
                "nano", "vim", "micro", "htop", "btop", "glances", "git", "curl", "wget", "rsync",
                "tree", "tmux", "screen", "zsh",
            ]),
            archive: list(&[
                "gzip", "gunzip", "zip", "unzip", "p7zip-full", "p7zip-rar", "unrar", "bzip2",
                "xz-utils", "zstd", "lz4", "tar", "cpio", "lzop",
            ]),
            network: list(&[
                "net-tools",
                "iproute2",
                "nmap",
                "traceroute",
                "mtr-tiny",
                "tcpdump",
                "openssh-client",
                "openssh-server",
                "dnsutils",
                "whois",
                "netcat-openbsd",
            ]),
            monitoring: list(&[
                "nmon", "iotop", "dstat", "vnstat", "atop", "sar", "sysstat",
            ]),
            development: list(&[
                "build-essential",
                "gcc",
                "g++",
                "python3",
                "python3-pip",
                "nodejs",
                "golang-go",
                "make",
                "cmake",
            ]),
            security: list(&["ufw", "fail2ban", "rkhunter", "chkrootkit", "clamav"]),
            system: list(&["mc", "ncdu", "bat", "fzf", "ripgrep", "jq", "yq"]),
            database: Vec::new(),
            web: Vec::new(),
        }
    }
}

impl PackagesConfig {
    pub(crate) fn blank() -> Self {
        Self {
            basic: Vec::new(),
            network: Vec::new(),
            monitoring: Vec::new(),
            development: Vec::new(),
            archive: Vec::new(),
            security: Vec::new(),
            system: Vec::new(),
            database: Vec::new(),
            web: Vec::new(),
        }
    }

    /// All lists keyed by category name, in a fixed order.
    pub fn lists(&self) -> [(&'static str, &[String]); 9] {
        [
            ("basic", self.basic.as_slice()),
            ("network", self.network.as_slice()),
            ("monitoring", self.monitoring.as_slice()),
            ("development", self.development.as_slice()),
            ("archive", self.archive.as_slice()),
            ("security", self.security.as_slice()),
            ("system", self.system.as_slice()),
            ("database", self.database.as_slice()),
            ("web", self.web.as_slice()),
        ]
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.lists()
            .into_iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }

    pub(crate) fn merge(&mut self, other: PackagesConfig) {
        union(&mut self.basic, other.basic);
        union(&mut self.network, other.network);
        union(&mut self.monitoring, other.monitoring);
        union(&mut self.development, other.development);
        union(&mut self.archive, other.archive);
        union(&mut self.security, other.security);
        union(&mut self.system, other.system);
        union(&mut self.database, other.database);
        union(&mut self.web, other.web);
    }
}

/// Appends packages from `extra` not already present, keeping the order of
/// first appearance.
fn union(base: &mut Vec<String>, extra: Vec<String>) {
    let mut seen: HashSet<String> = HashSet::with_capacity(base.len() + extra.len());
    base.retain(|pkg| seen.insert(pkg.clone()));
    for pkg in extra {
        if seen.insert(pkg.clone()) {
            base.push(pkg);
        }
    }
}
