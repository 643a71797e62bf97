use std::{
    fs,
    net::IpAddr,
    path::{Path, PathBuf},
    sync::{LazyLock, PoisonError, RwLock},
};

use regex::Regex;
use runway_utils::{bytes::parse_size, fs::write_file, path::xdg_config_home};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    error::{ConfigError, Result},
    packages::PackagesConfig,
    security::SecurityConfig,
    system::SystemConfig,
};

/// Application configuration, read from JSON.
///
/// Missing fields take their defaults, so a file only needs the settings it
/// changes.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub system: SystemConfig,
    pub security: SecurityConfig,
    pub packages: PackagesConfig,

    /// Upper bound on concurrently running tasks.
    pub parallel_limit: usize,

    /// Show progress bars and spinners.
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

pub static CONFIG: LazyLock<RwLock<Option<Config>>> = LazyLock::new(|| RwLock::new(None));

/// Path given explicitly on the command line. Takes precedence over lookup.
pub static CONFIG_PATH: LazyLock<RwLock<Option<PathBuf>>> = LazyLock::new(|| RwLock::new(None));

static HOSTNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
        .expect("unable to compile hostname regex")
});

static LOCALE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z]{2,3}_[A-Z]{2}(\.[A-Za-z0-9-]+)?(@\w+)?|C|POSIX|C\.UTF-8)$")
        .expect("unable to compile locale regex")
});

const GLOBAL_CONFIG_PATHS: [&str; 2] = [
    "/etc/runway/config.json",
    "/usr/local/etc/runway/config.json",
];

pub fn set_config_path(path: Option<PathBuf>) {
    *CONFIG_PATH.write().unwrap_or_else(PoisonError::into_inner) = path;
}

/// User-level configuration path, used when no file exists anywhere yet.
pub fn user_config_path() -> PathBuf {
    xdg_config_home().join("runway").join("config.json")
}

/// Locations searched for a configuration file, highest priority first.
pub fn config_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::with_capacity(5);
    if let Ok(path) = std::env::var("RUNWAY_CONFIG") {
        if !path.is_empty() {
            candidates.push(PathBuf::from(path));
        }
    }
    candidates.push(PathBuf::from("runway.json"));
    candidates.push(user_config_path());
    candidates.extend(GLOBAL_CONFIG_PATHS.iter().map(PathBuf::from));
    candidates
}

/// The path the configuration is read from: the explicit path if set,
/// otherwise the first existing candidate, otherwise the user path.
pub fn config_path() -> PathBuf {
    if let Some(path) = CONFIG_PATH
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
    {
        return path;
    }

    config_candidates()
        .into_iter()
        .find(|p| p.is_file())
        .unwrap_or_else(user_config_path)
}

pub fn init() -> Result<()> {
    let config = Config::new()?;
    *CONFIG.write().unwrap_or_else(PoisonError::into_inner) = Some(config);
    Ok(())
}

/// Returns the loaded configuration, or the defaults if [`init`] never ran.
pub fn get_config() -> Config {
    let mut guard = CONFIG.write().unwrap_or_else(PoisonError::into_inner);
    guard.get_or_insert_with(Config::default_config).clone()
}

impl Config {
    pub fn default_config() -> Self {
        Self {
            system: SystemConfig::default(),
            security: SecurityConfig::default(),
            packages: PackagesConfig::default(),
            parallel_limit: 4,
            show_progress: true,
        }
    }

    /// A configuration with every field unset, used as the base for
    /// overrides passed to [`Config::merge`].
    pub fn blank() -> Self {
        Self {
            system: SystemConfig::blank(),
            security: SecurityConfig::blank(),
            packages: PackagesConfig::blank(),
            parallel_limit: 0,
            show_progress: true,
        }
    }

    /// Loads from [`config_path`], falling back to the defaults when no file
    /// exists. The result is validated.
    pub fn new() -> Result<Self> {
        let path = config_path();
        let config = if path.is_file() {
            Self::load(&path)?
        } else {
            debug!(path = %path.display(), "no configuration file, using defaults");
            Self::default_config()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut serialized = serde_json::to_string_pretty(self)?;
        serialized.push('\n');
        write_file(path, serialized.as_bytes(), Some(0o644))?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Applies `other` on top of `self`.
    ///
    /// Non-empty strings and non-zero numbers replace the current value. Port,
    /// address and rule lists are replaced when the override has entries.
    /// Package lists are unioned, keeping the existing order first.
    pub fn merge(&mut self, other: Config) {
        self.system.merge(other.system);
        self.security.merge(other.security);
        self.packages.merge(other.packages);
        if other.parallel_limit != 0 {
            self.parallel_limit = other.parallel_limit;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.system.timezone.trim().is_empty() {
            return Err(ConfigError::EmptyTimezone);
        }

        let hostname = &self.system.hostname;
        if !hostname.is_empty() && (hostname.len() > 253 || !HOSTNAME_RE.is_match(hostname)) {
            return Err(ConfigError::InvalidHostname(hostname.clone()));
        }

        let locale = &self.system.locale;
        if !locale.is_empty() && !LOCALE_RE.is_match(locale) {
            return Err(ConfigError::InvalidLocale(locale.clone()));
        }

        let swap = self.system.swap_size.trim();
        if !swap.is_empty() && parse_size(swap).is_err() {
            return Err(ConfigError::InvalidSwapSize(swap.to_string()));
        }

        check_port("security.ssh_port", self.security.ssh_port)?;
        for &port in &self.security.open_ports {
            check_port("security.open_ports", port)?;
        }

        for rule in &self.security.firewall_rules {
            check_port("security.firewall_rules", rule.port)?;
            if rule.protocol != "tcp" && rule.protocol != "udp" {
                return Err(ConfigError::InvalidProtocol(rule.protocol.clone()));
            }
            if rule.action != "allow" && rule.action != "deny" {
                return Err(ConfigError::InvalidAction(rule.action.clone()));
            }
        }

        for ip in &self.security.allow_ips {
            if !is_valid_address(ip) {
                return Err(ConfigError::InvalidAddress(ip.clone()));
            }
        }

        if self.parallel_limit == 0 {
            return Err(ConfigError::InvalidParallelLimit);
        }

        Ok(())
    }
}

fn check_port(field: &str, port: u32) -> Result<()> {
    if (1..=65535).contains(&port) {
        Ok(())
    } else {
        Err(ConfigError::InvalidPort {
            field: field.to_string(),
            port,
        })
    }
}

fn is_valid_address(value: &str) -> bool {
    match value.split_once('/') {
        None => value.parse::<IpAddr>().is_ok(),
        Some((addr, prefix)) => {
            let max = match addr.parse::<IpAddr>() {
                Ok(IpAddr::V4(_)) => 32,
                Ok(IpAddr::V6(_)) => 128,
                Err(_) => return false,
            };
            prefix.parse::<u8>().is_ok_and(|p| p <= max)
        }
    }
}

/// Writes the default configuration to `path` (or the user path) and returns
/// where it went. Refuses to overwrite unless `force` is set.
pub fn generate_default_config(path: Option<&Path>, force: bool) -> Result<PathBuf> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(user_config_path);

    if path.exists() && !force {
        return Err(ConfigError::ConfigAlreadyExists(path));
    }

    Config::default_config().save(&path)?;
    Ok(path)
}
