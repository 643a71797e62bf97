use std::path::PathBuf;

use miette::Diagnostic;
use runway_utils::error::{FileSystemError, PathError, SizeError, UtilsError};
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("JSON error in configuration: {0}")]
    #[diagnostic(
        code(runway_config::json),
        help("Check your config.json syntax and structure")
    )]
    Json(#[from] serde_json::Error),

    #[error("Configuration file already exists: {}", .0.display())]
    #[diagnostic(
        code(runway_config::already_exists),
        help("Remove the existing config file or pass --force")
    )]
    ConfigAlreadyExists(PathBuf),

    #[error("Timezone cannot be empty")]
    #[diagnostic(
        code(runway_config::empty_timezone),
        help("Set system.timezone, for example \"Europe/Moscow\" or \"UTC\"")
    )]
    EmptyTimezone,

    #[error("Invalid port {port} in {field}")]
    #[diagnostic(
        code(runway_config::invalid_port),
        help("Ports must be between 1 and 65535")
    )]
    InvalidPort { field: String, port: u32 },

    #[error("Invalid protocol `{0}` in firewall rule")]
    #[diagnostic(
        code(runway_config::invalid_protocol),
        help("Use \"tcp\" or \"udp\"")
    )]
    InvalidProtocol(String),

    #[error("Invalid action `{0}` in firewall rule")]
    #[diagnostic(
        code(runway_config::invalid_action),
        help("Use \"allow\" or \"deny\"")
    )]
    InvalidAction(String),

    #[error("Invalid swap size `{0}`")]
    #[diagnostic(
        code(runway_config::invalid_swap_size),
        help("Use a size like \"2G\", \"512M\", or leave it empty for automatic sizing")
    )]
    InvalidSwapSize(String),

    #[error("Invalid address `{0}` in security.allow_ips")]
    #[diagnostic(
        code(runway_config::invalid_address),
        help("Use an IPv4/IPv6 address or a CIDR block such as 10.0.0.0/8")
    )]
    InvalidAddress(String),

    #[error("Invalid hostname `{0}`")]
    #[diagnostic(
        code(runway_config::invalid_hostname),
        help("Hostnames use letters, digits and hyphens, with dots between labels")
    )]
    InvalidHostname(String),

    #[error("Invalid locale `{0}`")]
    #[diagnostic(
        code(runway_config::invalid_locale),
        help("Use a locale name like \"en_US.UTF-8\"")
    )]
    InvalidLocale(String),

    #[error("parallel_limit must be at least 1")]
    #[diagnostic(code(runway_config::invalid_parallel_limit))]
    InvalidParallelLimit,

    #[error("IO error: {0}")]
    #[diagnostic(code(runway_config::io))]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(runway_config::utils))]
    Utils(#[from] UtilsError),
}

impl From<PathError> for ConfigError {
    fn from(err: PathError) -> Self {
        Self::Utils(UtilsError::Path(err))
    }
}

impl From<SizeError> for ConfigError {
    fn from(err: SizeError) -> Self {
        Self::Utils(UtilsError::Size(err))
    }
}

impl From<FileSystemError> for ConfigError {
    fn from(err: FileSystemError) -> Self {
        Self::Utils(UtilsError::FileSystem(err))
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
