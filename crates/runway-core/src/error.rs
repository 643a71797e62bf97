//! Error types for runway-core.

use std::path::PathBuf;

use miette::Diagnostic;
use runway_config::error::ConfigError;
use runway_utils::error::{FileSystemError, LockError, PathError, SizeError};
use thiserror::Error;

/// Core error type for provisioning operations.
#[derive(Error, Diagnostic, Debug)]
pub enum RunwayError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(code(runway::system), help("Check system permissions and resources"))]
    Errno(#[from] nix::errno::Errno),

    #[error(transparent)]
    #[diagnostic(code(runway::fs))]
    FileSystemError(#[from] FileSystemError),

    #[error(transparent)]
    #[diagnostic(code(runway::path))]
    PathError(#[from] PathError),

    #[error(transparent)]
    #[diagnostic(code(runway::size), help("Use a size like 512M or 2G"))]
    SizeError(#[from] SizeError),

    #[error(transparent)]
    #[diagnostic(
        code(runway::lock),
        help("Another runway process may be running. Wait for it to finish.")
    )]
    LockError(#[from] LockError),

    #[error("Error while {action}")]
    #[diagnostic(code(runway::io), help("Check file permissions and disk space"))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed{}: {stderr}", .code.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    #[diagnostic(
        code(runway::command_failed),
        help("Re-run with -v to see every command that is executed")
    )]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Required tool `{0}` was not found in PATH")]
    #[diagnostic(
        code(runway::tool_missing),
        help("Install it with your package manager, or run `runway archive tools` to see what is available")
    )]
    ToolMissing(String),

    #[error("No supported package manager found")]
    #[diagnostic(
        code(runway::no_package_manager),
        help("runway supports apt, dnf, yum, pacman, zypper and apk")
    )]
    NoPackageManager,

    #[error("Failed to install package `{package}`")]
    #[diagnostic(code(runway::package_install))]
    PackageInstallFailed {
        package: String,
        #[source]
        source: Box<RunwayError>,
    },

    #[error("Unknown package category `{0}`")]
    #[diagnostic(
        code(runway::unknown_category),
        help("Run `runway categories` to list the available categories")
    )]
    UnknownCategory(String),

    #[error("Timezone `{0}` not found")]
    #[diagnostic(
        code(runway::invalid_timezone),
        help("Pick a zone listed under /usr/share/zoneinfo, e.g. Europe/Berlin")
    )]
    InvalidTimezone(String),

    #[error("Swap is already configured")]
    #[diagnostic(
        code(runway::swap_exists),
        help("Inspect it with `swapon --show`; disable it first to recreate")
    )]
    SwapAlreadyConfigured,

    #[error("Unsupported firewall rule action `{0}`")]
    #[diagnostic(code(runway::rule_action), help("Use \"allow\" or \"deny\""))]
    UnsupportedRuleAction(String),

    #[error("Could not determine whether UFW is active")]
    #[diagnostic(
        code(runway::ufw_status),
        help("Check `ufw status` by hand; the firewall is not reset while its state is unknown")
    )]
    FirewallStatusUnknown,

    #[error("Unsupported archive format: {}", .0.display())]
    #[diagnostic(
        code(runway::unsupported_archive),
        help("Run `runway archive formats` to list supported extensions")
    )]
    UnsupportedArchive(PathBuf),

    #[error("Unsupported output format `{0}`")]
    #[diagnostic(
        code(runway::unsupported_format),
        help("Archives can be created as tar.gz, tar.bz2, tar.xz, zip or 7z")
    )]
    UnsupportedFormat(String),

    #[error("File not found: {}", .0.display())]
    #[diagnostic(code(runway::not_found))]
    NotFound(PathBuf),

    #[error(transparent)]
    #[diagnostic(code(runway::extract))]
    ExtractError(#[from] compak::error::ArchiveError),

    #[error("This command must be run as root")]
    #[diagnostic(
        code(runway::not_root),
        help("Re-run with sudo, or pass --dry-run to preview the commands")
    )]
    NotRoot,

    #[error("Another provisioning run holds the lock")]
    #[diagnostic(code(runway::locked), help("Wait for the other run to finish"))]
    Locked,

    #[error("Thread lock poison error")]
    #[diagnostic(
        code(runway::poison),
        help("This is an internal error, please report it")
    )]
    PoisonError,

    #[error("{0}")]
    #[diagnostic(code(runway::error))]
    Custom(String),
}

impl RunwayError {
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// The innermost message, useful for one-line summaries.
    pub fn root_cause(&self) -> String {
        match self {
            Self::PackageInstallFailed { package, source } => {
                format!("{package}: {}", source.root_cause())
            }
            Self::Config(err) => err.to_string(),
            _ => self.to_string(),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for RunwayError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::PoisonError
    }
}

/// Trait for adding context to IO errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, RunwayError>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, RunwayError>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            RunwayError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
