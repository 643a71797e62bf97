use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Disable progress bars and spinners
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Provide custom config file
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    /// Print the commands that would run instead of running them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Answer yes to every prompt
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the server dashboard (default)
    #[clap(name = "dashboard", visible_alias = "d")]
    Dashboard,

    /// Show system information
    Info,

    /// Refresh package lists and upgrade installed packages
    #[clap(name = "update", visible_alias = "u")]
    Update {
        /// Attach the upgrade to the terminal to show the package manager's output
        #[arg(long)]
        attach: bool,
    },

    /// Install packages or package categories
    #[clap(name = "install", visible_alias = "i")]
    Install {
        /// Packages to install
        #[arg(required = false)]
        packages: Vec<String>,

        /// Install every package in a category (repeatable)
        #[arg(required = false, short = 'C', long = "category")]
        categories: Vec<String>,
    },

    /// Remove installed packages
    #[clap(name = "remove", visible_alias = "r")]
    #[command(arg_required_else_help = true)]
    Remove {
        /// Packages to remove
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// List package categories
    Categories,

    /// List pending package updates
    Updates,

    /// Remove temporary files, package caches and rotated logs
    Clean,

    /// Configure host settings
    #[command(arg_required_else_help = true)]
    System {
        #[clap(subcommand)]
        action: SystemAction,
    },

    /// Firewall, Fail2ban and SSH hardening
    #[command(arg_required_else_help = true)]
    Security {
        #[clap(subcommand)]
        action: SecurityAction,
    },

    /// Run the full provisioning pass
    Provision {
        /// Skip the package update
        #[arg(long)]
        skip_update: bool,

        /// Skip package installation
        #[arg(long)]
        skip_packages: bool,

        /// Skip host configuration
        #[arg(long)]
        skip_system: bool,

        /// Skip security hardening
        #[arg(long)]
        skip_security: bool,

        /// Only install these categories (repeatable)
        #[arg(required = false, short = 'C', long = "category")]
        categories: Vec<String>,
    },

    /// Extract, create and inspect archives
    #[command(arg_required_else_help = true)]
    #[clap(name = "archive", visible_alias = "a")]
    Archive {
        #[clap(subcommand)]
        action: ArchiveAction,
    },

    /// Manage the configuration file
    #[command(arg_required_else_help = true)]
    Config {
        #[clap(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
pub enum SystemAction {
    /// Set the timezone
    Timezone,
    /// Generate and select the locale
    Locale,
    /// Set the hostname
    Hostname,
    /// Create and enable a swap file
    Swap,
    /// Run every step
    All,
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
pub enum SecurityAction {
    /// Configure and enable UFW
    Firewall,
    /// Install and configure Fail2ban
    Fail2ban,
    /// Harden the SSH daemon
    Ssh,
    /// Report listening ports, pending updates and firewall state
    Audit,
    /// Run every hardening step
    All,
}

#[derive(Subcommand)]
pub enum ArchiveAction {
    /// Extract an archive
    #[command(arg_required_else_help = true)]
    #[clap(name = "extract", visible_alias = "x")]
    Extract {
        /// Archive to extract
        #[arg(required = true, value_hint = ValueHint::FilePath)]
        archive: PathBuf,

        /// Output directory [default: next to the archive]
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        output: Option<PathBuf>,
    },

    /// Extract several archives in parallel
    #[command(arg_required_else_help = true)]
    ExtractAll {
        /// Archives to extract
        #[arg(required = true, value_hint = ValueHint::FilePath)]
        archives: Vec<PathBuf>,

        /// Each archive lands in <OUTPUT>/<name>
        #[arg(short, long, default_value = ".", value_hint = ValueHint::DirPath)]
        output: PathBuf,
    },

    /// Create an archive
    #[command(arg_required_else_help = true)]
    #[clap(name = "create", visible_alias = "c")]
    Create {
        /// Archive to write
        #[arg(short, long, required = true, value_hint = ValueHint::FilePath)]
        output: PathBuf,

        /// tar.gz, tar.bz2, tar.xz, zip or 7z
        #[arg(short, long, default_value = "tar.gz")]
        format: String,

        /// Files and directories to add
        #[arg(required = true, value_hint = ValueHint::AnyPath)]
        files: Vec<PathBuf>,
    },

    /// Show size, validity and contents of an archive
    #[command(arg_required_else_help = true)]
    Info {
        #[arg(required = true, value_hint = ValueHint::FilePath)]
        archive: PathBuf,
    },

    /// Show which archive tools are installed
    Tools,

    /// List supported archive formats
    Formats,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write the default configuration file
    Init {
        /// Where to write it [default: user config path]
        #[arg(value_hint = ValueHint::FilePath)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Check the configuration for errors
    Validate,

    /// Print the configuration file path
    Path,
}
