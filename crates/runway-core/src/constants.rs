//! Fixed values shared across runway-core.

/// Swap file fstab entry.
pub const SWAP_FSTAB_ENTRY: &str = "/swapfile none swap sw 0 0";

/// Kernel memory tuning written alongside a new swap file.
pub const SWAPPINESS_SYSCTL: &str = "vm.swappiness=10\nvm.vfs_cache_pressure=50\n";

/// Swap size used when RAM cannot be determined.
pub const DEFAULT_SWAP_SIZE: &str = "2G";

pub const GIB: u64 = 1024 * 1024 * 1024;
pub const MIB: u64 = 1024 * 1024;

/// Log rotation leftovers removed by a system clean.
pub const ROTATED_LOG_SUFFIXES: [&str; 2] = [".gz", ".1"];

/// How long journald keeps logs after a clean.
pub const JOURNAL_RETENTION: &str = "3d";

/// sshd options appended when absent.
pub const SSHD_RECOMMENDED: [(&str, &str); 6] = [
    ("Protocol", "2"),
    ("ClientAliveInterval", "300"),
    ("ClientAliveCountMax", "2"),
    ("MaxAuthTries", "3"),
    ("MaxSessions", "10"),
    ("X11Forwarding", "no"),
];

pub const SSHD_BACKUP_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

pub const FAIL2BAN_BANTIME: u32 = 3600;
pub const FAIL2BAN_FINDTIME: u32 = 600;
pub const FAIL2BAN_MAXRETRY: u32 = 5;
pub const FAIL2BAN_IGNOREIP: &str = "127.0.0.1/8";

/// Number of pending updates listed in a security audit.
pub const AUDIT_UPDATE_PREVIEW: usize = 10;

/// Exit code of `dnf/yum check-update` when updates are available.
pub const CHECK_UPDATE_AVAILABLE: i32 = 100;

/// Dashboard clock format, e.g. "Monday, 02 January 2006 15:04:05 UTC".
pub const DASHBOARD_TIME_FORMAT: &str = "%A, %d %B %Y %H:%M:%S %Z";
