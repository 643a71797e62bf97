use std::path::{Path, PathBuf};

/// Locations of the host files runway reads and writes.
///
/// Everything hangs off `root`, which is `/` in production and a temporary
/// directory in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPaths {
    root: PathBuf,
}

impl Default for SystemPaths {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/"),
        }
    }
}

impl SystemPaths {
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn join(&self, rel: &str) -> PathBuf {
        self.root.join(rel.trim_start_matches('/'))
    }

    pub fn os_release(&self) -> PathBuf {
        self.join("etc/os-release")
    }

    pub fn zoneinfo(&self, tz: &str) -> PathBuf {
        self.join("usr/share/zoneinfo").join(tz)
    }

    pub fn localtime(&self) -> PathBuf {
        self.join("etc/localtime")
    }

    pub fn timezone(&self) -> PathBuf {
        self.join("etc/timezone")
    }

    pub fn swapfile(&self) -> PathBuf {
        self.join("swapfile")
    }

    pub fn fstab(&self) -> PathBuf {
        self.join("etc/fstab")
    }

    pub fn swappiness_conf(&self) -> PathBuf {
        self.join("etc/sysctl.d/99-swappiness.conf")
    }

    pub fn temp_dirs(&self) -> [PathBuf; 2] {
        [self.join("tmp"), self.join("var/tmp")]
    }

    pub fn log_dir(&self) -> PathBuf {
        self.join("var/log")
    }

    pub fn sshd_config(&self) -> PathBuf {
        self.join("etc/ssh/sshd_config")
    }

    pub fn fail2ban_jail(&self) -> PathBuf {
        self.join("etc/fail2ban/jail.local")
    }

    pub fn proc_dir(&self) -> PathBuf {
        self.join("proc")
    }

    pub fn loadavg(&self) -> PathBuf {
        self.join("proc/loadavg")
    }

    pub fn meminfo(&self) -> PathBuf {
        self.join("proc/meminfo")
    }

    pub fn apt_update_stamp(&self) -> PathBuf {
        self.join("var/lib/apt/periodic/update-success-stamp")
    }
}
