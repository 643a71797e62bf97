use runway_utils::{bytes::parse_size, fs::append_line_once};
use tracing::{info, warn};

use super::SystemManager;
use crate::{
    constants::{DEFAULT_SWAP_SIZE, GIB, MIB, SWAPPINESS_SYSCTL, SWAP_FSTAB_ENTRY},
    error::RunwayError,
    system::info::parse_free_total_bytes,
    RunwayResult,
};

/// Swap size for a machine with `total_ram` bytes, in `free`/`fallocate`
/// notation: twice RAM below 2 GiB, equal up to 8 GiB, half above.
pub fn recommended_swap_size(total_ram: u64) -> String {
    let swap = if total_ram < 2 * GIB {
        total_ram * 2
    } else if total_ram <= 8 * GIB {
        total_ram
    } else {
        total_ram / 2
    };
    format!("{}M", swap / MIB)
}

impl SystemManager {
    fn swap_active(&self) -> RunwayResult<bool> {
        let output = self.executor.run("swapon", &["--show"])?;
        Ok(output.success && !output.stdout.trim().is_empty())
    }

    fn detect_swap_size(&self) -> String {
        match self.executor.run("free", &["-b"]) {
            Ok(out) if out.success => {
                parse_free_total_bytes(&out.stdout)
                    .map(recommended_swap_size)
                    .unwrap_or_else(|| DEFAULT_SWAP_SIZE.to_string())
            }
            _ => DEFAULT_SWAP_SIZE.to_string(),
        }
    }

    /// Creates, enables and persists `/swapfile`.
    ///
    /// An empty `size` picks one from installed RAM. Returns the size used.
    pub fn setup_swap(&self, size: &str) -> RunwayResult<String> {
        if self.swap_active()? {
            return Err(RunwayError::SwapAlreadyConfigured);
        }

        let size = if size.trim().is_empty() {
            self.detect_swap_size()
        } else {
            size.trim().to_string()
        };
        let bytes = parse_size(&size)?;
        info!("Creating {} swap file", size);

        let swapfile = self.paths.swapfile();
        let swapfile_str = swapfile.to_string_lossy();
        self.remove(&swapfile)?;

        let allocated = match self.executor.run("fallocate", &["-l", &size, &swapfile_str]) {
            Ok(out) => out.success,
            Err(RunwayError::ToolMissing(_)) => false,
            Err(err) => return Err(err),
        };
        if !allocated {
            warn!("fallocate failed, falling back to dd");
            let of = format!("of={swapfile_str}");
            let count = format!("count={}", bytes / MIB);
            self.executor
                .check("dd", &["if=/dev/zero", &of, "bs=1M", &count])?;
        }

        self.executor.check("chmod", &["600", &swapfile_str])?;
        self.executor.check("mkswap", &[&swapfile_str])?;
        self.executor.check("swapon", &[&swapfile_str])?;

        let fstab = self.paths.fstab();
        if self.dry_run {
            info!("Would add `{}` to {}", SWAP_FSTAB_ENTRY, fstab.display());
        } else if !append_line_once(&fstab, SWAP_FSTAB_ENTRY)? {
            info!("fstab already has a swap entry");
        }

        let sysctl = self.paths.swappiness_conf();
        self.write(&sysctl, SWAPPINESS_SYSCTL.as_bytes(), 0o644)?;
        self.executor
            .check("sysctl", &["-p", &sysctl.to_string_lossy()])?;

        Ok(size)
    }
}
