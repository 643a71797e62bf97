//! Advisory process locks.
//!
//! Provisioning drives the system package manager, which does not tolerate two
//! runs at once. Callers take a named [`FileLock`] around such work.

use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

use nix::{
    errno::Errno,
    fcntl::{Flock, FlockArg},
};

use crate::{
    error::{LockError, LockResult},
    fs::ensure_dir_exists,
    path::xdg_runtime_dir,
};

/// An exclusive `flock` held on `<runtime dir>/runway/locks/<name>.lock`.
///
/// Released when dropped.
pub struct FileLock {
    _file: Flock<File>,
    path: PathBuf,
}

impl FileLock {
    fn lock_path(name: &str) -> LockResult<PathBuf> {
        let dir = xdg_runtime_dir().join("runway").join("locks");
        ensure_dir_exists(&dir).map_err(LockError::Directory)?;

        let sanitized: String = name
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        Ok(dir.join(format!("{sanitized}.lock")))
    }

    fn open(path: &Path) -> LockResult<File> {
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| {
                LockError::Open {
                    path: path.to_path_buf(),
                    source,
                }
            })
    }

    /// Blocks until the named lock is free, then takes it.
    pub fn acquire(name: &str) -> LockResult<Self> {
        let path = Self::lock_path(name)?;
        let file = Self::open(&path)?;

        let file = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| {
            LockError::Flock {
                path: path.clone(),
                errno,
            }
        })?;

        Ok(FileLock { _file: file, path })
    }

    /// Takes the named lock if it is free. `Ok(None)` means another holder has it.
    pub fn try_acquire(name: &str) -> LockResult<Option<Self>> {
        let path = Self::lock_path(name)?;
        let file = Self::open(&path)?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(file) => Ok(Some(FileLock { _file: file, path })),
            Err((_, Errno::EWOULDBLOCK)) => Ok(None),
            Err((_, errno)) => Err(LockError::Flock { path, errno }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;

    #[test]
    fn test_lock_path_is_sanitized() {
        let path = FileLock::lock_path("apt/dpkg frontend").unwrap();
        assert!(path.to_string_lossy().ends_with("apt_dpkg_frontend.lock"));
        assert!(path.parent().unwrap().ends_with("runway/locks"));
    }

    #[test]
    fn test_try_acquire_while_held() {
        let held = FileLock::acquire("runway-test-exclusive").unwrap();
        assert!(FileLock::try_acquire("runway-test-exclusive")
            .unwrap()
            .is_none());

        drop(held);
        assert!(FileLock::try_acquire("runway-test-exclusive")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_acquire_waits_for_release() {
        let held = FileLock::acquire("runway-test-block").unwrap();
        let path = held.path().to_path_buf();

        let waiter = thread::spawn(move || {
            let lock = FileLock::acquire("runway-test-block").unwrap();
            assert_eq!(lock.path(), path.as_path());
        });

        thread::sleep(Duration::from_millis(50));
        drop(held);
        waiter.join().unwrap();
    }
}
