use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

/// Errors from parsing swap-style sizes such as `2G`.
#[derive(Debug, Error)]
pub enum SizeError {
    #[error("Size is empty")]
    Empty,

    #[error("Size `{input}` needs a K, M, G or T suffix")]
    MissingUnit { input: String },

    #[error("Size `{input}` is not a non-negative number")]
    InvalidNumber { input: String },
}

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Failed to get current directory: {source}")]
    CurrentDir { source: std::io::Error },

    #[error("Path is empty")]
    Empty,

    #[error("Environment variable `{var}` not set in `{input}`")]
    MissingEnvVar { var: String, input: String },

    #[error("Unclosed variable expression starting at `{input}`")]
    UnclosedVariable { input: String },
}

/// Errors from the host files runway reads and edits.
#[derive(Debug, Error)]
pub enum FileSystemError {
    #[error("Failed to {action} file `{}`: {source}", path.display())]
    File {
        path: PathBuf,
        action: &'static str,
        source: std::io::Error,
    },

    #[error("Failed to {action} directory `{}`: {source}", path.display())]
    Directory {
        path: PathBuf,
        action: &'static str,
        source: std::io::Error,
    },

    #[error("`{}` is not a directory", path.display())]
    NotADirectory { path: PathBuf },
}

/// Errors from taking a provisioning lock.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Cannot prepare lock directory: {0}")]
    Directory(#[source] FileSystemError),

    #[error("Cannot open lock file `{}`: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot lock `{}`: {errno}", path.display())]
    Flock { path: PathBuf, errno: Errno },
}

#[derive(Debug, Error)]
pub enum UtilsError {
    #[error(transparent)]
    Size(#[from] SizeError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    FileSystem(#[from] FileSystemError),

    #[error(transparent)]
    Lock(#[from] LockError),
}

pub type SizeResult<T> = std::result::Result<T, SizeError>;
pub type FileSystemResult<T> = std::result::Result<T, FileSystemError>;
pub type LockResult<T> = std::result::Result<T, LockError>;
pub type PathResult<T> = std::result::Result<T, PathError>;

#[cfg(test)]
mod tests {
    use std::{error::Error, io};

    use super::*;

    #[test]
    fn test_size_error_display() {
        let err = SizeError::MissingUnit { input: "2X".into() };
        assert_eq!(err.to_string(), "Size `2X` needs a K, M, G or T suffix");
        assert_eq!(SizeError::Empty.to_string(), "Size is empty");
    }

    #[test]
    fn test_path_error_display_and_source() {
        let current_dir_error = PathError::CurrentDir {
            source: io::Error::other("some error"),
        };
        assert_eq!(
            current_dir_error.to_string(),
            "Failed to get current directory: some error"
        );
        assert!(current_dir_error.source().is_some());

        let missing = PathError::MissingEnvVar {
            var: "RUNWAY_HOME".to_string(),
            input: "$RUNWAY_HOME/config.json".to_string(),
        };
        assert_eq!(
            missing.to_string(),
            "Environment variable `RUNWAY_HOME` not set in `$RUNWAY_HOME/config.json`"
        );
        assert!(missing.source().is_none());
    }

    #[test]
    fn test_file_system_error_display() {
        let file_error = FileSystemError::File {
            path: PathBuf::from("/etc/fstab"),
            action: "append to",
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert_eq!(
            file_error.to_string(),
            "Failed to append to file `/etc/fstab`: permission denied"
        );
        assert!(file_error.source().is_some());

        let not_a_dir = FileSystemError::NotADirectory {
            path: PathBuf::from("/etc/ssh/sshd_config"),
        };
        assert_eq!(not_a_dir.to_string(), "`/etc/ssh/sshd_config` is not a directory");
    }

    #[test]
    fn test_lock_error_display() {
        let err = LockError::Flock {
            path: PathBuf::from("/run/runway/locks/provision.lock"),
            errno: Errno::EBADF,
        };
        assert_eq!(
            err.to_string(),
            "Cannot lock `/run/runway/locks/provision.lock`: EBADF: Bad file number"
        );

        let err = LockError::Directory(FileSystemError::NotADirectory {
            path: PathBuf::from("/run/runway"),
        });
        assert!(err.source().is_some());
    }

    #[test]
    fn test_utils_error_from() {
        let utils_error = UtilsError::from(SizeError::InvalidNumber { input: "-1G".into() });
        assert_eq!(utils_error.to_string(), "Size `-1G` is not a non-negative number");
        assert!(utils_error.source().is_none());
    }
}
