use std::{
    fs::{self, OpenOptions},
    io::Write,
    os::unix::fs::{OpenOptionsExt, PermissionsExt},
    path::Path,
};

use crate::error::{FileSystemError, FileSystemResult};

/// Removes a file or directory tree. A missing path is not an error.
pub fn safe_remove<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();

    if fs::symlink_metadata(path).is_err() {
        return Ok(());
    }

    let result = if path.is_dir() && !path.is_symlink() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    result.map_err(|err| {
        FileSystemError::File {
            path: path.to_path_buf(),
            action: "remove",
            source: err,
        }
    })
}

/// Creates a directory and its parents if missing.
///
/// # Errors
///
/// * [`FileSystemError::Directory`] if the directory could not be created.
/// * [`FileSystemError::NotADirectory`] if the path exists but is not a directory.
pub fn ensure_dir_exists<P: AsRef<Path>>(path: P) -> FileSystemResult<()> {
    let path = path.as_ref();
    if !path.exists() {
        fs::create_dir_all(path).map_err(|err| {
            FileSystemError::Directory {
                path: path.to_path_buf(),
                action: "create",
                source: err,
            }
        })?;
    } else if !path.is_dir() {
        return Err(FileSystemError::NotADirectory {
            path: path.to_path_buf(),
        });
    }

    Ok(())
}

/// Appends `line` to the file unless a line with the same trimmed content
/// is already present. Returns `true` when the file was modified.
///
/// The file is created if it does not exist. Used for config files that must
/// not accumulate duplicate entries across runs, such as `/etc/fstab`.
pub fn append_line_once<P: AsRef<Path>>(path: P, line: &str) -> FileSystemResult<bool> {
    let path = path.as_ref();
    let wanted = line.trim();

    let existing = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => {
            return Err(FileSystemError::File {
                path: path.to_path_buf(),
                action: "read",
                source: err,
            })
        }
    };

    if existing.lines().any(|l| l.trim() == wanted) {
        return Ok(false);
    }

    let append_err = |err| {
        FileSystemError::File {
            path: path.to_path_buf(),
            action: "append to",
            source: err,
        }
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(append_err)?;

    let mut buf = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        buf.push('\n');
    }
    buf.push_str(wanted);
    buf.push('\n');

    file.write_all(buf.as_bytes()).map_err(append_err)?;
    Ok(true)
}

/// Writes `contents` to `path`, truncating it, and applies `mode` when given.
///
/// Parent directories are created as needed.
pub fn write_file<P: AsRef<Path>>(
    path: P,
    contents: &[u8],
    mode: Option<u32>,
) -> FileSystemResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir_exists(parent)?;
        }
    }

    let write_err = |err| {
        FileSystemError::File {
            path: path.to_path_buf(),
            action: "write",
            source: err,
        }
    };

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    if let Some(mode) = mode {
        options.mode(mode);
    }

    let mut file = options.open(path).map_err(write_err)?;
    file.write_all(contents).map_err(write_err)?;

    // `mode` on open only applies to newly created files.
    if let Some(mode) = mode {
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(write_err)?;
    }

    Ok(())
}

/// Recursively visits every file below `dir`, calling `action` for each.
///
/// Symlinks are reported as files and never followed. A missing `dir` is
/// treated as empty.
pub fn walk_dir<P, F>(dir: P, action: &mut F) -> FileSystemResult<()>
where
    P: AsRef<Path>,
    F: FnMut(&Path) -> FileSystemResult<()>,
{
    let dir = dir.as_ref();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => {
            return Err(FileSystemError::Directory {
                path: dir.to_path_buf(),
                action: "read",
                source: err,
            })
        }
    };

    for entry in entries {
        let entry = entry.map_err(|err| {
            FileSystemError::Directory {
                path: dir.to_path_buf(),
                action: "read",
                source: err,
            }
        })?;
        let path = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            walk_dir(&path, action)?;
        } else {
            action(&path)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_safe_remove_file_and_dir() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_file.txt");
        fs::write(&file_path, "hello").unwrap();
        safe_remove(&file_path).unwrap();
        assert!(!file_path.exists());

        let sub_dir = dir.path().join("sub");
        fs::create_dir_all(sub_dir.join("nested")).unwrap();
        safe_remove(&sub_dir).unwrap();
        assert!(!sub_dir.exists());
    }

    #[test]
    fn test_safe_remove_non_existent() {
        let dir = tempdir().unwrap();
        safe_remove(dir.path().join("non_existent.txt")).unwrap();
    }

    #[test]
    fn test_ensure_dir_exists() {
        let dir = tempdir().unwrap();
        let new_dir = dir.path().join("a/b/c");
        ensure_dir_exists(&new_dir).unwrap();
        assert!(new_dir.is_dir());
        ensure_dir_exists(&new_dir).unwrap();
    }

    #[test]
    fn test_ensure_dir_exists_file_collision() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("file.txt");
        fs::write(&file_path, "hello").unwrap();
        assert!(matches!(
            ensure_dir_exists(&file_path),
            Err(FileSystemError::NotADirectory { .. })
        ));
    }

    #[test]
    fn test_append_line_once() {
        let dir = tempdir().unwrap();
        let fstab = dir.path().join("fstab");
        fs::write(&fstab, "UUID=abc / ext4 defaults 0 1").unwrap();

        let entry = "/swapfile none swap sw 0 0";
        assert!(append_line_once(&fstab, entry).unwrap());
        assert!(!append_line_once(&fstab, entry).unwrap());
        assert!(!append_line_once(&fstab, "  /swapfile none swap sw 0 0  ").unwrap());

        let content = fs::read_to_string(&fstab).unwrap();
        assert_eq!(
            content,
            "UUID=abc / ext4 defaults 0 1\n/swapfile none swap sw 0 0\n"
        );
    }

    #[test]
    fn test_append_line_once_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("new.conf");
        assert!(append_line_once(&path, "key=value").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "key=value\n");
    }

    #[test]
    fn test_write_file_with_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("etc/fail2ban/jail.local");
        write_file(&path, b"[DEFAULT]\n", Some(0o644)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[DEFAULT]\n");

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);

        write_file(&path, b"short", Some(0o600)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "short");
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_walk_dir_visits_nested_files() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nginx/old")).unwrap();
        fs::write(dir.path().join("syslog.1"), "").unwrap();
        fs::write(dir.path().join("nginx/old/access.log.gz"), "").unwrap();

        let mut seen = Vec::new();
        walk_dir(dir.path(), &mut |p: &Path| {
            seen.push(p.file_name().unwrap().to_string_lossy().into_owned());
            Ok(())
        })
        .unwrap();
        seen.sort();
        assert_eq!(seen, vec!["access.log.gz", "syslog.1"]);

        walk_dir(dir.path().join("missing"), &mut |_: &Path| Ok(())).unwrap();
    }
}
