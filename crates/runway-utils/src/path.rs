use std::{
    env,
    iter::Peekable,
    path::PathBuf,
    str::Chars,
};

use nix::unistd::{Uid, User};

use crate::error::{PathError, PathResult};

/// Resolves a user-supplied path to an absolute [`PathBuf`].
///
/// `$VAR` and `${VAR}` are expanded from the environment, a leading `~` becomes
/// the home directory, and relative paths are joined onto the current directory.
///
/// # Errors
///
/// * [`PathError::Empty`] if the path is blank
/// * [`PathError::UnclosedVariable`] for `${VAR` without the closing brace
/// * [`PathError::MissingEnvVar`] if a referenced variable is not set
/// * [`PathError::CurrentDir`] if the working directory cannot be determined
pub fn resolve_path(path: &str) -> PathResult<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let expanded = PathBuf::from(expand_variables(path)?);
    if expanded.is_absolute() {
        return Ok(expanded);
    }

    env::current_dir()
        .map(|cwd| cwd.join(expanded))
        .map_err(|err| PathError::CurrentDir { source: err })
}

/// Home directory from `$HOME`, falling back to the passwd entry of the
/// current user.
pub fn home_dir() -> PathBuf {
    if let Ok(home) = env::var("HOME") {
        if !home.is_empty() {
            return PathBuf::from(home);
        }
    }

    let uid = Uid::effective();
    match User::from_uid(uid) {
        Ok(Some(user)) => user.dir,
        _ if uid.is_root() => PathBuf::from("/root"),
        _ => PathBuf::from("/tmp"),
    }
}

/// `$XDG_CONFIG_HOME`, or `~/.config`.
pub fn xdg_config_home() -> PathBuf {
    env::var("XDG_CONFIG_HOME")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".config"))
}

/// `$XDG_RUNTIME_DIR`, or the system temp directory.
pub fn xdg_runtime_dir() -> PathBuf {
    env::var("XDG_RUNTIME_DIR")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(env::temp_dir)
}

fn expand_variables(path: &str) -> PathResult<String> {
    let mut result = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                let name = consume_braced(&mut chars)?;
                push_var(&name, &mut result, path)?;
            }
            '$' => {
                let name = consume_var_name(&mut chars);
                if name.is_empty() {
                    result.push('$');
                } else {
                    push_var(&name, &mut result, path)?;
                }
            }
            '~' if result.is_empty() => result.push_str(&home_dir().to_string_lossy()),
            _ => result.push(c),
        }
    }

    Ok(result)
}

fn consume_braced(chars: &mut Peekable<Chars>) -> PathResult<String> {
    let mut name = String::new();
    for c in chars.by_ref() {
        if c == '}' {
            return Ok(name);
        }
        name.push(c);
    }

    Err(PathError::UnclosedVariable {
        input: format!("${{{name}"),
    })
}

fn consume_var_name(chars: &mut Peekable<Chars>) -> String {
    let mut name = String::new();
    while let Some(c) = chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
        name.push(c);
    }
    name
}

fn push_var(name: &str, result: &mut String, original: &str) -> PathResult<()> {
    match name {
        "HOME" => result.push_str(&home_dir().to_string_lossy()),
        "XDG_CONFIG_HOME" => result.push_str(&xdg_config_home().to_string_lossy()),
        _ => {
            let value = env::var(name).map_err(|_| {
                PathError::MissingEnvVar {
                    var: name.into(),
                    input: original.into(),
                }
            })?;
            result.push_str(&value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_expand_variables() {
        env::set_var("RUNWAY_TEST_VAR", "value");
        assert_eq!(expand_variables("$RUNWAY_TEST_VAR/a").unwrap(), "value/a");
        assert_eq!(expand_variables("${RUNWAY_TEST_VAR}/a").unwrap(), "value/a");
        assert_eq!(expand_variables("path/$").unwrap(), "path/$");
        assert_eq!(expand_variables("path/$!x").unwrap(), "path/$!x");
        env::remove_var("RUNWAY_TEST_VAR");

        assert!(matches!(
            expand_variables("${RUNWAY_TEST_VAR"),
            Err(PathError::UnclosedVariable { .. })
        ));
        assert!(matches!(
            expand_variables("$RUNWAY_TEST_VAR"),
            Err(PathError::MissingEnvVar { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_resolve_path() {
        env::set_var("HOME", "/tmp/home");

        assert!(matches!(resolve_path("  "), Err(PathError::Empty)));
        assert_eq!(resolve_path("/etc/runway").unwrap(), PathBuf::from("/etc/runway"));
        assert_eq!(resolve_path("~/x").unwrap(), PathBuf::from("/tmp/home/x"));
        assert_eq!(resolve_path("~").unwrap(), PathBuf::from("/tmp/home"));
        assert_eq!(
            resolve_path("rel/~/x").unwrap(),
            env::current_dir().unwrap().join("rel/~/x")
        );
    }

    #[test]
    #[serial]
    fn test_xdg_config_home() {
        env::set_var("HOME", "/tmp/home");
        env::remove_var("XDG_CONFIG_HOME");
        assert_eq!(xdg_config_home(), PathBuf::from("/tmp/home/.config"));

        env::set_var("XDG_CONFIG_HOME", "/tmp/config");
        assert_eq!(xdg_config_home(), PathBuf::from("/tmp/config"));
        assert_eq!(
            resolve_path("$XDG_CONFIG_HOME/runway").unwrap(),
            PathBuf::from("/tmp/config/runway")
        );
        env::remove_var("XDG_CONFIG_HOME");
    }

    #[test]
    #[serial]
    fn test_home_dir_without_env() {
        env::remove_var("HOME");
        assert!(home_dir().is_absolute());
        env::set_var("HOME", "/tmp/home");
    }
}
