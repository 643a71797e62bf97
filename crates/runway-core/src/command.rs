//! Process execution.
//!
//! Everything runway does to the host goes through an external binary. The
//! [`CommandExecutor`] trait is the single seam for that so dry runs and tests
//! can substitute scripted output.

use std::{
    env,
    io::ErrorKind,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::{Mutex, PoisonError},
};

use tracing::{debug, trace};

use crate::{error::RunwayError, RunwayResult};

/// Directories searched in addition to `$PATH`. Administrative tools live in
/// sbin, which is often missing from non-root PATHs.
const EXTRA_BIN_DIRS: [&str; 4] = ["/usr/local/sbin", "/usr/sbin", "/sbin", "/usr/bin"];

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            code: Some(code),
        }
    }

    pub fn with_code(code: i32, stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: code == 0,
            code: Some(code),
        }
    }

    /// Non-empty trimmed stdout lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// Output of a process whose stdout is binary data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl From<CommandOutput> for RawOutput {
    fn from(output: CommandOutput) -> Self {
        Self {
            stdout: output.stdout.into_bytes(),
            stderr: output.stderr,
            success: output.success,
            code: output.code,
        }
    }
}

pub fn display_command(program: &str, args: &[&str]) -> String {
    let mut s = String::from(program);
    for arg in args {
        s.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            s.push('\'');
            s.push_str(arg);
            s.push('\'');
        } else {
            s.push_str(arg);
        }
    }
    s
}

pub trait CommandExecutor: Send + Sync {
    /// Runs `program` with captured output. A non-zero exit is *not* an error
    /// here; inspect [`CommandOutput::success`].
    ///
    /// # Errors
    ///
    /// [`RunwayError::ToolMissing`] if the binary cannot be found, or an IO
    /// error if it could not be spawned.
    fn run(&self, program: &str, args: &[&str]) -> RunwayResult<CommandOutput>;

    /// Like [`CommandExecutor::run`] but keeps stdout as raw bytes, for
    /// decompressors writing to stdout.
    fn run_raw(&self, program: &str, args: &[&str]) -> RunwayResult<RawOutput>;

    /// Runs `program` attached to the terminal. Only the exit status is captured.
    fn run_interactive(&self, program: &str, args: &[&str]) -> RunwayResult<CommandOutput>;

    /// Whether `program` is available.
    fn exists(&self, program: &str) -> bool;

    /// Runs and converts a non-zero exit into [`RunwayError::CommandFailed`].
    fn check(&self, program: &str, args: &[&str]) -> RunwayResult<CommandOutput> {
        let output = self.run(program, args)?;
        ensure_success(program, args, output)
    }

    fn check_interactive(&self, program: &str, args: &[&str]) -> RunwayResult<CommandOutput> {
        let output = self.run_interactive(program, args)?;
        ensure_success(program, args, output)
    }

    /// Raw stdout of a successful run.
    fn check_raw(&self, program: &str, args: &[&str]) -> RunwayResult<Vec<u8>> {
        let output = self.run_raw(program, args)?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(RunwayError::CommandFailed {
                command: display_command(program, args),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

fn ensure_success(program: &str, args: &[&str], output: CommandOutput) -> RunwayResult<CommandOutput> {
    if output.success {
        Ok(output)
    } else {
        Err(RunwayError::CommandFailed {
            command: display_command(program, args),
            code: output.code,
            stderr: output.stderr.trim().to_string(),
        })
    }
}

/// Spawns real processes.
#[derive(Debug, Default, Clone)]
pub struct SystemExecutor;

impl SystemExecutor {
    fn spawn_error(program: &str, err: std::io::Error) -> RunwayError {
        if err.kind() == ErrorKind::NotFound {
            RunwayError::ToolMissing(program.to_string())
        } else {
            RunwayError::IoError {
                action: format!("running {program}"),
                source: err,
            }
        }
    }
}

impl CommandExecutor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> RunwayResult<CommandOutput> {
        debug!(command = %display_command(program, args), "running");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .env("LC_ALL", "C")
            .env("DEBIAN_FRONTEND", "noninteractive")
            .output()
            .map_err(|err| Self::spawn_error(program, err))?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
            code: output.status.code(),
        };
        trace!(code = ?result.code, stdout = %result.stdout, "finished");
        Ok(result)
    }

    fn run_raw(&self, program: &str, args: &[&str]) -> RunwayResult<RawOutput> {
        debug!(command = %display_command(program, args), "running for raw output");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .env("LC_ALL", "C")
            .output()
            .map_err(|err| Self::spawn_error(program, err))?;

        trace!(code = ?output.status.code(), bytes = output.stdout.len(), "finished");
        Ok(RawOutput {
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }

    fn run_interactive(&self, program: &str, args: &[&str]) -> RunwayResult<CommandOutput> {
        debug!(command = %display_command(program, args), "running attached");

        let status = Command::new(program)
            .args(args)
            .env("DEBIAN_FRONTEND", "noninteractive")
            .status()
            .map_err(|err| Self::spawn_error(program, err))?;

        Ok(CommandOutput {
            success: status.success(),
            code: status.code(),
            ..Default::default()
        })
    }

    fn exists(&self, program: &str) -> bool {
        find_in_path(program).is_some()
    }
}

/// Resolves a program name to an executable file.
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    if program.contains('/') {
        let path = Path::new(program);
        return is_executable(path).then(|| path.to_path_buf());
    }

    let path_var = env::var_os("PATH").unwrap_or_default();
    env::split_paths(&path_var)
        .chain(EXTRA_BIN_DIRS.iter().map(PathBuf::from))
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Records invocations and answers with scripted output.
///
/// Used for `--dry-run` and as a test double. Replies are matched against the
/// rendered command line by prefix, longest prefix first; unmatched commands
/// succeed with empty output. `exists` answers from an explicit tool list, or
/// from the real `PATH` when the list was never set.
#[derive(Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<String>>,
    replies: Mutex<Vec<(String, CommandOutput)>>,
    tools: Mutex<Option<Vec<String>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands starting with `prefix` with `output`.
    pub fn reply(self, prefix: &str, output: CommandOutput) -> Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((prefix.to_string(), output));
        self
    }

    /// Restrict `exists` to exactly these programs.
    pub fn with_tools(self, tools: &[&str]) -> Self {
        *self.tools.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(tools.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, program: &str, args: &[&str]) -> CommandOutput {
        let line = display_command(program, args);
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(prefix, _)| line.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| CommandOutput::ok(""));

        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
        reply
    }
}

impl CommandExecutor for RecordingExecutor {
    fn run(&self, program: &str, args: &[&str]) -> RunwayResult<CommandOutput> {
        Ok(self.record(program, args))
    }

    fn run_raw(&self, program: &str, args: &[&str]) -> RunwayResult<RawOutput> {
        Ok(self.record(program, args).into())
    }

    fn run_interactive(&self, program: &str, args: &[&str]) -> RunwayResult<CommandOutput> {
        Ok(self.record(program, args))
    }

    fn exists(&self, program: &str) -> bool {
        match &*self.tools.lock().unwrap_or_else(PoisonError::into_inner) {
            Some(tools) => tools.iter().any(|t| t == program),
            None => find_in_path(program).is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_command_quotes_spaces() {
        assert_eq!(
            display_command("ufw", &["allow", "22/tcp", "comment", "SSH access"]),
            "ufw allow 22/tcp comment 'SSH access'"
        );
        assert_eq!(display_command("apt", &["autoclean"]), "apt autoclean");
    }

    #[test]
    fn test_output_lines_skip_blank() {
        let output = CommandOutput::ok("a\n\n  b  \n");
        assert_eq!(output.lines().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_recording_executor_replies_by_longest_prefix() {
        let exec = RecordingExecutor::new()
            .reply("ufw", CommandOutput::ok("generic"))
            .reply("ufw status", CommandOutput::ok("Status: active"));

        assert_eq!(exec.run("ufw", &["status"]).unwrap().stdout, "Status: active");
        assert_eq!(exec.run("ufw", &["reload"]).unwrap().stdout, "generic");
        assert!(exec.run("true", &[]).unwrap().success);
        assert_eq!(exec.calls(), vec!["ufw status", "ufw reload", "true"]);
    }

    #[test]
    fn test_check_converts_failure() {
        let exec = RecordingExecutor::new().reply("false", CommandOutput::failed(1, "nope\n"));
        let err = exec.check("false", &[]).unwrap_err();
        assert!(matches!(
            err,
            RunwayError::CommandFailed { code: Some(1), ref stderr, .. } if stderr == "nope"
        ));
    }

    #[test]
    fn test_check_raw() {
        let exec = RecordingExecutor::new()
            .reply("gunzip -c a.gz", CommandOutput::ok("payload"))
            .reply("gunzip -c b.gz", CommandOutput::failed(1, "not in gzip format"));

        assert_eq!(exec.check_raw("gunzip", &["-c", "a.gz"]).unwrap(), b"payload");
        assert!(matches!(
            exec.check_raw("gunzip", &["-c", "b.gz"]),
            Err(RunwayError::CommandFailed { ref stderr, .. }) if stderr == "not in gzip format"
        ));
    }

    #[test]
    fn test_recording_executor_tools() {
        let exec = RecordingExecutor::new().with_tools(&["apt", "ufw"]);
        assert!(exec.exists("apt"));
        assert!(!exec.exists("dnf"));
    }

    #[test]
    fn test_system_executor_runs_processes() {
        let exec = SystemExecutor;
        let output = exec.run("sh", &["-c", "echo out; echo err >&2; exit 3"]).unwrap();
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert!(!output.success);
        assert_eq!(output.code, Some(3));

        assert!(matches!(
            exec.run("runway-definitely-missing-tool", &[]),
            Err(RunwayError::ToolMissing(_))
        ));
        let raw = exec.run_raw("printf", &["\\001\\377"]).unwrap();
        assert_eq!(raw.stdout, vec![1, 255]);
        assert!(raw.success);

        assert!(exec.exists("sh"));
        assert!(!exec.exists("runway-definitely-missing-tool"));
    }
}
