//! External tool invocation.
//!
//! Every process the pipeline starts (cmake, xcodebuild, lipo) is described
//! by an [`Invocation`] and executed through a [`ToolRunner`]. The default
//! [`SystemRunner`] spawns the real program; tests substitute a runner that
//! records invocations and fabricates the files the tool would produce.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::types::PackError;

/// A single external command: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path.
    pub program: String,
    /// Arguments, in order.
    pub args: Vec<OsString>,
    /// Working directory the command runs in.
    pub cwd: PathBuf,
}

impl Invocation {
    /// Creates an invocation with no arguments.
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// The program's file name, used in log lines and error messages.
    ///
    /// ```
    /// use bulletpack_sdk::tools::Invocation;
    ///
    /// let inv = Invocation::new("/usr/bin/xcodebuild", "/tmp");
    /// assert_eq!(inv.tool_name(), "xcodebuild");
    /// ```
    pub fn tool_name(&self) -> &str {
        Path::new(&self.program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.program)
    }

    /// Arguments as lossy UTF-8 strings.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Renders the command line for logging.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in self.args_lossy() {
            line.push(' ');
            if arg.contains(' ') {
                line.push('"');
                line.push_str(&arg);
                line.push('"');
            } else {
                line.push_str(&arg);
            }
        }
        line
    }
}

/// Executes external tools on behalf of the pipeline.
pub trait ToolRunner {
    /// Runs the invocation to completion.
    ///
    /// Returns an error if the program cannot be started or exits with a
    /// non-zero status.
    fn run(&self, invocation: &Invocation) -> Result<(), PackError>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), PackError> {
        tracing::debug!(
            cwd = %invocation.cwd.display(),
            "running: {}",
            invocation.command_line()
        );
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).current_dir(&invocation.cwd);
        run_command(cmd, invocation.tool_name())
    }
}

/// Runs an external command with consistent error handling.
///
/// Blocks until the command exits. Captures both stdout and stderr so that a
/// failure can be reported with the tool's own output.
pub fn run_command(mut cmd: Command, tool: &str) -> Result<(), PackError> {
    let output = cmd.output().map_err(|source| PackError::ToolSpawn {
        tool: tool.to_string(),
        source,
    })?;

    if !output.status.success() {
        return Err(PackError::Tool {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_command_not_found() {
        let cmd = Command::new("nonexistent-command-12345");
        let err = run_command(cmd, "nonexistent-command-12345").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Failed to start nonexistent-command-12345"));
        assert!(msg.contains("available on PATH"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_reports_exit_status() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo boom >&2; exit 3"]);
        let err = run_command(cmd, "sh").unwrap_err();
        match err {
            PackError::Tool { tool, stderr, .. } => {
                assert_eq!(tool, "sh");
                assert!(stderr.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_command_line_quotes_spaced_args() {
        let inv = Invocation::new("cmake", "/tmp")
            .arg("-G")
            .arg("Xcode")
            .arg("-DCMAKE_C_FLAGS_RELEASE=-Oz -DNDEBUG");
        assert_eq!(
            inv.command_line(),
            "cmake -G Xcode \"-DCMAKE_C_FLAGS_RELEASE=-Oz -DNDEBUG\""
        );
    }

    #[test]
    fn test_args_appends_in_order() {
        let inv = Invocation::new("lipo", "/tmp").arg("-create").args(["a", "b"]);
        assert_eq!(inv.args_lossy(), vec!["-create", "a", "b"]);
    }
}
