//! # Command Runner
//!
//! Thin wrapper around `tokio::process::Command` used for every external tool
//! the harness drives (`kind`, `clusterctl`, `cargo`, `pylint`).
//!
//! Output is always captured. A non-zero exit is an error unless the caller
//! opts out with [`RunOptions::ignore_return_code`], and the error carries the
//! captured stdout/stderr so a failed test shows what the tool printed.

use crate::error::{HarnessError, Result};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Options for a single command invocation
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Return the output even when the command exits non-zero
    pub ignore_return_code: bool,
    /// Working directory for the child process
    pub cwd: Option<PathBuf>,
    /// Kill the child and fail if it runs longer than this
    pub timeout: Option<Duration>,
}

impl RunOptions {
    #[must_use]
    pub fn ignore_return_code(mut self) -> Self {
        self.ignore_return_code = true;
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Render a program and its arguments the way a user would type them.
pub fn render_command<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(AsRef::as_ref))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run `program` with `args` and capture its output.
///
/// Fails with [`HarnessError::ToolNotFound`] before spawning when the program
/// is not on `PATH`.
pub async fn run<S>(program: &str, args: &[S], options: RunOptions) -> Result<CommandOutput>
where
    S: AsRef<str> + AsRef<OsStr>,
{
    let rendered = render_command(program, args);

    which::which(program).map_err(|e| {
        debug!(program, error = %e, "Tool lookup failed");
        HarnessError::ToolNotFound {
            program: program.to_string(),
        }
    })?;

    let mut command = Command::new(program);
    command.args(args).kill_on_drop(true);
    if let Some(cwd) = &options.cwd {
        command.current_dir(cwd);
    }

    let child = command.output();
    let output = match options.timeout {
        Some(timeout) => tokio::time::timeout(timeout, child)
            .await
            .map_err(|_elapsed| HarnessError::CommandTimedOut {
                command: rendered.clone(),
                timeout,
            })?,
        None => child.await,
    }
    .map_err(|source| HarnessError::Spawn {
        command: rendered.clone(),
        source,
    })?;

    let result = CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !options.ignore_return_code && !result.success() {
        return Err(HarnessError::CommandFailed {
            command: rendered,
            code: result.code,
            stdout: result.stdout,
            stderr: result.stderr,
        });
    }

    // One event per command so concurrent output never interleaves
    debug!(
        command = %rendered,
        code = ?result.code,
        stdout = %result.stdout,
        stderr = %result.stderr,
        "Command finished"
    );

    Ok(result)
}
