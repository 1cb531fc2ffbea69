//! # Errors
//!
//! Error type shared by every harness module.
//!
//! Each variant maps to one failure class a test can hit:
//!
//! - **Command failures** - an external tool (`kind`, `clusterctl`, `cargo`,
//!   `pylint`) could not be spawned, exited non-zero, or overran its timeout
//! - **Deadline exceeded** - a [`Deadline`](crate::timeout::Deadline) fired
//!   before the guarded operation finished
//! - **Kubernetes failures** - anything the API returned other than a 404
//!   while polling readiness
//! - **Configuration** - missing or invalid harness inputs, reported before
//!   anything is provisioned

use kube::config::KubeconfigError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("`{program}` was not found on PATH")]
    ToolNotFound { program: String },

    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command `{command}` exited with {}\nstdout:\n{stdout}\nstderr:\n{stderr}", exit_code_display(.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("command `{command}` did not finish within {timeout:?}")]
    CommandTimedOut { command: String, timeout: Duration },

    #[error("deadline of {seconds}s exceeded: {message}")]
    DeadlineExceeded { message: String, seconds: i64 },

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("failed to load kubeconfig {path}: {source}")]
    Kubeconfig {
        path: PathBuf,
        #[source]
        source: KubeconfigError,
    },

    #[error("invalid {kind} provider name {name:?}: {reason}")]
    InvalidProvider {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("{0}")]
    MissingConfig(String),

    #[error("style check failed: {0}")]
    StyleViolation(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render kind config: {0}")]
    KindConfig(#[from] serde_yaml::Error),
}

impl HarnessError {
    /// True when the failure came from a [`Deadline`](crate::timeout::Deadline)
    /// rather than from the guarded operation itself.
    #[must_use]
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, HarnessError::DeadlineExceeded { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarnessError::Io {
            path: path.into(),
            source,
        }
    }
}

fn exit_code_display(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;
