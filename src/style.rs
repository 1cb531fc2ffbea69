//! # Style Checks
//!
//! Runs the formatters and linters that gate the repository's Rust and
//! Python sources.

use crate::command::{self, CommandOutput, RunOptions};
use crate::constants::RUSTFMT_DIFF_MARKER;
use crate::error::{HarnessError, Result};
use std::path::Path;
use tracing::info;

/// `cargo` arguments for a formatting check against `config`
#[must_use]
pub fn rustfmt_check_args(config: &Path) -> Vec<String> {
    vec![
        "fmt".to_string(),
        "--all".to_string(),
        "--".to_string(),
        "--check".to_string(),
        "--config-path".to_string(),
        config.display().to_string(),
    ]
}

/// True when `cargo fmt --check` reported files needing reformatting.
#[must_use]
pub fn has_rustfmt_diff(stdout: &str) -> bool {
    stdout.contains(RUSTFMT_DIFF_MARKER)
}

/// Check that the crate in `workdir` is formatted according to `config`.
pub async fn check_rust_style(workdir: &Path, config: &Path) -> Result<CommandOutput> {
    info!(config = %config.display(), "Checking Rust formatting");
    let output = command::run(
        "cargo",
        &rustfmt_check_args(config),
        RunOptions::default().cwd(workdir).ignore_return_code(),
    )
    .await?;

    if has_rustfmt_diff(&output.stdout) {
        return Err(HarnessError::StyleViolation(output.stdout));
    }
    if !output.success() {
        return Err(HarnessError::CommandFailed {
            command: command::render_command("cargo", &rustfmt_check_args(config)),
            code: output.code,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }
    Ok(output)
}

/// pylint invocation used for the Python test sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PylintOptions {
    pub targets: Vec<String>,
    pub attr_rgx: String,
    pub argument_rgx: String,
    pub variable_rgx: String,
    pub disabled: Vec<String>,
}

impl Default for PylintOptions {
    fn default() -> Self {
        Self {
            targets: vec!["tests".to_string()],
            attr_rgx: "[a-z_][a-z0-9_]{1,30}$".to_string(),
            argument_rgx: "[a-z_][a-z0-9_]{1,35}$".to_string(),
            variable_rgx: "[a-z_][a-z0-9_]{1,30}$".to_string(),
            disabled: [
                "fixme",
                "too-many-instance-attributes",
                "import-error",
                "too-many-locals",
                "too-many-arguments",
                "consider-using-f-string",
                "consider-using-with",
                "implicit-str-concat",
                "line-too-long",
                "redefined-outer-name",
                "broad-exception-raised",
                "duplicate-code",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl PylintOptions {
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--jobs=0".to_string(),
            "--persistent=no".to_string(),
            "--score=no".to_string(),
            "--output-format=colorized".to_string(),
            format!("--attr-rgx={}", self.attr_rgx),
            format!("--argument-rgx={}", self.argument_rgx),
            format!("--variable-rgx={}", self.variable_rgx),
        ];
        if !self.disabled.is_empty() {
            args.push(format!("--disable={}", self.disabled.join(",")));
        }
        args.extend(self.targets.iter().cloned());
        args
    }
}

/// Lint the Python sources under `workdir`; any pylint finding fails.
pub async fn check_python_style(workdir: &Path, options: &PylintOptions) -> Result<CommandOutput> {
    info!(targets = ?options.targets, "Linting Python sources");
    command::run("pylint", &options.args(), RunOptions::default().cwd(workdir)).await
}
