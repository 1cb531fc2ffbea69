//! # Harness Configuration
//!
//! Settings shared by the binary and the integration tests.
//!
//! All settings have defaults and can be overridden via environment variables
//! (`CAAPF_E2E_*`), which is how `cargo test` runs receive them. The binary
//! layers its command-line flags on top.

use crate::constants::{
    DEFAULT_CLUSTER_NAME, DEFAULT_DEPLOYMENT_TIMEOUT_SECS, DEFAULT_MGMT_K8S_VERSION,
    KIND_NODE_IMAGE_REPOSITORY, MISSING_FMT_CONFIG_MESSAGE,
};
use crate::error::{HarnessError, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Kubernetes version of the management cluster (e.g. `v1.27.0`)
    pub mgmt_k8s_version: String,
    /// Path to the rustfmt config, required only by the Rust style check
    pub fmt_config: Option<PathBuf>,
    /// Name of the kind cluster
    pub cluster_name: String,
    /// Directory for kubeconfigs and kind configs; a fresh temp dir when unset
    pub run_path: Option<PathBuf>,
    /// Per-deployment readiness timeout (seconds)
    pub deployment_timeout_secs: i64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            mgmt_k8s_version: DEFAULT_MGMT_K8S_VERSION.to_string(),
            fmt_config: None,
            cluster_name: DEFAULT_CLUSTER_NAME.to_string(),
            run_path: None,
            deployment_timeout_secs: DEFAULT_DEPLOYMENT_TIMEOUT_SECS,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            mgmt_k8s_version: env_var_or_default_str(
                "CAAPF_E2E_MGMT_K8S_VERSION",
                DEFAULT_MGMT_K8S_VERSION,
            ),
            fmt_config: env_var_opt("CAAPF_E2E_FMT_CONFIG").map(PathBuf::from),
            cluster_name: env_var_or_default_str("CAAPF_E2E_CLUSTER_NAME", DEFAULT_CLUSTER_NAME),
            run_path: env_var_opt("CAAPF_E2E_RUN_PATH").map(PathBuf::from),
            deployment_timeout_secs: env_var_or_default(
                "CAAPF_E2E_DEPLOYMENT_TIMEOUT_SECS",
                DEFAULT_DEPLOYMENT_TIMEOUT_SECS,
            ),
        }
    }

    /// The rustfmt config path, or the instruction to supply one.
    pub fn require_fmt_config(&self) -> Result<&Path> {
        self.fmt_config
            .as_deref()
            .ok_or_else(|| HarnessError::MissingConfig(MISSING_FMT_CONFIG_MESSAGE.to_string()))
    }

    /// kind node image pinned to the management Kubernetes version
    #[must_use]
    pub fn node_image(&self) -> String {
        let version = self.mgmt_k8s_version.trim();
        if version.starts_with('v') {
            format!("{KIND_NODE_IMAGE_REPOSITORY}:{version}")
        } else {
            format!("{KIND_NODE_IMAGE_REPOSITORY}:v{version}")
        }
    }
}

fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_var_or_default<T: FromStr>(key: &str, default: T) -> T {
    env_var_opt(key)
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

fn env_var_or_default_str(key: &str, default: &str) -> String {
    env_var_opt(key).unwrap_or_else(|| default.to_string())
}
