//! # Cluster API Management Cluster
//!
//! Turns a plain cluster into a CAPI management cluster with
//! `clusterctl init` and waits for the provider controllers to come up.

use crate::command::{self, RunOptions};
use crate::error::{HarnessError, Result};
use crate::k8s::{wait_for_deployment_ready, DeploymentStatus, ReadinessReport};
use std::path::{Path, PathBuf};
use tracing::info;

const CLUSTERCTL_BINARY: &str = "clusterctl";

/// Controller deployments (name, namespace) of a docker-backed management cluster
pub const CONTROLLER_DEPLOYMENTS: [(&str, &str); 3] = [
    ("capd-controller-manager", "capd-system"),
    (
        "capi-kubeadm-bootstrap-controller-manager",
        "capi-kubeadm-bootstrap-system",
    ),
    (
        "capi-kubeadm-control-plane-controller-manager",
        "capi-kubeadm-control-plane-system",
    ),
];

/// Providers to install with `clusterctl init`
///
/// Each list may be empty, in which case clusterctl picks its default for that
/// provider type (kubeadm for bootstrap and control plane).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSelection {
    pub infrastructure: Vec<String>,
    pub bootstrap: Vec<String>,
    pub control_plane: Vec<String>,
}

impl ProviderSelection {
    /// Docker infrastructure with default bootstrap and control plane providers
    #[must_use]
    pub fn docker() -> Self {
        Self {
            infrastructure: vec!["docker".to_string()],
            ..Self::default()
        }
    }

    /// Reject names clusterctl would misparse.
    pub fn validate(&self) -> Result<()> {
        for (kind, names) in self.groups() {
            for name in names {
                if name.trim().is_empty() {
                    return Err(HarnessError::InvalidProvider {
                        kind,
                        name: name.clone(),
                        reason: "name is empty",
                    });
                }
                if name.chars().any(char::is_whitespace) {
                    return Err(HarnessError::InvalidProvider {
                        kind,
                        name: name.clone(),
                        reason: "name contains whitespace",
                    });
                }
                if name.contains(',') {
                    return Err(HarnessError::InvalidProvider {
                        kind,
                        name: name.clone(),
                        reason: "list each provider separately instead of comma-joining",
                    });
                }
            }
        }
        Ok(())
    }

    fn groups(&self) -> [(&'static str, &[String]); 3] {
        [
            ("infrastructure", &self.infrastructure),
            ("bootstrap", &self.bootstrap),
            ("control-plane", &self.control_plane),
        ]
    }
}

/// A CAPI management cluster reachable through a kubeconfig
#[derive(Debug, Clone)]
pub struct ManagementCluster {
    kubeconfig: PathBuf,
    binary: String,
}

impl ManagementCluster {
    #[must_use]
    pub fn new(kubeconfig: impl Into<PathBuf>) -> Self {
        Self {
            kubeconfig: kubeconfig.into(),
            binary: CLUSTERCTL_BINARY.to_string(),
        }
    }

    /// Use a different `clusterctl` executable.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    #[must_use]
    pub fn kubeconfig(&self) -> &Path {
        &self.kubeconfig
    }

    /// `clusterctl init` arguments for `providers`, validated first.
    pub fn init_args(&self, providers: &ProviderSelection) -> Result<Vec<String>> {
        providers.validate()?;

        let mut args = vec![
            "init".to_string(),
            format!("--kubeconfig={}", self.kubeconfig.display()),
        ];
        for (flag, names) in [
            ("-i", &providers.infrastructure),
            ("-b", &providers.bootstrap),
            ("-c", &providers.control_plane),
        ] {
            for name in names {
                args.push(flag.to_string());
                args.push(name.clone());
            }
        }
        Ok(args)
    }

    /// Install the CAPI core and the selected providers.
    pub async fn init(&self, providers: &ProviderSelection) -> Result<()> {
        let args = self.init_args(providers)?;

        info!("Creating capi management cluster");
        command::run(&self.binary, &args, RunOptions::default()).await?;
        info!("Created capi management cluster");
        Ok(())
    }
}

/// Wait for every [`CONTROLLER_DEPLOYMENTS`] entry, each with its own timeout.
pub async fn wait_for_controllers<S>(source: &S, timeout_secs: i64) -> Result<Vec<ReadinessReport>>
where
    S: DeploymentStatus + ?Sized,
{
    let mut reports = Vec::with_capacity(CONTROLLER_DEPLOYMENTS.len());
    for (name, namespace) in CONTROLLER_DEPLOYMENTS {
        reports.push(wait_for_deployment_ready(source, name, namespace, timeout_secs).await?);
    }
    Ok(reports)
}
