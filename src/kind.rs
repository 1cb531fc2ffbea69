//! # Kind Clusters
//!
//! Lifecycle of the ephemeral kind cluster a test runs against.
//!
//! Nothing here caches cluster state: [`KindCluster::exists`] asks `kind`
//! every time, so a cluster deleted out-of-band is noticed and
//! [`KindCluster::destroy`] stays idempotent.

use crate::command::{self, RunOptions};
use crate::constants::DOCKER_SOCKET_PATH;
use crate::error::{HarnessError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const KIND_BINARY: &str = "kind";

/// A kind cluster owned by a single test invocation
#[derive(Debug, Clone)]
pub struct KindCluster {
    name: String,
    kubeconfig_path: PathBuf,
    config_file: Option<PathBuf>,
    node_image: Option<String>,
    binary: String,
}

impl KindCluster {
    /// Describe a cluster; nothing is provisioned until [`create`](Self::create).
    ///
    /// Without an explicit kubeconfig path a `mgmt_*.kubeconfig` file is
    /// generated in the system temp dir and kept after the harness exits.
    pub fn new(
        name: impl Into<String>,
        kubeconfig: Option<PathBuf>,
        config_file: Option<PathBuf>,
    ) -> Result<Self> {
        let kubeconfig_path = match kubeconfig {
            Some(path) => path,
            None => generated_kubeconfig_path()?,
        };

        Ok(Self {
            name: name.into(),
            kubeconfig_path,
            config_file,
            node_image: None,
            binary: KIND_BINARY.to_string(),
        })
    }

    /// Handle to an existing cluster by name, for [`exists`](Self::exists)
    /// and [`destroy`](Self::destroy).
    ///
    /// No kubeconfig is tracked; [`create`](Self::create) on this handle lets
    /// kind write to its default kubeconfig.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kubeconfig_path: PathBuf::new(),
            config_file: None,
            node_image: None,
            binary: KIND_BINARY.to_string(),
        }
    }

    /// Pin the node image (and with it the Kubernetes version).
    #[must_use]
    pub fn with_node_image(mut self, image: impl Into<String>) -> Self {
        self.node_image = Some(image.into());
        self
    }

    /// Use a different `kind` executable.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kubeconfig_path(&self) -> &Path {
        &self.kubeconfig_path
    }

    #[must_use]
    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    #[must_use]
    pub fn create_args(&self) -> Vec<String> {
        let mut args = vec![
            "create".to_string(),
            "cluster".to_string(),
            format!("--name={}", self.name),
        ];
        if !self.kubeconfig_path.as_os_str().is_empty() {
            args.push(format!("--kubeconfig={}", self.kubeconfig_path.display()));
        }
        if let Some(config_file) = &self.config_file {
            args.push("--config".to_string());
            args.push(config_file.display().to_string());
        }
        if let Some(image) = &self.node_image {
            args.push("--image".to_string());
            args.push(image.clone());
        }
        args
    }

    #[must_use]
    pub fn delete_args(&self) -> Vec<String> {
        vec![
            "delete".to_string(),
            "cluster".to_string(),
            format!("--name={}", self.name),
        ]
    }

    /// Provision the cluster and write its kubeconfig.
    pub async fn create(&self) -> Result<()> {
        info!("Creating cluster {}", self.name);
        command::run(&self.binary, &self.create_args(), RunOptions::default()).await?;
        info!("Created cluster {}", self.name);
        Ok(())
    }

    /// Whether `kind get clusters` currently lists this cluster.
    pub async fn exists(&self) -> Result<bool> {
        let output =
            command::run(&self.binary, &["get", "clusters"], RunOptions::default()).await?;
        Ok(parse_cluster_list(&output.stdout)
            .iter()
            .any(|name| *name == self.name))
    }

    /// Delete the cluster; a no-op when it does not exist.
    pub async fn destroy(&self) -> Result<()> {
        if !self.exists().await? {
            info!("Cluster {} doesn't exist, skipping deletion", self.name);
            return Ok(());
        }

        info!("Deleting cluster {}", self.name);
        command::run(&self.binary, &self.delete_args(), RunOptions::default()).await?;
        info!("Deleted cluster {}", self.name);
        Ok(())
    }
}

/// Cluster names from `kind get clusters` output, one per line.
#[must_use]
pub fn parse_cluster_list(stdout: &str) -> Vec<&str> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

fn generated_kubeconfig_path() -> Result<PathBuf> {
    let file = tempfile::Builder::new()
        .prefix("mgmt_")
        .suffix(".kubeconfig")
        .tempfile()
        .map_err(|e| HarnessError::io(std::env::temp_dir(), e))?;
    file.into_temp_path()
        .keep()
        .map_err(|e| HarnessError::io(e.path.to_path_buf(), e.error))
}

/// kind `Cluster` configuration (`kind.x-k8s.io/v1alpha4`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindConfig {
    pub kind: String,
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<KindNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindNode {
    pub role: NodeRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_mounts: Vec<ExtraMount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    ControlPlane,
    Worker,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraMount {
    pub host_path: String,
    pub container_path: String,
}

impl Default for KindConfig {
    fn default() -> Self {
        Self {
            kind: "Cluster".to_string(),
            api_version: "kind.x-k8s.io/v1alpha4".to_string(),
            nodes: Vec::new(),
        }
    }
}

impl KindConfig {
    /// Single control-plane node with the host docker socket mounted.
    ///
    /// The CAPI docker provider starts workload cluster nodes through that
    /// socket from inside the management cluster.
    #[must_use]
    pub fn for_capd() -> Self {
        Self {
            nodes: vec![KindNode {
                role: NodeRole::ControlPlane,
                image: None,
                extra_mounts: vec![ExtraMount {
                    host_path: DOCKER_SOCKET_PATH.to_string(),
                    container_path: DOCKER_SOCKET_PATH.to_string(),
                }],
            }],
            ..Self::default()
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Render to `path` for `kind create cluster --config`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_yaml()?).map_err(|e| HarnessError::io(path, e))
    }
}
