//! # Test Session
//!
//! Fixtures tying the pieces together for a test run: a per-run directory,
//! the kind cluster living in it, and the CAPI bootstrap on top.
//!
//! Acquisition, use and teardown are strictly ordered. [`with_kind_cluster`]
//! destroys the cluster after the body finishes, whether the body returned
//! an error or panicked on a failed assertion.

use crate::capi::{wait_for_controllers, ManagementCluster, ProviderSelection};
use crate::config::HarnessConfig;
use crate::constants::SESSION_DIR_PREFIX;
use crate::error::{HarnessError, Result};
use crate::k8s::{client_from_kubeconfig, DeploymentStatus, ReadinessReport};
use crate::kind::{KindCluster, KindConfig};
use futures::FutureExt;
use kube::Client;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Per-run state shared by every test in the run
#[derive(Debug, Clone)]
pub struct TestSession {
    run_path: PathBuf,
    config: HarnessConfig,
}

impl TestSession {
    /// Use `config.run_path`, or create a `caapf-*` temp dir.
    ///
    /// The directory is left in place when the run ends so kubeconfigs can be
    /// inspected after a failure.
    pub fn new(config: HarnessConfig) -> Result<Self> {
        let run_path = match &config.run_path {
            Some(path) => {
                std::fs::create_dir_all(path).map_err(|e| HarnessError::io(path, e))?;
                path.clone()
            }
            None => tempfile::Builder::new()
                .prefix(SESSION_DIR_PREFIX)
                .tempdir()
                .map_err(|e| HarnessError::io(std::env::temp_dir(), e))?
                .keep(),
        };
        info!(run_path = %run_path.display(), "Test session directory ready");

        Ok(Self { run_path, config })
    }

    #[must_use]
    pub fn run_path(&self) -> &Path {
        &self.run_path
    }

    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// The configured kind cluster with its kubeconfig and kind config in the run dir.
    pub fn kind_cluster(&self) -> Result<KindCluster> {
        let name = &self.config.cluster_name;
        let kind_config = self.run_path.join(format!("{name}-kind.yaml"));
        KindConfig::for_capd().write_to(&kind_config)?;

        Ok(KindCluster::new(
            name.clone(),
            Some(self.run_path.join(format!("{name}.kubeconfig"))),
            Some(kind_config),
        )?
        .with_node_image(self.config.node_image()))
    }
}

/// Create `cluster`, run `body` with a client for it, then destroy it.
///
/// Teardown runs on every path. A teardown failure is reported only when the
/// body succeeded; otherwise the body's error (or panic) wins and the
/// teardown failure is logged.
pub async fn with_kind_cluster<T, F, Fut>(cluster: &KindCluster, body: F) -> Result<T>
where
    F: FnOnce(Client) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if let Err(e) = cluster.create().await {
        // kind can leave a half-created cluster behind
        if let Err(teardown) = cluster.destroy().await {
            warn!("Cleanup after failed create of {} failed: {}", cluster.name(), teardown);
        }
        return Err(e);
    }

    let outcome = AssertUnwindSafe(async {
        let client = client_from_kubeconfig(cluster.kubeconfig_path()).await?;
        body(client).await
    })
    .catch_unwind()
    .await;

    let teardown = cluster.destroy().await;

    match outcome {
        Err(panic) => {
            if let Err(e) = teardown {
                error!("Teardown of {} failed after panic: {}", cluster.name(), e);
            }
            std::panic::resume_unwind(panic)
        }
        Ok(Err(e)) => {
            if let Err(teardown) = teardown {
                error!("Teardown of {} failed: {}", cluster.name(), teardown);
            }
            Err(e)
        }
        Ok(Ok(value)) => {
            teardown?;
            Ok(value)
        }
    }
}

/// `clusterctl init` the selected providers and wait for their controllers.
pub async fn bootstrap_management_cluster<S>(
    mgmt: &ManagementCluster,
    status: &S,
    providers: &ProviderSelection,
    timeout_secs: i64,
) -> Result<Vec<ReadinessReport>>
where
    S: DeploymentStatus + ?Sized,
{
    mgmt.init(providers).await?;
    let reports = wait_for_controllers(status, timeout_secs).await?;
    info!(
        kubeconfig = %mgmt.kubeconfig().display(),
        "Management cluster controllers are ready"
    );
    Ok(reports)
}
