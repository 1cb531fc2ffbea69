//! # Kubernetes Helpers
//!
//! Client construction for the generated kubeconfig and the deployment
//! readiness poller.
//!
//! The poller treats "deployment not found" like "deployment not ready yet":
//! both mean the controller has not published status so far, and both are
//! retried until the [`Deadline`] fires. Not-found answers are still counted
//! in the returned [`ReadinessReport`] and logged at `debug`.

use crate::constants::{DEFAULT_DEPLOYMENT_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_SECS};
use crate::error::{HarnessError, Result};
use crate::timeout::Deadline;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::path::Path;
use std::sync::Once;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

static RUSTLS_INIT: Once = Once::new();

/// Install the ring crypto provider for rustls.
///
/// Must run before the first client is built. Safe to call repeatedly.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // Another component may have installed a provider already; either is fine
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Build a client for the current context of the kubeconfig at `path`.
pub async fn client_from_kubeconfig(path: &Path) -> Result<Client> {
    init_rustls();

    let kubeconfig_error = |source| HarnessError::Kubeconfig {
        path: path.to_path_buf(),
        source,
    };
    let kubeconfig = Kubeconfig::read_from(path).map_err(kubeconfig_error)?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(kubeconfig_error)?;

    Ok(Client::try_from(config)?)
}

/// Status of a deployment as seen by one query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessQuery {
    /// The deployment does not exist (yet)
    NotFound,
    /// The deployment exists but no replica reports ready
    NotReady { ready_replicas: i32 },
    /// At least one replica reports ready
    Ready { ready_replicas: i32 },
}

impl ReadinessQuery {
    #[must_use]
    pub fn from_deployment(deployment: &Deployment) -> Self {
        let ready_replicas = deployment
            .status
            .as_ref()
            .and_then(|status| status.ready_replicas)
            .unwrap_or(0);

        if ready_replicas > 0 {
            ReadinessQuery::Ready { ready_replicas }
        } else {
            ReadinessQuery::NotReady { ready_replicas }
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, ReadinessQuery::Ready { .. })
    }
}

/// Source of deployment status
///
/// Implemented for [`kube::Client`]; tests substitute scripted sources.
#[async_trait]
pub trait DeploymentStatus: Send + Sync {
    /// Query the deployment once. Anything other than a 404 is an error.
    async fn query(&self, name: &str, namespace: &str) -> Result<ReadinessQuery>;
}

#[async_trait]
impl DeploymentStatus for Client {
    async fn query(&self, name: &str, namespace: &str) -> Result<ReadinessQuery> {
        let api: Api<Deployment> = Api::namespaced(self.clone(), namespace);
        match api.get_status(name).await {
            Ok(deployment) => Ok(ReadinessQuery::from_deployment(&deployment)),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(ReadinessQuery::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}

/// Poll cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between a not-ready answer and the next query
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

/// What the poller observed on the way to a ready deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessReport {
    /// Queries issued, including the successful one
    pub attempts: u32,
    /// Queries answered with "not found"
    pub not_found_attempts: u32,
    /// Ready replicas reported by the final query
    pub ready_replicas: i32,
    pub elapsed: Duration,
}

/// Message attached to the deadline error of a readiness wait
#[must_use]
pub fn readiness_message(name: &str, namespace: &str) -> String {
    format!("waiting for {name} ({namespace}) deployment to be ready")
}

/// Wait until deployment `name` in `namespace` has a ready replica.
///
/// Fails with [`HarnessError::DeadlineExceeded`] after `timeout_secs`.
pub async fn wait_for_deployment_ready<S>(
    source: &S,
    name: &str,
    namespace: &str,
    timeout_secs: i64,
) -> Result<ReadinessReport>
where
    S: DeploymentStatus + ?Sized,
{
    let deadline = Deadline::start(timeout_secs, readiness_message(name, namespace));
    let result =
        wait_for_deployment_ready_with(source, name, namespace, &deadline, &PollSettings::default())
            .await;
    deadline.disarm();
    result
}

/// [`wait_for_deployment_ready`] with the default 60 second timeout.
pub async fn wait_for_deployment_ready_default<S>(
    source: &S,
    name: &str,
    namespace: &str,
) -> Result<ReadinessReport>
where
    S: DeploymentStatus + ?Sized,
{
    wait_for_deployment_ready(source, name, namespace, DEFAULT_DEPLOYMENT_TIMEOUT_SECS).await
}

/// Poll under a caller-owned deadline.
///
/// The deadline is checked before every query and raced against both the
/// query and the retry delay, so a hung API server cannot hold the poll past
/// expiry.
pub async fn wait_for_deployment_ready_with<S>(
    source: &S,
    name: &str,
    namespace: &str,
    deadline: &Deadline,
    settings: &PollSettings,
) -> Result<ReadinessReport>
where
    S: DeploymentStatus + ?Sized,
{
    let start = Instant::now();
    let mut attempts = 0u32;
    let mut not_found_attempts = 0u32;

    loop {
        deadline.check()?;

        attempts += 1;
        let query = tokio::select! {
            biased;
            () = deadline.expired() => return Err(deadline.exceeded()),
            query = source.query(name, namespace) => query?,
        };
        match query {
            ReadinessQuery::Ready { ready_replicas } => {
                info!(
                    deployment = name,
                    namespace,
                    ready_replicas,
                    attempts,
                    "Deployment is ready"
                );
                return Ok(ReadinessReport {
                    attempts,
                    not_found_attempts,
                    ready_replicas,
                    elapsed: start.elapsed(),
                });
            }
            ReadinessQuery::NotFound => {
                not_found_attempts += 1;
                debug!(deployment = name, namespace, attempts, "Deployment not found yet");
            }
            ReadinessQuery::NotReady { ready_replicas } => {
                debug!(
                    deployment = name,
                    namespace,
                    ready_replicas,
                    attempts,
                    "Deployment not ready yet"
                );
            }
        }

        tokio::select! {
            biased;
            () = deadline.expired() => return Err(deadline.exceeded()),
            () = tokio::time::sleep(settings.interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::DeploymentStatus as K8sDeploymentStatus;

    fn deployment(ready_replicas: Option<i32>) -> Deployment {
        Deployment {
            status: Some(K8sDeploymentStatus {
                ready_replicas,
                ..K8sDeploymentStatus::default()
            }),
            ..Deployment::default()
        }
    }

    #[test]
    fn test_ready_replicas_classification() {
        assert_eq!(
            ReadinessQuery::from_deployment(&deployment(Some(2))),
            ReadinessQuery::Ready { ready_replicas: 2 }
        );
        assert_eq!(
            ReadinessQuery::from_deployment(&deployment(Some(0))),
            ReadinessQuery::NotReady { ready_replicas: 0 }
        );
        assert_eq!(
            ReadinessQuery::from_deployment(&deployment(None)),
            ReadinessQuery::NotReady { ready_replicas: 0 }
        );
        assert_eq!(
            ReadinessQuery::from_deployment(&Deployment::default()),
            ReadinessQuery::NotReady { ready_replicas: 0 }
        );
    }

    #[test]
    fn test_readiness_message() {
        assert_eq!(
            readiness_message("capd-controller-manager", "capd-system"),
            "waiting for capd-controller-manager (capd-system) deployment to be ready"
        );
    }

    #[tokio::test]
    async fn test_unreadable_kubeconfig_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.kubeconfig");

        let err = client_from_kubeconfig(&path).await.err().expect("expected an error");

        match &err {
            HarnessError::Kubeconfig { path: reported, .. } => assert_eq!(reported, &path),
            other => panic!("unexpected error: {other}"),
        }
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_default_poll_interval_is_one_second() {
        assert_eq!(PollSettings::default().interval, Duration::from_secs(1));
    }
}
