//! Commonly used types and functions.

pub use crate::capi::{ManagementCluster, ProviderSelection, CONTROLLER_DEPLOYMENTS};
pub use crate::config::HarnessConfig;
pub use crate::error::{HarnessError, Result};
pub use crate::k8s::{
    client_from_kubeconfig, wait_for_deployment_ready, DeploymentStatus, PollSettings,
    ReadinessQuery, ReadinessReport,
};
pub use crate::kind::{KindCluster, KindConfig};
pub use crate::session::{bootstrap_management_cluster, with_kind_cluster, TestSession};
pub use crate::timeout::{with_deadline, Deadline};
