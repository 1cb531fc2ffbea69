//! End-to-end harness for the Cluster API addon provider
//!
//! Provisions an ephemeral kind cluster, turns it into a CAPI management
//! cluster with `clusterctl`, and waits for the provider controllers before
//! the addon provider is exercised. Also hosts the style checks for the
//! repository's Rust and Python sources.
//!
//! ## Quick Start
//!
//! ```no_run
//! use caapf_e2e::prelude::*;
//!
//! # async fn example() -> caapf_e2e::Result<()> {
//! let session = TestSession::new(HarnessConfig::from_env())?;
//! let cluster = session.kind_cluster()?;
//! let kubeconfig = cluster.kubeconfig_path().to_path_buf();
//!
//! with_kind_cluster(&cluster, |client| async move {
//!     let mgmt = ManagementCluster::new(kubeconfig);
//!     bootstrap_management_cluster(&mgmt, &client, &ProviderSelection::docker(), 60).await?;
//!     Ok(())
//! })
//! .await
//! # }
//! ```

pub mod capi;
pub mod command;
pub mod config;
pub mod constants;
pub mod error;
pub mod k8s;
pub mod kind;
pub mod logging;
pub mod prelude;
pub mod session;
pub mod style;
pub mod timeout;

pub use error::{HarnessError, Result};
