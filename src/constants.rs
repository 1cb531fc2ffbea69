//! # Constants
//!
//! Shared constants used throughout the harness.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Kubernetes version of the management cluster when none is configured
pub const DEFAULT_MGMT_K8S_VERSION: &str = "v1.27.0";

/// Name of the kind cluster that hosts the CAPI management plane
pub const DEFAULT_CLUSTER_NAME: &str = "mgmt";

/// How long each controller deployment gets to report a ready replica (seconds)
pub const DEFAULT_DEPLOYMENT_TIMEOUT_SECS: i64 = 60;

/// Delay between two readiness queries (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// Prefix of the per-run temporary directory
pub const SESSION_DIR_PREFIX: &str = "caapf-";

/// Node image repository used to pin the management cluster's Kubernetes version
pub const KIND_NODE_IMAGE_REPOSITORY: &str = "kindest/node";

/// Docker socket mounted into kind nodes so CAPD can start workload clusters
pub const DOCKER_SOCKET_PATH: &str = "/var/run/docker.sock";

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "caapf_e2e=info";

/// Marker `cargo fmt --check` prints for each file that needs reformatting
pub const RUSTFMT_DIFF_MARKER: &str = "Diff in";

/// Printed when the rustfmt check runs without a config path
pub const MISSING_FMT_CONFIG_MESSAGE: &str =
    "Please provide path to the rustfmt config using --fmt-config";
