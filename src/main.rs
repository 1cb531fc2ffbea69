//! # caapf-e2e
//!
//! Command-line entry point of the addon provider e2e harness.
//!
//! ```bash
//! # Create the kind cluster and bootstrap CAPI with the docker provider
//! caapf-e2e up --mgmt-k8s-version v1.27.0
//!
//! # Tear it down again (no-op when it is already gone)
//! caapf-e2e down
//!
//! # Check formatting and lint the Python test sources
//! caapf-e2e --fmt-config rustfmt.toml style
//! ```

use anyhow::{Context, Result};
use caapf_e2e::capi::{ManagementCluster, ProviderSelection};
use caapf_e2e::config::HarnessConfig;
use caapf_e2e::constants::{
    DEFAULT_CLUSTER_NAME, DEFAULT_DEPLOYMENT_TIMEOUT_SECS, DEFAULT_MGMT_K8S_VERSION,
};
use caapf_e2e::k8s::client_from_kubeconfig;
use caapf_e2e::kind::KindCluster;
use caapf_e2e::session::{bootstrap_management_cluster, TestSession};
use caapf_e2e::style::{check_python_style, check_rust_style, PylintOptions};
use caapf_e2e::{logging, HarnessError};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

/// End-to-end harness for the Cluster API addon provider
#[derive(Parser, Debug)]
#[command(name = "caapf-e2e", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// The k8s version of the management cluster
    #[arg(long, global = true, env = "CAAPF_E2E_MGMT_K8S_VERSION", default_value = DEFAULT_MGMT_K8S_VERSION)]
    mgmt_k8s_version: String,

    /// The path to the rustfmt config
    #[arg(long, global = true, env = "CAAPF_E2E_FMT_CONFIG")]
    fmt_config: Option<PathBuf>,

    /// Name of the kind cluster
    #[arg(long, global = true, env = "CAAPF_E2E_CLUSTER_NAME", default_value = DEFAULT_CLUSTER_NAME)]
    name: String,

    /// Directory for generated kubeconfigs (defaults to a fresh temp dir)
    #[arg(long, global = true, env = "CAAPF_E2E_RUN_PATH")]
    run_path: Option<PathBuf>,

    /// Seconds each controller deployment gets to become ready
    #[arg(long, global = true, env = "CAAPF_E2E_DEPLOYMENT_TIMEOUT_SECS", default_value_t = DEFAULT_DEPLOYMENT_TIMEOUT_SECS)]
    timeout: i64,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the kind cluster and bootstrap a CAPI management cluster on it
    Up,
    /// Delete the kind cluster if it exists
    Down,
    /// Run the Rust formatting check and the Python lint
    Style {
        /// Repository root the checks run in
        #[arg(long, default_value = ".")]
        workdir: PathBuf,

        /// Only run the Rust formatting check
        #[arg(long)]
        skip_python: bool,
    },
}

impl Cli {
    fn harness_config(&self) -> HarnessConfig {
        HarnessConfig {
            mgmt_k8s_version: self.mgmt_k8s_version.clone(),
            fmt_config: self.fmt_config.clone(),
            cluster_name: self.name.clone(),
            run_path: self.run_path.clone(),
            deployment_timeout_secs: self.timeout,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();

    info!(
        "caapf-e2e {} (git {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_GIT_HASH"),
        env!("BUILD_DATETIME")
    );

    let config = cli.harness_config();
    match cli.command {
        Commands::Up => up(config).await,
        Commands::Down => down(&config).await,
        Commands::Style {
            workdir,
            skip_python,
        } => style(&config, &workdir, skip_python).await,
    }
}

async fn up(config: HarnessConfig) -> Result<()> {
    let timeout = config.deployment_timeout_secs;
    let session = TestSession::new(config).context("Failed to prepare session directory")?;
    let cluster = session.kind_cluster()?;

    cluster
        .create()
        .await
        .with_context(|| format!("Failed to create kind cluster '{}'", cluster.name()))?;

    let client = client_from_kubeconfig(cluster.kubeconfig_path()).await?;
    let mgmt = ManagementCluster::new(cluster.kubeconfig_path());

    if let Err(e) =
        bootstrap_management_cluster(&mgmt, &client, &ProviderSelection::docker(), timeout).await
    {
        warn!(
            "Bootstrap failed; cluster '{}' is left running for inspection (run `caapf-e2e down` to remove it)",
            cluster.name()
        );
        return Err(e.into());
    }

    info!(
        "Management cluster ready, kubeconfig: {}",
        cluster.kubeconfig_path().display()
    );
    Ok(())
}

async fn down(config: &HarnessConfig) -> Result<()> {
    let cluster = KindCluster::named(config.cluster_name.as_str());

    cluster
        .destroy()
        .await
        .with_context(|| format!("Failed to delete kind cluster '{}'", cluster.name()))
}

async fn style(config: &HarnessConfig, workdir: &std::path::Path, skip_python: bool) -> Result<()> {
    let fmt_config = match config.require_fmt_config() {
        Ok(path) => path,
        Err(HarnessError::MissingConfig(message)) => {
            eprintln!("{message}");
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    check_rust_style(workdir, fmt_config).await?;
    info!("Rust formatting check passed");

    if !skip_python {
        check_python_style(workdir, &PylintOptions::default()).await?;
        info!("Python lint passed");
    }
    Ok(())
}
