//! Common test utilities
//!
//! - [`ScriptedStatus`]: a deployment status source that answers from a script
//! - [`FakeTools`]: shell stand-ins for `kind` and `clusterctl` that keep their
//!   state in a temp dir, so lifecycle tests run without Docker

#![allow(dead_code, reason = "each test binary uses a different subset")]

use caapf_e2e::k8s::{DeploymentStatus, ReadinessQuery};
use caapf_e2e::{HarnessError, Result};
use std::collections::VecDeque;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;
use tokio::time::Instant;

/// One scripted answer
#[derive(Debug, Clone, Copy)]
pub enum Step {
    NotFound,
    NotReady,
    Ready(i32),
    /// Any failure other than "not found"
    Unreachable,
}

/// Deployment status source answering from a script, then repeating a fallback
#[derive(Debug)]
pub struct ScriptedStatus {
    steps: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: Mutex<Vec<(String, String, Instant)>>,
}

impl ScriptedStatus {
    pub fn new(steps: impl IntoIterator<Item = Step>, fallback: Step) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always(step: Step) -> Self {
        Self::new([], step)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// (name, namespace) of every query, in order
    pub fn queried(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, namespace, _)| (name.clone(), namespace.clone()))
            .collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, _, at)| *at).collect()
    }
}

#[async_trait::async_trait]
impl DeploymentStatus for ScriptedStatus {
    async fn query(&self, name: &str, namespace: &str) -> Result<ReadinessQuery> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), namespace.to_string(), Instant::now()));

        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);

        match step {
            Step::NotFound => Ok(ReadinessQuery::NotFound),
            Step::NotReady => Ok(ReadinessQuery::NotReady { ready_replicas: 0 }),
            Step::Ready(ready_replicas) => Ok(ReadinessQuery::Ready { ready_replicas }),
            Step::Unreachable => Err(HarnessError::Io {
                path: PathBuf::from("https://127.0.0.1:6443"),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                ),
            }),
        }
    }
}

const FAKE_KIND: &str = r#"#!/bin/sh
dir="$(cd "$(dirname "$0")" && pwd)"
state="$dir/clusters"
touch "$state"
echo "kind $*" >> "$dir/calls.log"

name=""
kubeconfig=""
for arg in "$@"; do
  case "$arg" in
    --name=*) name="${arg#--name=}" ;;
    --kubeconfig=*) kubeconfig="${arg#--kubeconfig=}" ;;
  esac
done

case "$1 $2" in
  "create cluster")
    if [ -f "$dir/fail-create" ]; then
      echo "ERROR: failed to create cluster: simulated failure" >&2
      echo "$name" >> "$state"
      exit 1
    fi
    if grep -qx "$name" "$state"; then
      echo "ERROR: failed to create cluster: node(s) already exist for a cluster with the name \"$name\"" >&2
      exit 1
    fi
    echo "$name" >> "$state"
    cp "$dir/kubeconfig.template" "$kubeconfig"
    ;;
  "delete cluster")
    grep -vx "$name" "$state" > "$state.tmp"
    mv "$state.tmp" "$state"
    ;;
  "get clusters")
    cat "$state"
    ;;
  *)
    echo "unknown command: $*" >&2
    exit 2
    ;;
esac
"#;

const FAKE_CLUSTERCTL: &str = r#"#!/bin/sh
dir="$(cd "$(dirname "$0")" && pwd)"
echo "clusterctl $*" >> "$dir/calls.log"
if [ -f "$dir/fail-init" ]; then
  echo "Error: failed to get provider components: simulated failure" >&2
  exit 1
fi
echo "Your management cluster has been initialized successfully!"
"#;

const FAKE_KUBECONFIG: &str = r#"apiVersion: v1
kind: Config
clusters:
- name: kind-fake
  cluster:
    server: http://127.0.0.1:1
contexts:
- name: kind-fake
  context:
    cluster: kind-fake
    user: kind-fake
current-context: kind-fake
users:
- name: kind-fake
  user:
    token: fake-token
"#;

/// Fake `kind` and `clusterctl` executables sharing a state dir
#[derive(Debug)]
pub struct FakeTools {
    dir: TempDir,
}

impl FakeTools {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        write_executable(&dir.path().join("kind"), FAKE_KIND);
        write_executable(&dir.path().join("clusterctl"), FAKE_CLUSTERCTL);
        std::fs::write(dir.path().join("kubeconfig.template"), FAKE_KUBECONFIG).unwrap();
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn kind(&self) -> String {
        self.dir.path().join("kind").display().to_string()
    }

    pub fn clusterctl(&self) -> String {
        self.dir.path().join("clusterctl").display().to_string()
    }

    /// Clusters the fake currently knows about
    pub fn clusters(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("clusters"))
            .unwrap_or_default()
            .lines()
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    }

    /// Every invocation, one line each
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }

    pub fn fail_create(&self) {
        std::fs::write(self.dir.path().join("fail-create"), "").unwrap();
    }

    pub fn fail_init(&self) {
        std::fs::write(self.dir.path().join("fail-init"), "").unwrap();
    }

    /// Remove a cluster behind the harness's back
    pub fn remove_out_of_band(&self, name: &str) {
        let remaining: Vec<String> = self.clusters().into_iter().filter(|c| c != name).collect();
        let mut contents = remaining.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        std::fs::write(self.dir.path().join("clusters"), contents).unwrap();
    }
}

fn write_executable(path: &Path, contents: &str) {
    std::fs::write(path, contents).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}
