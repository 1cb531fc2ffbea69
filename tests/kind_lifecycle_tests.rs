//! # Kind Lifecycle Tests
//!
//! Cluster create / exists / destroy and the scoped fixture, run against a
//! fake `kind` that keeps its cluster list in a temp dir.

mod common;

use caapf_e2e::kind::KindCluster;
use caapf_e2e::session::with_kind_cluster;
use caapf_e2e::HarnessError;
use common::FakeTools;
use futures::FutureExt;
use std::cell::Cell;
use std::panic::AssertUnwindSafe;

fn cluster(tools: &FakeTools, name: &str) -> KindCluster {
    KindCluster::new(
        name,
        Some(tools.dir().join(format!("{name}.kubeconfig"))),
        None,
    )
    .unwrap()
    .with_binary(tools.kind())
}

#[tokio::test]
async fn test_create_then_exists() {
    caapf_e2e::logging::init_test_tracing();
    let tools = FakeTools::new();
    let mgmt = cluster(&tools, "mgmt");

    assert!(!mgmt.exists().await.unwrap());
    mgmt.create().await.unwrap();

    assert!(mgmt.exists().await.unwrap());
    assert!(mgmt.kubeconfig_path().is_file());
    assert_eq!(tools.clusters(), ["mgmt"]);
}

#[tokio::test]
async fn test_exists_matches_whole_names_only() {
    let tools = FakeTools::new();
    cluster(&tools, "mgmt-old").create().await.unwrap();

    assert!(!cluster(&tools, "mgmt").exists().await.unwrap());
    assert!(!cluster(&tools, "mgmt-o").exists().await.unwrap());
}

#[tokio::test]
async fn test_create_failure_propagates_stderr() {
    let tools = FakeTools::new();
    let mgmt = cluster(&tools, "mgmt");
    mgmt.create().await.unwrap();

    let err = mgmt.create().await.unwrap_err();
    match err {
        HarnessError::CommandFailed { code, stderr, .. } => {
            assert_eq!(code, Some(1));
            assert!(stderr.contains("already exist"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_destroy_missing_cluster_is_noop() {
    let tools = FakeTools::new();
    let mgmt = cluster(&tools, "mgmt");

    mgmt.destroy().await.unwrap();

    assert!(
        !tools.calls().iter().any(|call| call.starts_with("kind delete")),
        "delete issued for a missing cluster: {:?}",
        tools.calls()
    );
}

#[tokio::test]
async fn test_destroy_twice() {
    let tools = FakeTools::new();
    let mgmt = cluster(&tools, "mgmt");
    mgmt.create().await.unwrap();

    mgmt.destroy().await.unwrap();
    mgmt.destroy().await.unwrap();

    assert!(tools.clusters().is_empty());
    let deletes = tools
        .calls()
        .iter()
        .filter(|call| call.starts_with("kind delete"))
        .count();
    assert_eq!(deletes, 1);
}

#[tokio::test]
async fn test_out_of_band_removal_is_noticed() {
    let tools = FakeTools::new();
    let mgmt = cluster(&tools, "mgmt");
    mgmt.create().await.unwrap();

    tools.remove_out_of_band("mgmt");

    assert!(!mgmt.exists().await.unwrap());
    mgmt.destroy().await.unwrap();
}

#[tokio::test]
async fn test_named_handle_destroys_existing_cluster() {
    let tools = FakeTools::new();
    cluster(&tools, "mgmt").create().await.unwrap();

    let handle = KindCluster::named("mgmt").with_binary(tools.kind());
    assert!(handle.exists().await.unwrap());
    handle.destroy().await.unwrap();

    assert!(tools.clusters().is_empty());
    assert!(tools.calls().contains(&"kind delete cluster --name=mgmt".to_string()));
}

#[tokio::test]
async fn test_destroy_leaves_other_clusters() {
    let tools = FakeTools::new();
    let mgmt = cluster(&tools, "mgmt");
    let other = cluster(&tools, "workload");
    mgmt.create().await.unwrap();
    other.create().await.unwrap();

    mgmt.destroy().await.unwrap();

    assert_eq!(tools.clusters(), ["workload"]);
}

#[tokio::test]
async fn test_scoped_cluster_is_torn_down_after_success() {
    let tools = FakeTools::new();
    let mgmt = cluster(&tools, "mgmt");

    let value = with_kind_cluster(&mgmt, |_client| async {
        assert_eq!(tools.clusters(), ["mgmt"]);
        Ok(7)
    })
    .await
    .unwrap();

    assert_eq!(value, 7);
    assert!(tools.clusters().is_empty());
}

#[tokio::test]
async fn test_scoped_cluster_is_torn_down_after_error() {
    let tools = FakeTools::new();
    let mgmt = cluster(&tools, "mgmt");

    let err = with_kind_cluster(&mgmt, |_client| async {
        Err::<(), _>(HarnessError::StyleViolation("body failed".to_string()))
    })
    .await
    .unwrap_err();

    assert!(matches!(err, HarnessError::StyleViolation(_)));
    assert!(tools.clusters().is_empty());
}

#[tokio::test]
async fn test_scoped_cluster_is_torn_down_after_panic() {
    let tools = FakeTools::new();
    let mgmt = cluster(&tools, "mgmt");

    let outcome = AssertUnwindSafe(with_kind_cluster(&mgmt, |_client| async {
        assert!(tools.clusters().is_empty(), "failing assertion inside the test body");
        Ok(())
    }))
    .catch_unwind()
    .await;

    assert!(outcome.is_err());
    assert!(tools.clusters().is_empty());
}

#[tokio::test]
async fn test_failed_create_cleans_up_partial_cluster() {
    let tools = FakeTools::new();
    tools.fail_create();
    let mgmt = cluster(&tools, "mgmt");

    let body_ran = Cell::new(false);
    let err = with_kind_cluster(&mgmt, |_client| async {
        body_ran.set(true);
        Ok(())
    })
    .await
    .unwrap_err();

    assert!(matches!(err, HarnessError::CommandFailed { .. }));
    assert!(!body_ran.get());
    assert!(tools.clusters().is_empty());
}
