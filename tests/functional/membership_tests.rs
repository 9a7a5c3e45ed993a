//! Membership operations: one command per call, errors naming what was attempted.

use valkey_topology::{Error, NodeRole, Operation, ResetKind};

use crate::mock_executor::{MockExecutor, orchestrator, via};

fn addresses() -> Vec<String> {
    vec![
        "10.0.0.1".to_string(),
        "10.0.0.2".to_string(),
        "10.0.0.3".to_string(),
    ]
}

#[tokio::test]
async fn test_create_cluster_issues_single_confirmed_command() {
    let exec = MockExecutor::new();
    orchestrator()
        .create_cluster(&exec, &via(), &addresses())
        .await
        .expect("create should succeed");

    let calls = exec.calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.target, "valkey-0");
    assert!(call.has_token("create"));
    for addr in ["10.0.0.1:6379", "10.0.0.2:6379", "10.0.0.3:6379"] {
        assert!(call.has_token(addr), "missing {}", addr);
    }
    assert_eq!(call.arg_after("--cluster-replicas"), Some("0"));
    assert!(call.stdin.as_deref().unwrap().starts_with("yes"));
}

#[tokio::test]
async fn test_create_cluster_rejects_empty_address_list() {
    let exec = MockExecutor::new();
    let err = orchestrator()
        .create_cluster(&exec, &via(), &[])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert!(exec.calls().is_empty());
}

#[tokio::test]
async fn test_create_cluster_failure_lists_addresses() {
    let exec = MockExecutor::failing();
    let err = orchestrator()
        .create_cluster(&exec, &via(), &addresses())
        .await
        .unwrap_err();

    assert_eq!(err.operation(), Some(Operation::CreateCluster));
    let text = err.to_string();
    for addr in addresses() {
        assert!(text.contains(&addr), "{} missing from {}", addr, text);
    }
}

#[tokio::test]
async fn test_add_node_without_master_joins_as_master() {
    for master_id in [None, Some("")] {
        let exec = MockExecutor::new();
        orchestrator()
            .add_node(&exec, &via(), "10.0.0.9", "10.0.0.1", master_id)
            .await
            .unwrap();

        let calls = exec.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].has_token("add-node"));
        assert!(!calls[0].has_token("--cluster-replica"));
        assert!(!calls[0].has_token("--cluster-master-id"));
    }
}

#[tokio::test]
async fn test_add_node_with_master_joins_as_replica() {
    let exec = MockExecutor::new();
    orchestrator()
        .add_node(&exec, &via(), "10.0.0.9", "10.0.0.1", Some("abc123"))
        .await
        .unwrap();

    let calls = exec.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].has_token("--cluster-replica"));
    assert_eq!(calls[0].arg_after("--cluster-master-id"), Some("abc123"));
    assert!(calls[0].has_token("10.0.0.9:6379"));
    assert!(calls[0].has_token("10.0.0.1:6379"));
}

#[tokio::test]
async fn test_add_node_failures_name_the_role() {
    let exec = MockExecutor::failing();
    let err = orchestrator()
        .add_node(&exec, &via(), "10.0.0.9", "10.0.0.1", None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("\"10.0.0.9\" as a master"));

    let exec = MockExecutor::failing();
    let err = orchestrator()
        .add_node(&exec, &via(), "10.0.0.9", "10.0.0.1", Some("abc123"))
        .await
        .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("as a replica of master with id \"abc123\""));
}

#[tokio::test]
async fn test_delete_node_failure_contains_node_id() {
    let exec = MockExecutor::failing();
    let err = orchestrator()
        .delete_node(&exec, &via(), "10.0.0.1", "e7d1eecce10fd6bb5eb35b9f99a514335d9ba9ca")
        .await
        .unwrap_err();

    assert_eq!(exec.calls().len(), 1);
    assert_eq!(err.operation(), Some(Operation::DeleteNode));
    assert!(
        err.to_string()
            .contains("e7d1eecce10fd6bb5eb35b9f99a514335d9ba9ca")
    );
}

#[tokio::test]
async fn test_delete_node_command() {
    let exec = MockExecutor::new();
    orchestrator()
        .delete_node(&exec, &via(), "10.0.0.1", "abc123")
        .await
        .unwrap();

    let call = &exec.calls()[0];
    assert_eq!(call.arg_after("del-node"), Some("10.0.0.1:6379"));
    assert_eq!(call.command.last().map(String::as_str), Some("abc123"));
}

#[tokio::test]
async fn test_ping_trims_reply() {
    let exec = MockExecutor::with_output("  PONG\n");
    let pong = orchestrator()
        .ping(&exec, &via(), "10.0.0.2")
        .await
        .unwrap();

    assert_eq!(pong, "PONG");
    assert_eq!(exec.calls()[0].arg_after("-h"), Some("10.0.0.2"));
}

#[tokio::test]
async fn test_ping_failure_is_liveness_failure() {
    let exec = MockExecutor::failing();
    let err = orchestrator()
        .ping(&exec, &via(), "10.0.0.2")
        .await
        .unwrap_err();

    assert!(err.is_liveness_failure());
    assert!(err.to_string().contains("10.0.0.2"));
}

#[tokio::test]
async fn test_get_cluster_nodes_returns_trimmed_text() {
    let raw = "abc 10.0.0.1:6379@16379 myself,master - 0 0 1 connected 0-16383\n\n";
    let exec = MockExecutor::with_output(raw);
    let out = orchestrator()
        .get_cluster_nodes(&exec, &via(), "10.0.0.1")
        .await
        .unwrap();

    assert_eq!(out, raw.trim());
    let call = &exec.calls()[0];
    assert_eq!(call.command[call.command.len() - 2..], ["cluster", "nodes"]);
}

#[tokio::test]
async fn test_fetch_topology_parses_listing() {
    let raw = "aaa 10.0.0.1:6379@16379 myself,master - 0 0 1 connected 0-8191\n\
               bbb 10.0.0.2:6379@16379 master - 0 0 2 connected 8192-16383\n\
               ccc 10.0.0.3:6379@16379 slave aaa 0 0 1 connected";
    let exec = MockExecutor::with_output(raw);
    let topology = orchestrator()
        .fetch_topology(&exec, &via(), "10.0.0.1")
        .await
        .unwrap();

    assert_eq!(topology.members.len(), 3);
    assert!(topology.is_fully_covered());
    assert_eq!(
        topology.find_by_address("10.0.0.3").unwrap().role,
        NodeRole::Replica
    );
}

#[tokio::test]
async fn test_fetch_topology_reports_parse_errors() {
    let exec = MockExecutor::with_output("garbage");
    let err = orchestrator()
        .fetch_topology(&exec, &via(), "10.0.0.1")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Parse(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_cluster_meet() {
    let exec = MockExecutor::new();
    orchestrator()
        .cluster_meet(&exec, &via(), "10.0.0.1", "10.0.0.5", 6379)
        .await
        .unwrap();

    let call = &exec.calls()[0];
    assert_eq!(call.arg_after("-h"), Some("10.0.0.1"));
    assert_eq!(call.arg_after("meet"), Some("10.0.0.5"));
    assert_eq!(call.arg_after("10.0.0.5"), Some("6379"));

    let exec = MockExecutor::failing();
    let err = orchestrator()
        .cluster_meet(&exec, &via(), "10.0.0.1", "10.0.0.5", 6379)
        .await
        .unwrap_err();
    assert!(
        err.to_string()
            .contains("failed to meet node \"10.0.0.1\" with node \"10.0.0.5\"")
    );
}

#[tokio::test]
async fn test_cluster_reset_kinds() {
    for (kind, token) in [(ResetKind::Soft, "soft"), (ResetKind::Hard, "hard")] {
        let exec = MockExecutor::new();
        orchestrator()
            .cluster_reset(&exec, &via(), "10.0.0.4", kind)
            .await
            .unwrap();
        assert_eq!(exec.calls()[0].arg_after("reset"), Some(token));
    }
}

#[tokio::test]
async fn test_cluster_failover() {
    let exec = MockExecutor::new();
    orchestrator()
        .cluster_failover(&exec, &via(), "10.0.0.4")
        .await
        .unwrap();

    let call = &exec.calls()[0];
    assert_eq!(call.arg_after("-h"), Some("10.0.0.4"));
    assert_eq!(call.command.last().map(String::as_str), Some("failover"));
}

#[tokio::test]
async fn test_cluster_replicate_failure_names_master() {
    let exec = MockExecutor::failing();
    let err = orchestrator()
        .cluster_replicate(&exec, &via(), "10.0.0.4", "abc123")
        .await
        .unwrap_err();

    assert_eq!(err.operation(), Some(Operation::ClusterReplicate));
    let text = err.to_string();
    assert!(text.contains("10.0.0.4"));
    assert!(text.contains("abc123"));
}

#[tokio::test]
async fn test_no_operation_retries() {
    let exec = MockExecutor::failing();
    let orch = orchestrator();
    let _ = orch.cluster_failover(&exec, &via(), "10.0.0.4").await;
    let _ = orch.ping(&exec, &via(), "10.0.0.4").await;
    let _ = orch.delete_node(&exec, &via(), "10.0.0.1", "x").await;
    assert_eq!(exec.calls().len(), 3);
}
