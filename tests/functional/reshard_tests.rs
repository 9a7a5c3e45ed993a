//! Reshard sequencing against the recording executor.

use valkey_topology::{ClusterMember, Operation, RESHARD_STEP_SCRIPT, SlotRange};

use crate::mock_executor::{MockExecutor, orchestrator, via};

fn source(slots: Vec<SlotRange>) -> ClusterMember {
    ClusterMember::master("valkey-0", "10.0.0.1", "source-id", slots)
}

fn destination() -> ClusterMember {
    ClusterMember::master("valkey-3", "10.0.0.4", "dest-id", Vec::new())
}

/// Expected arguments of a step moving `first..=last` from source to destination.
fn step_args<'a>(first: &'a str, last: &'a str) -> Vec<&'a str> {
    vec![
        "valkey-cli",
        "6379",
        "10.0.0.1",
        "source-id",
        "10.0.0.4",
        "dest-id",
        first,
        last,
    ]
}

#[tokio::test]
async fn test_reshard_splits_second_range() {
    let exec = MockExecutor::new();
    let src = source(vec![SlotRange::new(0, 99), SlotRange::new(200, 249)]);

    let plan = orchestrator()
        .reshard(&exec, &via(), &src, &destination(), 120)
        .await
        .expect("reshard should succeed");

    assert_eq!(plan.total_slots(), 120);
    assert_eq!(
        plan.migrated_ranges(),
        vec![SlotRange::new(0, 99), SlotRange::new(200, 219)]
    );
    assert_eq!(plan.retained, vec![SlotRange::new(220, 249)]);

    let calls = exec.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].step_args(), step_args("0", "99"));
    assert_eq!(calls[1].step_args(), step_args("200", "219"));
    for call in &calls {
        assert_eq!(call.target, "valkey-0");
        assert_eq!(call.command[..3], ["sh", "-c", RESHARD_STEP_SCRIPT]);
        assert!(call.stdin.is_none());
    }
}

#[tokio::test]
async fn test_reshard_short_supply_is_not_an_error() {
    let exec = MockExecutor::new();
    let src = source(vec![SlotRange::new(0, 49)]);

    let plan = orchestrator()
        .reshard(&exec, &via(), &src, &destination(), 100)
        .await
        .unwrap();

    assert_eq!(plan.total_slots(), 50);
    assert!(plan.is_short());
    assert_eq!(exec.calls().len(), 1);
}

#[tokio::test]
async fn test_reshard_zero_or_negative_does_nothing() {
    for requested in [0, -5] {
        let exec = MockExecutor::new();
        let src = source(vec![SlotRange::new(0, 49)]);

        let plan = orchestrator()
            .reshard(&exec, &via(), &src, &destination(), requested)
            .await
            .unwrap();

        assert!(plan.is_empty());
        assert!(exec.calls().is_empty());
    }
}

#[tokio::test]
async fn test_reshard_stops_at_first_failure() {
    let exec = MockExecutor::failing_on_call(2);
    let src = source(vec![
        SlotRange::new(0, 99),
        SlotRange::new(200, 299),
        SlotRange::new(400, 499),
    ]);

    let err = orchestrator()
        .reshard(&exec, &via(), &src, &destination(), 300)
        .await
        .unwrap_err();

    // third step is never attempted
    assert_eq!(exec.calls().len(), 2);
    assert_eq!(err.operation(), Some(Operation::Reshard));

    let text = err.to_string();
    assert!(text.contains("300 slots"));
    assert!(text.contains("\"10.0.0.1\""));
    assert!(text.contains("\"10.0.0.4\""));
    assert!(text.contains("step 2/3"));
    assert!(text.contains("200-299"));
}

#[tokio::test]
async fn test_reshard_follows_reported_order() {
    let exec = MockExecutor::new();
    let src = source(vec![SlotRange::new(8000, 8099), SlotRange::new(0, 99)]);

    let plan = orchestrator()
        .reshard(&exec, &via(), &src, &destination(), 150)
        .await
        .unwrap();

    assert_eq!(
        plan.migrated_ranges(),
        vec![SlotRange::new(8000, 8099), SlotRange::new(0, 49)]
    );
    assert_eq!(plan.retained, vec![SlotRange::new(50, 99)]);

    // each command moves its planned range, not the lowest slots first
    let calls = exec.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].step_args(), step_args("8000", "8099"));
    assert_eq!(calls[1].step_args(), step_args("0", "49"));
}

#[tokio::test]
async fn test_reshard_between_parsed_members_runs_on_via() {
    let listing = "source-id 10.0.0.1:6379@16379 myself,master - 0 0 1 connected 8000-8099 0-99\n\
                   dest-id 10.0.0.4:6379@16379 master - 0 0 2 connected 100-7999 8100-16383";
    let exec = MockExecutor::with_output(listing);
    let orch = orchestrator();
    let worker = ClusterMember::new("valkey-admin", String::new());

    let topology = orch
        .fetch_topology(&exec, &worker, "10.0.0.1")
        .await
        .unwrap();
    let src = topology.find_by_address("10.0.0.1").unwrap();
    let dst = topology.find_by_address("10.0.0.4").unwrap();
    assert!(src.name.is_empty());

    orch.reshard(&exec, &worker, src, dst, 150).await.unwrap();

    let calls = exec.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|c| c.target == "valkey-admin"));
    assert_eq!(calls[1].step_args(), step_args("8000", "8099"));
    assert_eq!(calls[2].step_args(), step_args("0", "49"));
}
