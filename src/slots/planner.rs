//! Reshard planning - computes which slot ranges move, no I/O.
//!
//! Slots move between nodes in whole contiguous ranges. The planner walks the
//! source's ranges front to back in the order they were reported and consumes
//! them until the requested count is met, splitting at most one range. A plan
//! therefore has at most as many steps as the source has ranges and never
//! moves more than was asked for.

use serde::Serialize;

use super::range::SlotRange;
use crate::topology::ClusterMember;

/// One side of a slot migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationEndpoint {
    /// IP or host of the member.
    pub address: String,
    /// Cluster node ID of the member.
    pub node_id: String,
}

impl From<&ClusterMember> for MigrationEndpoint {
    fn from(member: &ClusterMember) -> Self {
        Self {
            address: member.address.clone(),
            node_id: member.node_id.clone(),
        }
    }
}

/// Move `range` from `source` to `destination`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotMigrationStep {
    /// The slots to move, contained in the source's ranges at plan time.
    pub range: SlotRange,
    pub source: MigrationEndpoint,
    pub destination: MigrationEndpoint,
}

impl SlotMigrationStep {
    /// Number of slots this step moves.
    pub fn slot_count(&self) -> u32 {
        self.range.count()
    }
}

/// Ordered reshard plan between two members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReshardPlan {
    /// Number of slots the caller asked for.
    pub requested: i64,
    /// Steps to execute, in order.
    pub steps: Vec<SlotMigrationStep>,
    /// Source ranges that stay with the source, in reported order.
    pub retained: Vec<SlotRange>,
}

impl ReshardPlan {
    /// Check if the plan moves nothing.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Total number of slots the plan moves.
    pub fn total_slots(&self) -> u32 {
        self.steps.iter().map(SlotMigrationStep::slot_count).sum()
    }

    /// True when the source owned fewer slots than requested.
    pub fn is_short(&self) -> bool {
        i64::from(self.total_slots()) < self.requested
    }

    /// Ranges moved by the plan, in execution order.
    pub fn migrated_ranges(&self) -> Vec<SlotRange> {
        self.steps.iter().map(|s| s.range).collect()
    }
}

/// Plan moving `requested` slots from `source` to `destination`.
///
/// Pure computation. Requests of zero or less produce an empty plan; requests
/// larger than the source's supply move everything the source owns.
pub fn plan_reshard(
    source: &ClusterMember,
    destination: &ClusterMember,
    requested: i64,
) -> ReshardPlan {
    let from = MigrationEndpoint::from(source);
    let to = MigrationEndpoint::from(destination);

    let mut need = requested;
    let mut steps = Vec::new();
    let mut retained = Vec::new();

    for range in &source.slots {
        if need <= 0 {
            retained.push(*range);
            continue;
        }

        let available = i64::from(range.count());
        let moved = if available <= need {
            *range
        } else {
            // need < available <= TOTAL_SLOTS, so it fits in u32
            let (head, tail) = range.split_front(need as u32);
            retained.extend(tail);
            head
        };

        need -= i64::from(moved.count());
        steps.push(SlotMigrationStep {
            range: moved,
            source: from.clone(),
            destination: to.clone(),
        });
    }

    ReshardPlan {
        requested,
        steps,
        retained,
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::get_unwrap
)]
mod tests {
    use super::*;

    fn source(slots: Vec<SlotRange>) -> ClusterMember {
        ClusterMember::master("valkey-0", "10.0.0.1", "src-id", slots)
    }

    fn destination() -> ClusterMember {
        ClusterMember::master("valkey-1", "10.0.0.2", "dst-id", Vec::new())
    }

    #[test]
    fn test_plan_splits_second_range() {
        let src = source(vec![SlotRange::new(0, 99), SlotRange::new(200, 249)]);
        let plan = plan_reshard(&src, &destination(), 120);

        assert_eq!(
            plan.migrated_ranges(),
            vec![SlotRange::new(0, 99), SlotRange::new(200, 219)]
        );
        assert_eq!(plan.retained, vec![SlotRange::new(220, 249)]);
        assert_eq!(plan.total_slots(), 120);
        assert!(!plan.is_short());
    }

    #[test]
    fn test_plan_short_supply_moves_everything() {
        let src = source(vec![SlotRange::new(0, 49)]);
        let plan = plan_reshard(&src, &destination(), 100);

        assert_eq!(plan.migrated_ranges(), vec![SlotRange::new(0, 49)]);
        assert!(plan.retained.is_empty());
        assert_eq!(plan.total_slots(), 50);
        assert!(plan.is_short());
    }

    #[test]
    fn test_plan_zero_and_negative_requests() {
        let src = source(vec![SlotRange::new(0, 49)]);
        for requested in [0, -1, -100] {
            let plan = plan_reshard(&src, &destination(), requested);
            assert!(plan.is_empty());
            assert_eq!(plan.retained, vec![SlotRange::new(0, 49)]);
            assert!(!plan.is_short());
        }
    }

    #[test]
    fn test_plan_exact_range_boundary() {
        let src = source(vec![SlotRange::new(0, 99), SlotRange::new(200, 249)]);
        let plan = plan_reshard(&src, &destination(), 100);

        assert_eq!(plan.migrated_ranges(), vec![SlotRange::new(0, 99)]);
        assert_eq!(plan.retained, vec![SlotRange::new(200, 249)]);
    }

    #[test]
    fn test_plan_keeps_reported_order() {
        let src = source(vec![SlotRange::new(500, 599), SlotRange::new(0, 99)]);
        let plan = plan_reshard(&src, &destination(), 150);

        assert_eq!(
            plan.migrated_ranges(),
            vec![SlotRange::new(500, 599), SlotRange::new(0, 49)]
        );
        assert_eq!(plan.retained, vec![SlotRange::new(50, 99)]);
    }

    #[test]
    fn test_plan_steps_carry_endpoints() {
        let src = source(vec![SlotRange::single(7)]);
        let plan = plan_reshard(&src, &destination(), 1);

        let step = &plan.steps[0];
        assert_eq!(step.source.address, "10.0.0.1");
        assert_eq!(step.source.node_id, "src-id");
        assert_eq!(step.destination.address, "10.0.0.2");
        assert_eq!(step.destination.node_id, "dst-id");
        assert_eq!(step.slot_count(), 1);
    }

    #[test]
    fn test_plan_empty_source() {
        let plan = plan_reshard(&source(Vec::new()), &destination(), 10);
        assert!(plan.is_empty());
        assert!(plan.is_short());
    }
}
