//! Topology model types.
//!
//! A [`TopologySnapshot`] is one read of the cluster, built by the caller
//! before each orchestration call and thrown away afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::slots::range::{SlotRange, TOTAL_SLOTS, total_slots};

/// Role of a cluster member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Not part of a cluster yet, or flags carried no role.
    #[default]
    Unassigned,
    /// Owns hash slots and serves writes.
    Master,
    /// Mirrors a master.
    Replica,
}

impl std::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeRole::Unassigned => write!(f, "unassigned"),
            NodeRole::Master => write!(f, "master"),
            NodeRole::Replica => write!(f, "replica"),
        }
    }
}

/// One process instance participating in the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMember {
    /// Instance (pod) name the executor uses to reach this member.
    #[serde(default)]
    pub name: String,
    /// IP or host the member listens on.
    pub address: String,
    /// Cluster node ID, empty until the member has joined.
    #[serde(default)]
    pub node_id: String,
    /// Current role.
    #[serde(default)]
    pub role: NodeRole,
    /// Master node ID if this is a replica.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_id: Option<String>,
    /// Owned slot ranges in reported order.
    #[serde(default)]
    pub slots: Vec<SlotRange>,
    /// Set on the member that produced the node listing.
    #[serde(default)]
    pub myself: bool,
    /// Member is flagged `fail` or `pfail`.
    #[serde(default)]
    pub failing: bool,
}

impl ClusterMember {
    /// A fresh member that has not joined any cluster yet.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            ..Default::default()
        }
    }

    /// A master owning `slots`.
    pub fn master(
        name: impl Into<String>,
        address: impl Into<String>,
        node_id: impl Into<String>,
        slots: Vec<SlotRange>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            node_id: node_id.into(),
            role: NodeRole::Master,
            slots,
            ..Default::default()
        }
    }

    /// A replica of `master_id`.
    pub fn replica(
        name: impl Into<String>,
        address: impl Into<String>,
        node_id: impl Into<String>,
        master_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            node_id: node_id.into(),
            role: NodeRole::Replica,
            master_id: Some(master_id.into()),
            ..Default::default()
        }
    }

    pub fn is_master(&self) -> bool {
        self.role == NodeRole::Master
    }

    pub fn is_replica(&self) -> bool {
        self.role == NodeRole::Replica
    }

    /// Whether the member has been assigned a node ID.
    pub fn has_joined(&self) -> bool {
        !self.node_id.is_empty()
    }

    /// Total number of slots owned by this member.
    pub fn slot_count(&self) -> u32 {
        total_slots(&self.slots)
    }
}

/// Slot coverage of the masters in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotCoverage {
    /// Slots owned by at least one master.
    pub assigned: u32,
    /// Ranges no master owns.
    pub gaps: Vec<SlotRange>,
    /// Ranges owned by more than one master.
    pub overlaps: Vec<SlotRange>,
}

impl SlotCoverage {
    /// True when every slot is owned by exactly one master.
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty() && self.overlaps.is_empty()
    }
}

/// All members of one topology read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub members: Vec<ClusterMember>,
}

impl TopologySnapshot {
    pub fn new(members: Vec<ClusterMember>) -> Self {
        Self { members }
    }

    /// Get all master members.
    pub fn masters(&self) -> Vec<&ClusterMember> {
        self.members.iter().filter(|m| m.is_master()).collect()
    }

    /// Get all replica members.
    pub fn replicas(&self) -> Vec<&ClusterMember> {
        self.members.iter().filter(|m| m.is_replica()).collect()
    }

    /// Get replicas of a specific master.
    pub fn replicas_of(&self, master_id: &str) -> Vec<&ClusterMember> {
        self.members
            .iter()
            .filter(|m| m.master_id.as_deref() == Some(master_id))
            .collect()
    }

    pub fn find_by_address(&self, address: &str) -> Option<&ClusterMember> {
        self.members.iter().find(|m| m.address == address)
    }

    pub fn find_by_id(&self, node_id: &str) -> Option<&ClusterMember> {
        self.members.iter().find(|m| m.node_id == node_id)
    }

    /// Get the member that produced the listing.
    pub fn myself(&self) -> Option<&ClusterMember> {
        self.members.iter().find(|m| m.myself)
    }

    /// Attach instance names to members by address.
    ///
    /// Members parsed from `CLUSTER NODES` only know their IP; discovery
    /// supplies the pod name for each address. Unknown addresses keep their
    /// current name.
    pub fn bind_instance_names(&mut self, names_by_address: &HashMap<String, String>) {
        for member in &mut self.members {
            if let Some(name) = names_by_address.get(&member.address) {
                member.name.clone_from(name);
            }
        }
    }

    /// Total slots owned by masters, counting overlaps twice.
    pub fn total_assigned_slots(&self) -> u32 {
        self.masters().iter().map(|m| m.slot_count()).sum()
    }

    /// Compute gaps and overlaps in master slot ownership.
    pub fn slot_coverage(&self) -> SlotCoverage {
        let mut ranges: Vec<SlotRange> = self
            .masters()
            .iter()
            .flat_map(|m| m.slots.iter().copied())
            .collect();
        ranges.sort_by_key(|r| (r.start, r.end));

        let mut coverage = SlotCoverage::default();
        // First slot not yet covered by the sweep.
        let mut next: u32 = 0;

        for range in &ranges {
            let start = u32::from(range.start);
            let end = u32::from(range.end);

            if start > next {
                coverage
                    .gaps
                    .push(SlotRange::new(next as u16, range.start - 1));
            }
            if start < next {
                let overlap_end = end.min(next - 1) as u16;
                coverage
                    .overlaps
                    .push(SlotRange::new(range.start, overlap_end));
            }
            if end + 1 > next {
                coverage.assigned += end + 1 - next.max(start);
                next = end + 1;
            }
        }

        if next < u32::from(TOTAL_SLOTS) {
            coverage
                .gaps
                .push(SlotRange::new(next as u16, TOTAL_SLOTS - 1));
        }

        coverage
    }

    /// True when every slot is owned by exactly one master.
    pub fn is_fully_covered(&self) -> bool {
        self.slot_coverage().is_complete()
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

    fn three_masters() -> TopologySnapshot {
        TopologySnapshot::new(vec![
            ClusterMember::master("valkey-0", "10.0.0.1", "a", vec![SlotRange::new(0, 5460)]),
            ClusterMember::master(
                "valkey-1",
                "10.0.0.2",
                "b",
                vec![SlotRange::new(5461, 10922)],
            ),
            ClusterMember::master(
                "valkey-2",
                "10.0.0.3",
                "c",
                vec![SlotRange::new(10923, 16383)],
            ),
            ClusterMember::replica("valkey-3", "10.0.0.4", "d", "a"),
        ])
    }

    #[test]
    fn test_new_member_is_unassigned() {
        let member = ClusterMember::new("valkey-5", "10.0.0.9");
        assert_eq!(member.role, NodeRole::Unassigned);
        assert!(!member.has_joined());
        assert_eq!(member.slot_count(), 0);
    }

    #[test]
    fn test_snapshot_queries() {
        let snapshot = three_masters();
        assert_eq!(snapshot.masters().len(), 3);
        assert_eq!(snapshot.replicas().len(), 1);
        assert_eq!(snapshot.replicas_of("a").len(), 1);
        assert!(snapshot.replicas_of("b").is_empty());
        assert_eq!(snapshot.find_by_address("10.0.0.2").unwrap().node_id, "b");
        assert_eq!(snapshot.find_by_id("c").unwrap().address, "10.0.0.3");
        assert_eq!(snapshot.total_assigned_slots(), 16384);
    }

    #[test]
    fn test_full_coverage() {
        let coverage = three_masters().slot_coverage();
        assert!(coverage.is_complete());
        assert_eq!(coverage.assigned, 16384);
    }

    #[test]
    fn test_coverage_reports_gaps() {
        let snapshot = TopologySnapshot::new(vec![
            ClusterMember::master("valkey-0", "10.0.0.1", "a", vec![SlotRange::new(0, 99)]),
            ClusterMember::master(
                "valkey-1",
                "10.0.0.2",
                "b",
                vec![SlotRange::new(200, 16000)],
            ),
        ]);
        let coverage = snapshot.slot_coverage();
        assert_eq!(
            coverage.gaps,
            vec![SlotRange::new(100, 199), SlotRange::new(16001, 16383)]
        );
        assert!(coverage.overlaps.is_empty());
        assert!(!snapshot.is_fully_covered());
    }

    #[test]
    fn test_coverage_reports_overlaps() {
        let snapshot = TopologySnapshot::new(vec![
            ClusterMember::master("valkey-0", "10.0.0.1", "a", vec![SlotRange::new(0, 8200)]),
            ClusterMember::master(
                "valkey-1",
                "10.0.0.2",
                "b",
                vec![SlotRange::new(8000, 16383)],
            ),
        ]);
        let coverage = snapshot.slot_coverage();
        assert!(coverage.gaps.is_empty());
        assert_eq!(coverage.overlaps, vec![SlotRange::new(8000, 8200)]);
        assert_eq!(coverage.assigned, 16384);
    }

    #[test]
    fn test_replica_slots_are_ignored_for_coverage() {
        let mut snapshot = three_masters();
        snapshot.members[3].slots = vec![SlotRange::new(0, 10)];
        assert!(snapshot.is_fully_covered());
    }

    #[test]
    fn test_bind_instance_names() {
        let mut snapshot = three_masters();
        for member in &mut snapshot.members {
            member.name.clear();
        }
        let names = HashMap::from([("10.0.0.2".to_string(), "valkey-1".to_string())]);
        snapshot.bind_instance_names(&names);

        assert_eq!(snapshot.find_by_address("10.0.0.2").unwrap().name, "valkey-1");
        assert!(snapshot.find_by_address("10.0.0.1").unwrap().name.is_empty());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(NodeRole::Master.to_string(), "master");
        assert_eq!(NodeRole::Replica.to_string(), "replica");
        assert_eq!(NodeRole::Unassigned.to_string(), "unassigned");
    }
}
