//! In-memory cluster topology.
//!
//! - [`types`]: members, roles and snapshots
//! - [`parsing`]: `CLUSTER NODES` text to [`TopologySnapshot`]

pub mod parsing;
pub mod types;

pub use parsing::{ParseError, parse_cluster_nodes, parse_slot_range};
pub use types::{ClusterMember, NodeRole, SlotCoverage, TopologySnapshot};
