//! valkey-topology library crate
//!
//! Membership and slot-ownership orchestration for Valkey clusters: forming a
//! cluster, adding and removing nodes, replication and failover, and moving
//! hash slot ranges between masters.
//!
//! ## Module Structure
//!
//! - [`orchestrator`]: One async operation per topology transition
//! - [`slots`]: Slot ranges and the reshard planner
//! - [`topology`]: Members, snapshots and `CLUSTER NODES` parsing
//! - [`command`]: `valkey-cli` command rendering
//! - [`exec`]: The executor boundary and the Kubernetes pod executor
//!
//! ## Example
//!
//! ```rust,ignore
//! use valkey_topology::{ClusterConfig, ClusterOrchestrator, PodExecutor};
//!
//! let config = ClusterConfig::new("cache");
//! let exec = PodExecutor::new(client, &config.namespace);
//! let orchestrator = ClusterOrchestrator::from_config(&config);
//!
//! let topology = orchestrator.fetch_topology(&exec, &via, &via.address).await?;
//! let plan = orchestrator.reshard(&exec, &via, source, destination, 1000).await?;
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod exec;
pub mod orchestrator;
pub mod slots;
pub mod topology;

pub use command::{ClusterCommand, RESHARD_STEP_SCRIPT, ResetKind, ValkeyCli};
pub use config::ClusterConfig;
pub use error::{Error, Operation, Result};
pub use exec::{PodExecutor, RemoteExecutor, TransportError};
pub use orchestrator::ClusterOrchestrator;
pub use slots::{ReshardPlan, SlotMigrationStep, SlotRange, TOTAL_SLOTS, plan_reshard};
pub use topology::{ClusterMember, NodeRole, TopologySnapshot, parse_cluster_nodes};
