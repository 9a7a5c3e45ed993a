//! Cluster membership and topology transitions.
//!
//! [`ClusterOrchestrator`] turns one transition into one command, or for
//! [`reshard`](ClusterOrchestrator::reshard) a fixed ordered sequence of
//! commands, and runs them through the executor passed into the call.
//!
//! Nothing is cached between calls. Each operation works only from its
//! arguments, so callers re-read topology with
//! [`get_cluster_nodes`](ClusterOrchestrator::get_cluster_nodes) or
//! [`fetch_topology`](ClusterOrchestrator::fetch_topology) before the next
//! transition. No operation retries; a failed command is returned as
//! [`Error::OperationFailed`](crate::error::Error::OperationFailed) naming
//! the addresses and node IDs involved.
//!
//! `via` is the member whose instance runs the command. It is usually, but
//! not necessarily, the member the command is about.

mod reshard;

use tracing::{debug, info, instrument};

use crate::command::{CONFIRMATION_INPUT, ClusterCommand, ResetKind, ValkeyCli};
use crate::config::ClusterConfig;
use crate::error::{Error, Operation, Result};
use crate::exec::RemoteExecutor;
use crate::topology::{ClusterMember, TopologySnapshot, parse_cluster_nodes};

/// Issues topology commands for a Valkey cluster.
#[derive(Debug, Clone, Default)]
pub struct ClusterOrchestrator {
    cli: ValkeyCli,
}

impl ClusterOrchestrator {
    pub fn new(cli: ValkeyCli) -> Self {
        Self { cli }
    }

    pub fn from_config(config: &ClusterConfig) -> Self {
        Self::new(ValkeyCli::from_config(config))
    }

    async fn run<E: RemoteExecutor>(
        &self,
        exec: &E,
        via: &ClusterMember,
        command: ClusterCommand<'_>,
        stdin: Option<&str>,
    ) -> std::result::Result<String, crate::exec::TransportError> {
        let tokens = self.cli.build(&command);
        exec.execute(via, &tokens, stdin).await
    }

    /// Form a cluster from `addresses`.
    ///
    /// The store assigns slot ranges itself. The confirmation prompt is
    /// answered through stdin so the call never waits for input.
    #[instrument(skip(self, exec, via), fields(via = %via.name, nodes = addresses.len()))]
    pub async fn create_cluster<E: RemoteExecutor>(
        &self,
        exec: &E,
        via: &ClusterMember,
        addresses: &[String],
    ) -> Result<()> {
        if addresses.is_empty() {
            return Err(Error::Validation(
                "No node addresses provided".to_string(),
            ));
        }

        info!(?addresses, "Creating cluster");
        self.run(
            exec,
            via,
            ClusterCommand::Create { addresses },
            Some(CONFIRMATION_INPUT),
        )
        .await
        .map_err(|e| {
            Error::failed(
                Operation::CreateCluster,
                format!("failed to create cluster using {:?}", addresses),
                e,
            )
        })?;

        info!("Cluster created");
        Ok(())
    }

    /// Join `new_address` through `existing_address`.
    ///
    /// With no master ID (None or empty) the node joins as a master,
    /// otherwise as a replica of that master.
    #[instrument(skip(self, exec, via), fields(via = %via.name))]
    pub async fn add_node<E: RemoteExecutor>(
        &self,
        exec: &E,
        via: &ClusterMember,
        new_address: &str,
        existing_address: &str,
        master_id: Option<&str>,
    ) -> Result<()> {
        match master_id.filter(|id| !id.is_empty()) {
            None => {
                debug!("Adding node as master");
                self.run(
                    exec,
                    via,
                    ClusterCommand::AddMaster {
                        new_address,
                        existing_address,
                    },
                    None,
                )
                .await
                .map_err(|e| {
                    Error::failed(
                        Operation::AddNode,
                        format!("failed to add {:?} as a master", new_address),
                        e,
                    )
                })?;
            }
            Some(master_id) => {
                debug!("Adding node as replica");
                self.run(
                    exec,
                    via,
                    ClusterCommand::AddReplica {
                        new_address,
                        existing_address,
                        master_id,
                    },
                    None,
                )
                .await
                .map_err(|e| {
                    Error::failed(
                        Operation::AddNode,
                        format!(
                            "failed to add {:?} as a replica of master with id {:?}",
                            new_address, master_id
                        ),
                        e,
                    )
                })?;
            }
        }
        Ok(())
    }

    /// Remove `node_id` from the cluster.
    ///
    /// The node must not own any slots; that is not checked here.
    #[instrument(skip(self, exec, via), fields(via = %via.name))]
    pub async fn delete_node<E: RemoteExecutor>(
        &self,
        exec: &E,
        via: &ClusterMember,
        existing_address: &str,
        node_id: &str,
    ) -> Result<()> {
        self.run(
            exec,
            via,
            ClusterCommand::DeleteNode {
                existing_address,
                node_id,
            },
            None,
        )
        .await
        .map_err(|e| {
            Error::failed(
                Operation::DeleteNode,
                format!("failed to delete node with ID {:?}", node_id),
                e,
            )
        })?;
        Ok(())
    }

    /// Liveness probe. Returns the trimmed reply, normally `PONG`.
    #[instrument(skip(self, exec, via), fields(via = %via.name))]
    pub async fn ping<E: RemoteExecutor>(
        &self,
        exec: &E,
        via: &ClusterMember,
        address: &str,
    ) -> Result<String> {
        let pong = self
            .run(exec, via, ClusterCommand::Ping { address }, None)
            .await
            .map_err(|e| {
                Error::failed(Operation::Ping, format!("failed to ping {:?}", address), e)
            })?;
        Ok(pong.trim().to_string())
    }

    /// Raw `CLUSTER NODES` output as seen by `address`, trimmed.
    #[instrument(skip(self, exec, via), fields(via = %via.name))]
    pub async fn get_cluster_nodes<E: RemoteExecutor>(
        &self,
        exec: &E,
        via: &ClusterMember,
        address: &str,
    ) -> Result<String> {
        let out = self
            .run(exec, via, ClusterCommand::ClusterNodes { address }, None)
            .await
            .map_err(|e| {
                Error::failed(
                    Operation::GetClusterNodes,
                    format!("failed to get cluster nodes from {:?}", address),
                    e,
                )
            })?;
        Ok(out.trim().to_string())
    }

    /// Read and parse the topology as seen by `address`.
    pub async fn fetch_topology<E: RemoteExecutor>(
        &self,
        exec: &E,
        via: &ClusterMember,
        address: &str,
    ) -> Result<TopologySnapshot> {
        let raw = self.get_cluster_nodes(exec, via, address).await?;
        let snapshot = parse_cluster_nodes(&raw)?;
        debug!(members = snapshot.members.len(), "Parsed cluster topology");
        Ok(snapshot)
    }

    /// Introduce `receiver` to `sender` through the cluster bus.
    ///
    /// Needed before nodes from two separate clusters can be joined.
    #[instrument(skip(self, exec, via), fields(via = %via.name))]
    pub async fn cluster_meet<E: RemoteExecutor>(
        &self,
        exec: &E,
        via: &ClusterMember,
        sender: &str,
        receiver: &str,
        receiver_port: u16,
    ) -> Result<()> {
        self.run(
            exec,
            via,
            ClusterCommand::Meet {
                sender,
                receiver,
                receiver_port,
            },
            None,
        )
        .await
        .map_err(|e| {
            Error::failed(
                Operation::ClusterMeet,
                format!("failed to meet node {:?} with node {:?}", sender, receiver),
                e,
            )
        })?;
        Ok(())
    }

    /// Reset the cluster state of `address` so the member can be reused.
    #[instrument(skip(self, exec, via), fields(via = %via.name))]
    pub async fn cluster_reset<E: RemoteExecutor>(
        &self,
        exec: &E,
        via: &ClusterMember,
        address: &str,
        kind: ResetKind,
    ) -> Result<()> {
        self.run(exec, via, ClusterCommand::Reset { address, kind }, None)
            .await
            .map_err(|e| {
                Error::failed(
                    Operation::ClusterReset,
                    format!("failed to reset node {:?}", address),
                    e,
                )
            })?;
        Ok(())
    }

    /// Promote the replica at `address` to master.
    #[instrument(skip(self, exec, via), fields(via = %via.name))]
    pub async fn cluster_failover<E: RemoteExecutor>(
        &self,
        exec: &E,
        via: &ClusterMember,
        address: &str,
    ) -> Result<()> {
        self.run(exec, via, ClusterCommand::Failover { address }, None)
            .await
            .map_err(|e| {
                Error::failed(
                    Operation::ClusterFailover,
                    format!("failed to failover node {:?}", address),
                    e,
                )
            })?;
        Ok(())
    }

    /// Make `address` a replica of `master_id`.
    #[instrument(skip(self, exec, via), fields(via = %via.name))]
    pub async fn cluster_replicate<E: RemoteExecutor>(
        &self,
        exec: &E,
        via: &ClusterMember,
        address: &str,
        master_id: &str,
    ) -> Result<()> {
        self.run(
            exec,
            via,
            ClusterCommand::Replicate { address, master_id },
            None,
        )
        .await
        .map_err(|e| {
            Error::failed(
                Operation::ClusterReplicate,
                format!(
                    "failed to replicate node {:?} of node with ID {:?}",
                    address, master_id
                ),
                e,
            )
        })?;
        Ok(())
    }
}
