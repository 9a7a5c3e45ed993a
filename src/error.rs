//! Error types for topology operations.

use thiserror::Error;

use crate::exec::TransportError;
use crate::topology::ParseError;

/// Topology operation that issued a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateCluster,
    AddNode,
    DeleteNode,
    Ping,
    GetClusterNodes,
    ClusterMeet,
    ClusterReset,
    ClusterFailover,
    ClusterReplicate,
    Reshard,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::CreateCluster => "create-cluster",
            Operation::AddNode => "add-node",
            Operation::DeleteNode => "delete-node",
            Operation::Ping => "ping",
            Operation::GetClusterNodes => "get-cluster-nodes",
            Operation::ClusterMeet => "cluster-meet",
            Operation::ClusterReset => "cluster-reset",
            Operation::ClusterFailover => "cluster-failover",
            Operation::ClusterReplicate => "cluster-replicate",
            Operation::Reshard => "reshard",
        };
        f.write_str(name)
    }
}

/// Error type for topology operations
#[derive(Error, Debug)]
pub enum Error {
    /// A remote command failed. `message` names the addresses and IDs involved.
    #[error("{operation}: {message}: {source}")]
    OperationFailed {
        operation: Operation,
        message: String,
        #[source]
        source: TransportError,
    },

    /// Input rejected before anything was executed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Node listing could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The process was signalled before the operation finished
    #[error("Interrupted: topology may be partially changed, re-read it before retrying")]
    Interrupted,
}

impl Error {
    pub(crate) fn failed(
        operation: Operation,
        message: impl Into<String>,
        source: TransportError,
    ) -> Self {
        Error::OperationFailed {
            operation,
            message: message.into(),
            source,
        }
    }

    /// The operation that failed, if a command was issued.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Error::OperationFailed { operation, .. } => Some(*operation),
            Error::Validation(_) | Error::Parse(_) | Error::Interrupted => None,
        }
    }

    /// Check if a liveness probe failed, as opposed to a topology change.
    pub fn is_liveness_failure(&self) -> bool {
        self.operation() == Some(Operation::Ping)
    }

    /// Check if the caller may retry the same call unchanged
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::OperationFailed { .. } => true,
            Error::Validation(_) | Error::Parse(_) | Error::Interrupted => false,
        }
    }
}

/// Result type alias for topology operations
pub type Result<T> = std::result::Result<T, Error>;
