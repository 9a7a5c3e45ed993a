//! Remote command execution.
//!
//! The orchestrator never talks to a cluster member directly. It hands a
//! token sequence to a [`RemoteExecutor`] together with the member that should
//! run it, and gets back the command's standard output or a
//! [`TransportError`].
//!
//! - [`pod`]: [`PodExecutor`], which runs commands inside the member's
//!   Kubernetes pod through the exec subresource

pub mod pod;

use std::future::Future;

use thiserror::Error;

use crate::topology::ClusterMember;

pub use pod::PodExecutor;

/// Failure to run a command on a cluster member.
///
/// The orchestrator does not distinguish between the variants: any of them
/// fails the operation.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Exec stream error: {0}")]
    Stream(String),
}

/// Runs a command on a cluster member.
pub trait RemoteExecutor: Send + Sync {
    /// Run `command` on `target`, feeding `stdin` when given.
    ///
    /// Returns the command's standard output.
    fn execute(
        &self,
        target: &ClusterMember,
        command: &[String],
        stdin: Option<&str>,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;
}

