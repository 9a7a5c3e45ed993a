//! Command execution inside Kubernetes pods.
//!
//! Uses the pod `exec` subresource over a websocket, the same way
//! `kubectl exec` does, so the command runs next to the Valkey process and
//! can reach it on its pod IP without any port forwarding.

use k8s_openapi::api::core::v1::Pod;
use kube::api::AttachParams;
use kube::{Api, Client};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, instrument};

use super::{RemoteExecutor, TransportError};
use crate::topology::ClusterMember;

/// Status reported by the API server when the command exited non-zero.
const EXEC_FAILURE: &str = "Failure";

/// Runs commands in the pod named by [`ClusterMember::name`].
#[derive(Clone)]
pub struct PodExecutor {
    pods: Api<Pod>,
    container: Option<String>,
}

impl PodExecutor {
    /// Create an executor for pods in `namespace`.
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            pods: Api::namespaced(client, namespace),
            container: None,
        }
    }

    /// Run commands in a specific container instead of the pod's default one.
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    fn attach_params(&self, with_stdin: bool) -> AttachParams {
        let params = AttachParams::default()
            .stdin(with_stdin)
            .stdout(true)
            .stderr(true);
        match &self.container {
            Some(container) => params.container(container.clone()),
            None => params,
        }
    }
}

impl RemoteExecutor for PodExecutor {
    #[instrument(skip_all, fields(pod = %target.name))]
    async fn execute(
        &self,
        target: &ClusterMember,
        command: &[String],
        stdin: Option<&str>,
    ) -> Result<String, TransportError> {
        debug!(
            program = command.first().map(String::as_str).unwrap_or_default(),
            args = command.len().saturating_sub(1),
            "Executing command in pod"
        );

        let params = self.attach_params(stdin.is_some());
        let mut process = self
            .pods
            .exec(&target.name, command.to_vec(), &params)
            .await?;

        if let Some(input) = stdin
            && let Some(mut writer) = process.stdin()
        {
            writer.write_all(input.as_bytes()).await?;
            writer.shutdown().await?;
        }

        let status = process.take_status();
        let stdout = read_stream(process.stdout());
        let stderr = read_stream(process.stderr());
        let (stdout, stderr) = tokio::try_join!(stdout, stderr)?;

        if let Some(status) = status
            && let Some(status) = status.await
            && status.status.as_deref() == Some(EXEC_FAILURE)
        {
            let message = status.message.unwrap_or_default();
            return Err(TransportError::CommandFailed(
                format!("{} {}", message, stderr.trim()).trim().to_string(),
            ));
        }

        process
            .join()
            .await
            .map_err(|e| TransportError::Stream(e.to_string()))?;

        debug!(bytes = stdout.len(), "Command completed");
        Ok(stdout)
    }
}

/// Drain an optional exec stream into a string.
async fn read_stream<R>(stream: Option<R>) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut out = String::new();
    if let Some(mut stream) = stream {
        stream.read_to_string(&mut out).await?;
    }
    Ok(out)
}
