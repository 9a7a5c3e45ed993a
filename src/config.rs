//! Connection and rendering settings shared by every operation.

/// Default Valkey client port.
pub const DEFAULT_PORT: u16 = 6379;

/// Default CLI binary available inside Valkey images.
pub const DEFAULT_CLI: &str = "valkey-cli";

/// Settings for reaching cluster members and rendering commands.
#[derive(Clone, Debug)]
pub struct ClusterConfig {
    /// CLI binary invoked inside the member's container.
    pub cli_binary: String,
    /// Port every member listens on.
    pub port: u16,
    /// Password for AUTH.
    pub password: Option<String>,
    /// Replicas per master requested at cluster creation.
    pub cluster_replicas: u32,
    /// Namespace the member pods live in.
    pub namespace: String,
    /// Container to exec into; the pod's default container when None.
    pub container: Option<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cli_binary: DEFAULT_CLI.to_string(),
            port: DEFAULT_PORT,
            password: None,
            cluster_replicas: 0,
            namespace: "default".to_string(),
            container: None,
        }
    }
}

impl ClusterConfig {
    /// Create a configuration for pods in `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Set the CLI binary.
    pub fn with_cli_binary(mut self, binary: impl Into<String>) -> Self {
        self.cli_binary = binary.into();
        self
    }

    /// Set the member port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set replicas per master for cluster creation.
    pub fn with_cluster_replicas(mut self, replicas: u32) -> Self {
        self.cluster_replicas = replicas;
        self
    }

    /// Set the container to exec into.
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }
}
