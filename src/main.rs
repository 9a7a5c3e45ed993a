//! valkey-topology - command line front end for cluster topology operations.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Creates the Kubernetes client and pod executor
//! - Runs one topology operation, aborting on SIGTERM or SIGINT

use clap::{Args, Parser, Subcommand};
use kube::Client;
use tokio::signal;
use tracing::{info, warn};

use valkey_topology::config::{DEFAULT_CLI, DEFAULT_PORT};
use valkey_topology::{
    ClusterConfig, ClusterMember, ClusterOrchestrator, Error, PodExecutor, ResetKind,
};

#[derive(Parser, Debug)]
#[command(name = "valkey-topology", version, about = "Valkey cluster topology operations")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Namespace of the Valkey pods
    #[arg(long, global = true, env = "VALKEY_NAMESPACE", default_value = "default")]
    namespace: String,

    /// Container to exec into (pod default when unset)
    #[arg(long, global = true, env = "VALKEY_CONTAINER")]
    container: Option<String>,

    /// Port every member listens on
    #[arg(long, global = true, env = "VALKEY_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// CLI binary inside the container
    #[arg(long, global = true, env = "VALKEY_CLI", default_value = DEFAULT_CLI)]
    cli: String,

    /// Password for AUTH
    #[arg(long, global = true, env = "VALKEY_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Replicas per master when creating a cluster
    #[arg(long, global = true, env = "VALKEY_CLUSTER_REPLICAS", default_value_t = 0)]
    cluster_replicas: u32,
}

impl GlobalArgs {
    fn to_config(&self) -> ClusterConfig {
        let mut config = ClusterConfig::new(&self.namespace)
            .with_port(self.port)
            .with_cli_binary(&self.cli)
            .with_cluster_replicas(self.cluster_replicas);
        if let Some(container) = &self.container {
            config = config.with_container(container);
        }
        if let Some(password) = &self.password {
            config = config.with_password(password);
        }
        config
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Form a cluster from the given member addresses
    Create {
        #[arg(long)]
        via: String,
        #[arg(required = true)]
        addresses: Vec<String>,
    },
    /// Add a node as master, or as replica when --master-id is given
    AddNode {
        #[arg(long)]
        via: String,
        #[arg(long = "new")]
        new_address: String,
        #[arg(long = "existing")]
        existing_address: String,
        #[arg(long)]
        master_id: Option<String>,
    },
    /// Remove a slot-less node from the cluster
    DeleteNode {
        #[arg(long)]
        via: String,
        #[arg(long = "existing")]
        existing_address: String,
        #[arg(long)]
        node_id: String,
    },
    /// Liveness probe
    Ping {
        #[arg(long)]
        via: String,
        #[arg(long)]
        address: String,
    },
    /// Print the cluster node listing
    Nodes {
        #[arg(long)]
        via: String,
        #[arg(long)]
        address: String,
        /// Print the parsed topology as JSON
        #[arg(long)]
        json: bool,
    },
    /// Introduce two nodes to each other
    Meet {
        #[arg(long)]
        via: String,
        #[arg(long)]
        sender: String,
        #[arg(long)]
        receiver: String,
        /// Defaults to --port
        #[arg(long)]
        receiver_port: Option<u16>,
    },
    /// Reset a node's cluster state
    Reset {
        #[arg(long)]
        via: String,
        #[arg(long)]
        address: String,
        #[arg(long, default_value = "soft")]
        kind: ResetKind,
    },
    /// Promote a replica to master
    Failover {
        #[arg(long)]
        via: String,
        #[arg(long)]
        address: String,
    },
    /// Make a node a replica of a master
    Replicate {
        #[arg(long)]
        via: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        master_id: String,
    },
    /// Move slots from one master to another
    Reshard {
        #[arg(long)]
        via: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, allow_negative_numbers = true)]
        slots: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("valkey_topology=info".parse()?)
                .add_directive("kube=warn".parse()?),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.global.to_config();

    let client = Client::try_default().await?;
    let mut exec = PodExecutor::new(client, &config.namespace);
    if let Some(container) = &config.container {
        exec = exec.with_container(container);
    }
    let orchestrator = ClusterOrchestrator::from_config(&config);

    until_shutdown(
        run(&orchestrator, &exec, &config, cli.command),
        shutdown_signal(),
    )
    .await
}

/// Drive `work` to completion unless `shutdown` resolves first.
///
/// An interrupted operation is an error so the exit status tells callers the
/// topology may be half changed.
async fn until_shutdown<W, S>(work: W, shutdown: S) -> Result<(), Box<dyn std::error::Error>>
where
    W: Future<Output = Result<(), Box<dyn std::error::Error>>>,
    S: Future<Output = ()>,
{
    tokio::select! {
        result = work => result,
        _ = shutdown => {
            warn!("Interrupted; a reshard in progress may have left slots partially migrated");
            Err(Error::Interrupted.into())
        }
    }
}

async fn run(
    orchestrator: &ClusterOrchestrator,
    exec: &PodExecutor,
    config: &ClusterConfig,
    command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Create { via, addresses } => {
            orchestrator
                .create_cluster(exec, &pod(via), &addresses)
                .await?;
        }
        Command::AddNode {
            via,
            new_address,
            existing_address,
            master_id,
        } => {
            orchestrator
                .add_node(
                    exec,
                    &pod(via),
                    &new_address,
                    &existing_address,
                    master_id.as_deref(),
                )
                .await?;
        }
        Command::DeleteNode {
            via,
            existing_address,
            node_id,
        } => {
            orchestrator
                .delete_node(exec, &pod(via), &existing_address, &node_id)
                .await?;
        }
        Command::Ping { via, address } => {
            let pong = orchestrator.ping(exec, &pod(via), &address).await?;
            println!("{}", pong);
        }
        Command::Nodes { via, address, json } => {
            let via = pod(via);
            if json {
                let topology = orchestrator.fetch_topology(exec, &via, &address).await?;
                println!("{}", serde_json::to_string_pretty(&topology)?);
            } else {
                let raw = orchestrator.get_cluster_nodes(exec, &via, &address).await?;
                println!("{}", raw);
            }
        }
        Command::Meet {
            via,
            sender,
            receiver,
            receiver_port,
        } => {
            let port = receiver_port.unwrap_or(config.port);
            orchestrator
                .cluster_meet(exec, &pod(via), &sender, &receiver, port)
                .await?;
        }
        Command::Reset { via, address, kind } => {
            orchestrator
                .cluster_reset(exec, &pod(via), &address, kind)
                .await?;
        }
        Command::Failover { via, address } => {
            orchestrator
                .cluster_failover(exec, &pod(via), &address)
                .await?;
        }
        Command::Replicate {
            via,
            address,
            master_id,
        } => {
            orchestrator
                .cluster_replicate(exec, &pod(via), &address, &master_id)
                .await?;
        }
        Command::Reshard {
            via,
            from,
            to,
            slots,
        } => {
            let via = pod(via);
            // steps run on `via`, parsed members need no pod name
            let topology = orchestrator.fetch_topology(exec, &via, &from).await?;
            let source = topology
                .find_by_address(&from)
                .ok_or_else(|| Error::Validation(format!("source {:?} not in topology", from)))?;
            let destination = topology
                .find_by_address(&to)
                .ok_or_else(|| Error::Validation(format!("destination {:?} not in topology", to)))?;

            let plan = orchestrator
                .reshard(exec, &via, source, destination, slots)
                .await?;
            info!(slots_moved = plan.total_slots(), "Done");
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
    }
    Ok(())
}

/// The pod that runs the command. Only its name is used by the executor.
fn pod(name: String) -> ClusterMember {
    ClusterMember::new(name, String::new())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Note: Signal handler setup failures are fatal. Using expect() here is intentional.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
