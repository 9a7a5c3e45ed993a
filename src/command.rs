//! `valkey-cli` command construction.
//!
//! Every topology operation is one [`ClusterCommand`] variant, and
//! [`ValkeyCli::build`] renders it into the token sequence handed to the
//! executor. Rendering is pure: no I/O and no state beyond the configured
//! binary, port and credentials.

use std::str::FromStr;

use crate::config::ClusterConfig;
use crate::slots::SlotMigrationStep;

/// Input fed to `--cluster create` to accept the proposed slot layout.
pub const CONFIRMATION_INPUT: &str = "yes\n";

/// Moves one contiguous slot range between two masters, slot by slot.
///
/// Positional arguments: cli, port, source address, source ID, destination
/// address, destination ID, first slot, last slot and an optional password.
/// Each slot goes through `SETSLOT IMPORTING` on the destination,
/// `SETSLOT MIGRATING` on the source, `MIGRATE` of its keys in batches, then
/// `SETSLOT NODE` on both ends. Any reply other than `OK` (or `NOKEY` from
/// `MIGRATE`) stops the script with a non-zero exit.
pub const RESHARD_STEP_SCRIPT: &str = r#"set -eu
cli=$1 port=$2 src=$3 src_id=$4 dst=$5 dst_id=$6 first=$7 last=$8 password=${9:-}
node() {
  host=$1; shift
  if [ -n "$password" ]; then
    "$cli" -h "$host" -p "$port" -a "$password" --no-auth-warning "$@"
  else
    "$cli" -h "$host" -p "$port" "$@"
  fi
}
expect_ok() {
  reply=$(node "$@")
  case "$reply" in
    OK|NOKEY) ;;
    *) echo "$*: $reply" >&2; exit 1 ;;
  esac
}
slot=$first
while [ "$slot" -le "$last" ]; do
  expect_ok "$dst" cluster setslot "$slot" importing "$src_id"
  expect_ok "$src" cluster setslot "$slot" migrating "$dst_id"
  while keys=$(node "$src" cluster getkeysinslot "$slot" 100) && [ -n "$keys" ]; do
    if [ -n "$password" ]; then
      expect_ok "$src" migrate "$dst" "$port" "" 0 5000 auth "$password" keys $keys
    else
      expect_ok "$src" migrate "$dst" "$port" "" 0 5000 keys $keys
    fi
  done
  expect_ok "$dst" cluster setslot "$slot" node "$dst_id"
  expect_ok "$src" cluster setslot "$slot" node "$dst_id"
  slot=$((slot + 1))
done
"#;

/// How much cluster state `CLUSTER RESET` discards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResetKind {
    /// Forget other nodes and slots, keep the node ID.
    #[default]
    Soft,
    /// Also generate a new node ID and reset epochs.
    Hard,
}

impl ResetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetKind::Soft => "soft",
            ResetKind::Hard => "hard",
        }
    }
}

impl std::fmt::Display for ResetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "soft" => Ok(ResetKind::Soft),
            "hard" => Ok(ResetKind::Hard),
            other => Err(format!("unknown reset type: {}", other)),
        }
    }
}

/// A topology command addressed to cluster members by IP.
#[derive(Debug, Clone, Copy)]
pub enum ClusterCommand<'a> {
    /// Form a cluster out of `addresses`.
    Create { addresses: &'a [String] },
    /// Join `new_address` through `existing_address` as a master.
    AddMaster {
        new_address: &'a str,
        existing_address: &'a str,
    },
    /// Join `new_address` through `existing_address` as a replica of `master_id`.
    AddReplica {
        new_address: &'a str,
        existing_address: &'a str,
        master_id: &'a str,
    },
    /// Remove `node_id` from the cluster known to `existing_address`.
    DeleteNode {
        existing_address: &'a str,
        node_id: &'a str,
    },
    Ping { address: &'a str },
    ClusterNodes { address: &'a str },
    Meet {
        sender: &'a str,
        receiver: &'a str,
        receiver_port: u16,
    },
    Reset { address: &'a str, kind: ResetKind },
    Failover { address: &'a str },
    Replicate {
        address: &'a str,
        master_id: &'a str,
    },
    /// Move one contiguous slot range.
    Reshard { step: &'a SlotMigrationStep },
}

/// Renders [`ClusterCommand`]s for `valkey-cli`.
#[derive(Debug, Clone)]
pub struct ValkeyCli {
    binary: String,
    port: u16,
    password: Option<String>,
    cluster_replicas: u32,
}

impl ValkeyCli {
    pub fn new(binary: impl Into<String>, port: u16) -> Self {
        Self {
            binary: binary.into(),
            port,
            password: None,
            cluster_replicas: 0,
        }
    }

    pub fn from_config(config: &ClusterConfig) -> Self {
        Self {
            binary: config.cli_binary.clone(),
            port: config.port,
            password: config.password.clone(),
            cluster_replicas: config.cluster_replicas,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_cluster_replicas(mut self, replicas: u32) -> Self {
        self.cluster_replicas = replicas;
        self
    }

    /// Render a command into executor tokens.
    pub fn build(&self, command: &ClusterCommand<'_>) -> Vec<String> {
        match *command {
            ClusterCommand::Create { addresses } => {
                let mut tokens = self.cluster_manager("create");
                tokens.extend(addresses.iter().map(|a| self.endpoint(a)));
                tokens.push("--cluster-replicas".to_string());
                tokens.push(self.cluster_replicas.to_string());
                tokens
            }
            ClusterCommand::AddMaster {
                new_address,
                existing_address,
            } => {
                let mut tokens = self.cluster_manager("add-node");
                tokens.push(self.endpoint(new_address));
                tokens.push(self.endpoint(existing_address));
                tokens
            }
            ClusterCommand::AddReplica {
                new_address,
                existing_address,
                master_id,
            } => {
                let mut tokens = self.cluster_manager("add-node");
                tokens.push(self.endpoint(new_address));
                tokens.push(self.endpoint(existing_address));
                tokens.push("--cluster-replica".to_string());
                tokens.push("--cluster-master-id".to_string());
                tokens.push(master_id.to_string());
                tokens
            }
            ClusterCommand::DeleteNode {
                existing_address,
                node_id,
            } => {
                let mut tokens = self.cluster_manager("del-node");
                tokens.push(self.endpoint(existing_address));
                tokens.push(node_id.to_string());
                tokens
            }
            ClusterCommand::Ping { address } => self.on_node(address, &["ping"]),
            ClusterCommand::ClusterNodes { address } => {
                self.on_node(address, &["cluster", "nodes"])
            }
            ClusterCommand::Meet {
                sender,
                receiver,
                receiver_port,
            } => {
                let port = receiver_port.to_string();
                self.on_node(sender, &["cluster", "meet", receiver, port.as_str()])
            }
            ClusterCommand::Reset { address, kind } => {
                self.on_node(address, &["cluster", "reset", kind.as_str()])
            }
            ClusterCommand::Failover { address } => {
                self.on_node(address, &["cluster", "failover"])
            }
            ClusterCommand::Replicate { address, master_id } => {
                self.on_node(address, &["cluster", "replicate", master_id])
            }
            ClusterCommand::Reshard { step } => {
                let mut tokens = vec![
                    "sh".to_string(),
                    "-c".to_string(),
                    RESHARD_STEP_SCRIPT.to_string(),
                    "reshard-step".to_string(),
                    self.binary.clone(),
                    self.port.to_string(),
                    step.source.address.clone(),
                    step.source.node_id.clone(),
                    step.destination.address.clone(),
                    step.destination.node_id.clone(),
                    step.range.start.to_string(),
                    step.range.end.to_string(),
                ];
                if let Some(password) = &self.password {
                    tokens.push(password.clone());
                }
                tokens
            }
        }
    }

    fn endpoint(&self, address: &str) -> String {
        format!("{}:{}", address, self.port)
    }

    fn auth(&self) -> Vec<String> {
        match &self.password {
            Some(password) => vec![
                "-a".to_string(),
                password.clone(),
                "--no-auth-warning".to_string(),
            ],
            None => Vec::new(),
        }
    }

    /// `valkey-cli [auth] --cluster <subcommand>`
    fn cluster_manager(&self, subcommand: &str) -> Vec<String> {
        let mut tokens = vec![self.binary.clone()];
        tokens.extend(self.auth());
        tokens.push("--cluster".to_string());
        tokens.push(subcommand.to_string());
        tokens
    }

    /// `valkey-cli -c -h <address> -p <port> [auth] <args>`
    fn on_node(&self, address: &str, args: &[&str]) -> Vec<String> {
        let mut tokens = vec![
            self.binary.clone(),
            "-c".to_string(),
            "-h".to_string(),
            address.to_string(),
            "-p".to_string(),
            self.port.to_string(),
        ];
        tokens.extend(self.auth());
        tokens.extend(args.iter().map(|a| a.to_string()));
        tokens
    }
}

impl Default for ValkeyCli {
    fn default() -> Self {
        Self::from_config(&ClusterConfig::default())
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
    use crate::slots::{MigrationEndpoint, SlotRange};

    fn cli() -> ValkeyCli {
        ValkeyCli::new("valkey-cli", 6379)
    }

    #[test]
    fn test_create_lists_every_address() {
        let addresses = vec![
            "10.0.0.1".to_string(),
            "10.0.0.2".to_string(),
            "10.0.0.3".to_string(),
        ];
        let tokens = cli().build(&ClusterCommand::Create {
            addresses: &addresses,
        });
        assert_eq!(
            tokens,
            vec![
                "valkey-cli",
                "--cluster",
                "create",
                "10.0.0.1:6379",
                "10.0.0.2:6379",
                "10.0.0.3:6379",
                "--cluster-replicas",
                "0"
            ]
        );
    }

    #[test]
    fn test_add_master_and_replica_differ() {
        let master = cli().build(&ClusterCommand::AddMaster {
            new_address: "10.0.0.9",
            existing_address: "10.0.0.1",
        });
        assert!(!master.contains(&"--cluster-replica".to_string()));

        let replica = cli().build(&ClusterCommand::AddReplica {
            new_address: "10.0.0.9",
            existing_address: "10.0.0.1",
            master_id: "abc",
        });
        assert_eq!(
            replica[replica.len() - 3..],
            ["--cluster-replica", "--cluster-master-id", "abc"]
        );
    }

    #[test]
    fn test_node_command_with_password() {
        let tokens = cli()
            .with_password("secret")
            .build(&ClusterCommand::Replicate {
                address: "10.0.0.4",
                master_id: "abc",
            });
        assert_eq!(
            tokens,
            vec![
                "valkey-cli",
                "-c",
                "-h",
                "10.0.0.4",
                "-p",
                "6379",
                "-a",
                "secret",
                "--no-auth-warning",
                "cluster",
                "replicate",
                "abc"
            ]
        );
    }

    #[test]
    fn test_meet_and_reset() {
        let meet = cli().build(&ClusterCommand::Meet {
            sender: "10.0.0.1",
            receiver: "10.0.0.2",
            receiver_port: 6380,
        });
        assert_eq!(meet[6..], ["cluster", "meet", "10.0.0.2", "6380"]);

        let reset = cli().build(&ClusterCommand::Reset {
            address: "10.0.0.1",
            kind: ResetKind::Hard,
        });
        assert_eq!(reset[6..], ["cluster", "reset", "hard"]);
    }

    #[test]
    fn test_reshard_step() {
        let step = SlotMigrationStep {
            range: SlotRange::new(200, 219),
            source: MigrationEndpoint {
                address: "10.0.0.1".into(),
                node_id: "src".into(),
            },
            destination: MigrationEndpoint {
                address: "10.0.0.2".into(),
                node_id: "dst".into(),
            },
        };
        let tokens = cli().build(&ClusterCommand::Reshard { step: &step });
        assert_eq!(tokens[..3], ["sh", "-c", RESHARD_STEP_SCRIPT]);
        assert_eq!(
            tokens[4..],
            [
                "valkey-cli",
                "6379",
                "10.0.0.1",
                "src",
                "10.0.0.2",
                "dst",
                "200",
                "219"
            ]
        );

        let with_auth = cli()
            .with_password("secret")
            .build(&ClusterCommand::Reshard { step: &step });
        assert_eq!(with_auth.last().map(String::as_str), Some("secret"));
    }

    #[test]
    fn test_create_with_replicas() {
        let addresses = vec!["10.0.0.1".to_string()];
        let tokens = cli()
            .with_cluster_replicas(1)
            .build(&ClusterCommand::Create {
                addresses: &addresses,
            });
        assert_eq!(tokens[tokens.len() - 2..], ["--cluster-replicas", "1"]);
    }

    #[test]
    fn test_reset_kind_parse() {
        assert_eq!("soft".parse::<ResetKind>().unwrap(), ResetKind::Soft);
        assert_eq!("HARD".parse::<ResetKind>().unwrap(), ResetKind::Hard);
        assert!("medium".parse::<ResetKind>().is_err());
    }
}
