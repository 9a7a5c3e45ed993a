//! Parsing of `CLUSTER NODES` output into a [`TopologySnapshot`].
//!
//! Line format:
//!
//! ```text
//! <id> <ip:port@cport[,hostname]> <flags> <master|-> <ping-sent> <pong-recv> <config-epoch> <link-state> <slot> <slot> ...
//! ```
//!
//! Slot entries are either a single slot (`5461`) or a range (`0-5460`).
//! Entries in brackets describe a slot that is currently importing or
//! migrating and are not ownership; they are skipped.

use regex::Regex;
use thiserror::Error;

use super::types::{ClusterMember, NodeRole, TopologySnapshot};
use crate::slots::range::SlotRange;

/// Errors that can occur when parsing cluster node listings.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to compile regex: {0}")]
    RegexCompilation(String),

    #[error("Invalid cluster nodes line: {0}")]
    InvalidNodeLine(String),

    #[error("Invalid slot range: {0}")]
    InvalidSlotRange(String),
}

/// Compiled patterns shared by one parse call.
struct NodePatterns {
    slot: Regex,
}

impl NodePatterns {
    fn compile() -> Result<Self, ParseError> {
        let slot = Regex::new(r"^(\d+)(?:-(\d+))?$")
            .map_err(|e| ParseError::RegexCompilation(e.to_string()))?;
        Ok(Self { slot })
    }

    fn parse_slot_range(&self, token: &str) -> Result<SlotRange, ParseError> {
        let caps = self
            .slot
            .captures(token)
            .ok_or_else(|| ParseError::InvalidSlotRange(token.to_string()))?;

        let parse_bound = |m: Option<regex::Match<'_>>| -> Result<Option<u16>, ParseError> {
            m.map(|m| {
                m.as_str()
                    .parse::<u16>()
                    .map_err(|_| ParseError::InvalidSlotRange(token.to_string()))
            })
            .transpose()
        };

        let start = parse_bound(caps.get(1))?
            .ok_or_else(|| ParseError::InvalidSlotRange(token.to_string()))?;
        let end = parse_bound(caps.get(2))?.unwrap_or(start);

        SlotRange::try_new(start, end).ok_or_else(|| ParseError::InvalidSlotRange(token.to_string()))
    }
}

/// Parse a single slot token such as `0-5460` or `5461`.
pub fn parse_slot_range(token: &str) -> Result<SlotRange, ParseError> {
    NodePatterns::compile()?.parse_slot_range(token.trim())
}

/// Parse the full output of `CLUSTER NODES`.
///
/// Blank lines are ignored. Members keep the order in which they are listed,
/// and each member's slot ranges keep the order in which they are reported.
pub fn parse_cluster_nodes(output: &str) -> Result<TopologySnapshot, ParseError> {
    let patterns = NodePatterns::compile()?;

    let members = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| parse_node_line(&patterns, line))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TopologySnapshot::new(members))
}

fn parse_node_line(patterns: &NodePatterns, line: &str) -> Result<ClusterMember, ParseError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let [node_id, address, flags, master, _ping, _pong, _epoch, _link, slot_tokens @ ..] =
        parts.as_slice()
    else {
        return Err(ParseError::InvalidNodeLine(format!(
            "not enough fields: {}",
            line
        )));
    };

    // ip:port@cport[,hostname]
    let ip_port = address.split('@').next().unwrap_or_default();
    let ip = match ip_port.rsplit_once(':') {
        Some((ip, _port)) => ip.to_string(),
        None => {
            return Err(ParseError::InvalidNodeLine(format!(
                "invalid address {}: {}",
                address, line
            )));
        }
    };

    let mut role = NodeRole::Unassigned;
    let mut myself = false;
    let mut failing = false;
    for flag in flags.split(',') {
        match flag {
            "myself" => myself = true,
            "master" => role = NodeRole::Master,
            "slave" | "replica" => role = NodeRole::Replica,
            "fail" | "fail?" | "pfail" => failing = true,
            _ => {}
        }
    }

    let master_id = (*master != "-").then(|| master.to_string());

    let slots = slot_tokens
        .iter()
        .filter(|token| !token.starts_with('['))
        .map(|token| patterns.parse_slot_range(token))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ClusterMember {
        name: String::new(),
        address: ip,
        node_id: node_id.to_string(),
        role,
        master_id,
        slots,
        myself,
        failing,
    })
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

    const NODES: &str = r#"07c37dfeb235213a872192d90877d0cd55635b91 10.0.0.1:6379@16379 myself,master - 0 1426238317239 2 connected 5461-10922
67ed2db8d677e59ec4a4cefb06858cf2a1a89fa1 10.0.0.2:6379@16379 master - 0 1426238316232 1 connected 0-5460
292f8b365bb7edb5e285caf0b7e6ddc7265d2f4f 10.0.0.3:6379@16379 master - 0 1426238316232 3 connected 10923-16383
e7d1eecce10fd6bb5eb35b9f99a514335d9ba9ca 10.0.0.4:6379@16379 slave 67ed2db8d677e59ec4a4cefb06858cf2a1a89fa1 0 1426238316232 1 connected"#;

    #[test]
    fn test_parse_slot_range() {
        assert_eq!(parse_slot_range("0-5460").unwrap(), SlotRange::new(0, 5460));
        assert_eq!(parse_slot_range("5461").unwrap(), SlotRange::single(5461));
        assert!(parse_slot_range("10-5").is_err());
        assert!(parse_slot_range("16384").is_err());
        assert!(parse_slot_range("abc").is_err());
    }

    #[test]
    fn test_parse_cluster_nodes() {
        let snapshot = parse_cluster_nodes(NODES).expect("should parse");
        assert_eq!(snapshot.members.len(), 4);
        assert_eq!(snapshot.masters().len(), 3);
        assert_eq!(snapshot.replicas().len(), 1);
        assert!(snapshot.is_fully_covered());

        let me = snapshot.myself().unwrap();
        assert_eq!(me.address, "10.0.0.1");
        assert_eq!(me.node_id, "07c37dfeb235213a872192d90877d0cd55635b91");
        assert_eq!(me.slots, vec![SlotRange::new(5461, 10922)]);

        let replica = snapshot.find_by_address("10.0.0.4").unwrap();
        assert_eq!(replica.role, NodeRole::Replica);
        assert_eq!(
            replica.master_id.as_deref(),
            Some("67ed2db8d677e59ec4a4cefb06858cf2a1a89fa1")
        );
        assert!(replica.slots.is_empty());
    }

    #[test]
    fn test_parse_keeps_reported_slot_order() {
        let line = "aaa 10.0.0.1:6379@16379 master - 0 0 1 connected 200-249 0-99 300";
        let snapshot = parse_cluster_nodes(line).unwrap();
        assert_eq!(
            snapshot.members[0].slots,
            vec![
                SlotRange::new(200, 249),
                SlotRange::new(0, 99),
                SlotRange::single(300)
            ]
        );
    }

    #[test]
    fn test_parse_skips_migration_markers() {
        let line = "aaa 10.0.0.1:6379@16379 master - 0 0 1 connected 0-99 [100->-bbb] [101-<-ccc]";
        let snapshot = parse_cluster_nodes(line).unwrap();
        assert_eq!(snapshot.members[0].slots, vec![SlotRange::new(0, 99)]);
    }

    #[test]
    fn test_parse_failing_and_hostname() {
        let line =
            "aaa 10.0.0.7:6379@16379,valkey-7 master,fail - 0 0 1 disconnected";
        let snapshot = parse_cluster_nodes(line).unwrap();
        let member = &snapshot.members[0];
        assert_eq!(member.address, "10.0.0.7");
        assert!(member.failing);
        assert!(member.slots.is_empty());
    }

    #[test]
    fn test_parse_noflags_is_unassigned() {
        let line = "aaa :6379@16379 myself,noflags - 0 0 0 connected";
        let snapshot = parse_cluster_nodes(line).unwrap();
        assert_eq!(snapshot.members[0].role, NodeRole::Unassigned);
    }

    #[test]
    fn test_parse_rejects_short_line() {
        let err = parse_cluster_nodes("aaa 10.0.0.1:6379 master").unwrap_err();
        assert!(matches!(err, ParseError::InvalidNodeLine(_)));
    }

    #[test]
    fn test_parse_empty_output() {
        let snapshot = parse_cluster_nodes("\n  \n").unwrap();
        assert!(snapshot.members.is_empty());
    }
}
