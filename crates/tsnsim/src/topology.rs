// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Node addresses and the connection tables.
//!
//! A connection wires `(node_a, port_a) <-> (node_b, port_b)` symmetrically
//! with a bandwidth in bits/µs and a propagation delay in µs. Port numbers
//! start at 1 and are unique per node only.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::node::NodeId;

/// Port number on a node, starting at 1.
pub type PortId = u32;

/// Opaque node address, compared by equality.
///
/// Broadcast is not a distinguished address — a switch broadcasts whenever
/// its learning table misses the destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(Arc<str>);

impl Address {
    /// The address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(Arc::from(value.as_str()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// One direction of a connection, as seen from the sending port.
#[derive(Debug, Clone)]
pub struct Link {
    /// Receiving node.
    pub peer: NodeId,
    /// Ingress port on the receiving node.
    pub peer_port: PortId,
    /// Bandwidth in bits/µs (numerically equal to Mb/s).
    pub bandwidth: f64,
    /// Propagation delay in µs.
    pub prop_delay: f64,
}

/// Bandwidth and propagation delay of a node pair, for hop statistics.
#[derive(Debug, Clone, Copy)]
pub struct PairParams {
    pub bandwidth: f64,
    pub prop_delay: f64,
}

/// Connection tables of a built network.
#[derive(Debug, Default)]
pub struct Topology {
    /// Outgoing links per node, indexed by `port - 1`.
    ports: Vec<Vec<Link>>,
    /// Link parameters per connected address pair (both directions).
    pairs: HashMap<(Address, Address), PairParams>,
}

impl Topology {
    /// Grow the table to cover `node`.
    pub(crate) fn ensure_node(&mut self, node: NodeId) {
        while self.ports.len() <= node.index() {
            self.ports.push(Vec::new());
        }
    }

    /// The next free port number of `node`.
    pub(crate) fn next_port(&self, node: NodeId) -> PortId {
        u32::try_from(self.ports[node.index()].len()).expect("port table overflow") + 1
    }

    pub(crate) fn add_link(&mut self, node: NodeId, link: Link) {
        self.ports[node.index()].push(link);
    }

    pub(crate) fn add_pair(&mut self, a: Address, b: Address, params: PairParams) {
        self.pairs.insert((a.clone(), b.clone()), params);
        self.pairs.insert((b, a), params);
    }

    /// The outgoing link of `(node, port)`, if connected.
    #[must_use]
    pub fn link(&self, node: NodeId, port: PortId) -> Option<&Link> {
        if port == 0 {
            return None;
        }
        self.ports[node.index()].get(port as usize - 1)
    }

    /// Link parameters between two addresses, if connected.
    #[must_use]
    pub fn pair(&self, a: &Address, b: &Address) -> Option<PairParams> {
        self.pairs.get(&(a.clone(), b.clone())).copied()
    }

    /// Number of ports wired on `node`.
    #[must_use]
    pub fn port_count(&self, node: NodeId) -> usize {
        self.ports.get(node.index()).map_or(0, Vec::len)
    }
}

/// Errors detected while assembling a network. All of them are fatal at
/// builder time.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// The channel type is not in the simulation's channel-type table.
    UnknownChannelType(String),
    /// Bandwidth must be strictly positive.
    InvalidBandwidth(f64),
    /// Two nodes share an address.
    DuplicateAddress(Address),
    /// A referenced node address does not exist.
    UnknownNode(Address),
    /// Traffic-class count outside `1..=8`.
    InvalidTrafficClassCount(usize),
    /// A traffic-class index beyond the configured class count.
    InvalidTrafficClass { class: usize, available: usize },
    /// A frame priority outside `0..=7` in a map override.
    InvalidPriority(u8),
    /// A CBS bandwidth share outside `[0, 1]`.
    InvalidDeltaBandwidth(f64),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownChannelType(name) => write!(f, "unknown channel type {name:?}"),
            Self::InvalidBandwidth(bw) => write!(f, "bandwidth must be positive, got {bw}"),
            Self::DuplicateAddress(address) => write!(f, "duplicate node address {address}"),
            Self::UnknownNode(address) => write!(f, "no node with address {address}"),
            Self::InvalidTrafficClassCount(count) => {
                write!(f, "traffic class count {count} outside 1..=8")
            }
            Self::InvalidTrafficClass { class, available } => {
                write!(f, "traffic class {class} outside 0..{available}")
            }
            Self::InvalidPriority(priority) => write!(f, "priority {priority} outside 0..=7"),
            Self::InvalidDeltaBandwidth(delta) => {
                write!(f, "CBS bandwidth share {delta} outside [0, 1]")
            }
        }
    }
}

impl std::error::Error for BuildError {}

/// Propagation delay of a channel in µs: `length / speed`, with speed
/// resolved from the channel-type table. No type or zero length means an
/// ideal channel.
pub(crate) fn physical_delay(
    channel_types: &HashMap<String, f64>,
    channel_type: Option<&str>,
    channel_length_m: f64,
) -> Result<f64, BuildError> {
    match channel_type {
        None => Ok(0.0),
        Some(name) => {
            let speed = channel_types
                .get(name)
                .ok_or_else(|| BuildError::UnknownChannelType(name.to_string()))?;
            Ok(channel_length_m / speed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_channel_types;

    #[test]
    fn test_physical_delay_without_type_is_zero() {
        let types = default_channel_types();
        assert_eq!(physical_delay(&types, None, 100.0).unwrap(), 0.0);
    }

    #[test]
    fn test_physical_delay_fiber() {
        let types = default_channel_types();
        let delay = physical_delay(&types, Some("fiber"), 290.0).unwrap();
        assert!((delay - 290.0 / (0.97 * 299.792)).abs() < 1e-12);
    }

    #[test]
    fn test_physical_delay_unknown_type() {
        let types = default_channel_types();
        let err = physical_delay(&types, Some("vacuum"), 1.0).unwrap_err();
        assert_eq!(err, BuildError::UnknownChannelType("vacuum".to_string()));
    }

    #[test]
    fn test_address_equality_and_display() {
        let a: Address = "switch-1".into();
        let b: Address = String::from("switch-1").into();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "switch-1");
    }
}
