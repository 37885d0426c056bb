// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Network nodes.
//!
//! Nodes live in an arena owned by the simulation and reference each
//! other by [`NodeId`] — the port engines and channel processes hold ids
//! plus the topology, never back-pointers. Variants: traffic sources
//! ([`source`]), the side-channel [`injector`], sinks, and the learning
//! bridge ([`crate::switch`]).

pub mod injector;
pub mod source;

use std::fmt;

use crate::core::{Result, SimError};
use crate::frame::FrameId;
use crate::generators::{BoxGenerator, FrameSpec};
use crate::sim::Ctx;
use crate::switch::SwitchNode;
use crate::topology::{Address, PortId};

/// Handle into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[must_use]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a frame entered a node: over a connected port, or out-of-band
/// from an injector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingress {
    Port(PortId),
    /// Side-channel delivery; never equals a real port, so a switch
    /// broadcasts injected frames with unknown destinations to all ports.
    Injected,
}

impl fmt::Display for Ingress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Port(port) => write!(f, "port {port}"),
            Self::Injected => f.write_str("injected"),
        }
    }
}

/// A node of the simulated network.
pub struct Node {
    pub(crate) address: Address,
    pub(crate) monitor: bool,
    pub(crate) ports: Vec<PortId>,
    /// Frames emitted by this node, kept when monitored.
    pub(crate) emitted: Vec<FrameId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new(address: Address, monitor: bool, kind: NodeKind) -> Self {
        Self {
            address,
            monitor,
            ports: Vec::new(),
            emitted: Vec::new(),
            kind,
        }
    }

    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    #[must_use]
    pub fn is_monitored(&self) -> bool {
        self.monitor
    }

    /// Ports wired on this node, in connection order.
    #[must_use]
    pub fn ports(&self) -> &[PortId] {
        &self.ports
    }

    #[must_use]
    pub fn is_switch(&self) -> bool {
        matches!(self.kind, NodeKind::Switch(_))
    }

    pub(crate) fn switch(&self) -> Option<&SwitchNode> {
        match &self.kind {
            NodeKind::Switch(switch) => Some(switch),
            _ => None,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("address", &self.address)
            .field("monitor", &self.monitor)
            .field("ports", &self.ports)
            .finish_non_exhaustive()
    }
}

/// Behaviour variants of a node.
pub(crate) enum NodeKind {
    /// Absorbs frames, contributes no behaviour.
    Sink,
    /// Generator-driven source: one emitting process per connected port.
    Flow(FlowNode),
    /// Sends exactly one frame after `wait_until` µs.
    SinglePacket(SinglePacketNode),
    /// Pushes generated frames straight into a target node's ingress.
    Injector(InjectorNode),
    /// Learning bridge.
    Switch(SwitchNode),
}

pub(crate) struct FlowNode {
    pub(crate) generator: BoxGenerator<FrameSpec>,
}

pub(crate) struct SinglePacketNode {
    pub(crate) destination: Address,
    pub(crate) payload: u32,
    pub(crate) priority: u8,
    pub(crate) wait_until: f64,
}

pub(crate) struct InjectorNode {
    pub(crate) target: NodeId,
    /// Rate the injected traffic pretends to be transmitted at, bits/µs.
    pub(crate) bandwidth: f64,
    /// Virtual instant of the first injection.
    pub(crate) start_at: f64,
    pub(crate) intensity: BoxGenerator<f64>,
    pub(crate) generator: BoxGenerator<FrameSpec>,
}

/// Hand a frame to a node's ingress.
///
/// Called by the channel on transmission completion and by injectors as
/// a side channel. Switches learn, forward or broadcast; every other
/// node just absorbs the frame.
pub(crate) fn deliver(
    ctx: &mut Ctx<'_>,
    node: NodeId,
    frame: FrameId,
    ingress: Ingress,
) -> Result<()> {
    if ctx.config.verbose {
        let frame_ref = ctx.frames.get(frame);
        log::debug!(
            "{:.2}: {}: {} received on {}",
            ctx.kernel.now(),
            ctx.nodes[node.index()].address,
            frame_ref,
            ingress
        );
    }
    match ctx.nodes[node.index()].kind {
        NodeKind::Switch(_) => crate::switch::ingress(ctx, node, frame, ingress),
        _ => Ok(()),
    }
}

/// Pull the next frame spec out of a source node's generator.
pub(crate) fn next_frame_spec(ctx: &mut Ctx<'_>, node: NodeId) -> Option<FrameSpec> {
    let nodes = &mut *ctx.nodes;
    let rng = &mut *ctx.rng;
    match &mut nodes[node.index()].kind {
        NodeKind::Flow(flow) => flow.generator.next_value(rng),
        NodeKind::Injector(injector) => injector.generator.next_value(rng),
        _ => None,
    }
}

/// Allocate a frame emitted by `node`, tracking it when monitored.
pub(crate) fn emit_frame(ctx: &mut Ctx<'_>, node: NodeId, spec: &FrameSpec) -> Result<FrameId> {
    if spec.priority > 7 {
        return Err(SimError::InvalidPriority(spec.priority));
    }
    let (source, monitored) = {
        let node_ref = &ctx.nodes[node.index()];
        (node_ref.address.clone(), node_ref.monitor)
    };
    let frame = ctx.create_frame(source, spec, monitored);
    if monitored {
        ctx.nodes[node.index()].emitted.push(frame);
    }
    Ok(frame)
}
