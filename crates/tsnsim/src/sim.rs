// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The simulation facade.
//!
//! A [`Simulation`] owns the kernel, the node arena, the frame arena,
//! the topology tables and the seeded RNG. Scenarios assemble a network
//! through the builder methods (`add_*`, [`connect_nodes`]) and then
//! drive it with [`run_until`] or [`run_until_stopped`].
//!
//! [`connect_nodes`]: Simulation::connect_nodes
//! [`run_until`]: Simulation::run_until
//! [`run_until_stopped`]: Simulation::run_until_stopped

use std::collections::HashMap;

use crate::channel::{SendInspector, SendProcess};
use crate::config::{SimConfig, ETHERNET_HEADER_BYTES, ETHERNET_HEADER_TAG};
use crate::core::{
    EntryAction, EventId, Kernel, ProcessId, ProcessState, SimError, Step, Wake,
};
use crate::frame::{FrameId, FrameStore, Header};
use crate::generators::{BoxGenerator, FrameSpec, Generator, SimRng};
use crate::node::injector::InjectorWorker;
use crate::node::source::{FlowWorker, SinglePacketWorker};
use crate::node::{FlowNode, InjectorNode, Node, NodeId, NodeKind, SinglePacketNode};
use crate::switch::port::PortEngine;
use crate::switch::{SwitchConfig, SwitchNode, TableEntry};
use crate::topology::{
    physical_delay, Address, BuildError, Link, PairParams, PortId, Topology,
};
use crate::tsn::SwitchPortParam;

/// Parameters of one bidirectional connection.
#[derive(Default)]
pub struct LinkSpec {
    /// Bandwidth in Mb/s (= bits/µs). Zero means the default of 10.
    pub bandwidth_mbps: f64,
    /// Channel type to resolve the propagation speed from; `None` for an
    /// ideal channel.
    pub channel_type: Option<String>,
    /// Channel length in meters.
    pub channel_length_m: f64,
    /// Egress configuration of the first node's port, if it is a switch.
    pub param_a: Option<SwitchPortParam>,
    /// Egress configuration of the second node's port, if it is a switch.
    pub param_b: Option<SwitchPortParam>,
}

/// Split-borrow view of a simulation, handed to resumed processes.
///
/// The kernel, the arenas and the RNG are disjoint fields so a process
/// can schedule events, mutate node state and draw random values in one
/// resumption.
pub(crate) struct Ctx<'a> {
    pub(crate) config: &'a SimConfig,
    pub(crate) kernel: &'a mut Kernel,
    pub(crate) topology: &'a Topology,
    pub(crate) nodes: &'a mut Vec<Node>,
    pub(crate) frames: &'a mut FrameStore,
    pub(crate) rng: &'a mut SimRng,
    stop_event: EventId,
}

impl Ctx<'_> {
    /// Complete the stop event; the run winds down at the current tick.
    pub(crate) fn request_stop(&mut self) {
        self.kernel.succeed(self.stop_event);
    }

    /// Allocate a frame with the standard Ethernet framing overhead.
    pub(crate) fn create_frame(
        &mut self,
        source: Address,
        spec: &FrameSpec,
        monitored: bool,
    ) -> FrameId {
        self.frames.alloc(
            source,
            spec.destination.clone(),
            spec.payload,
            spec.priority,
            vec![Header::new(ETHERNET_HEADER_BYTES, ETHERNET_HEADER_TAG)],
            monitored,
            self.kernel.now(),
        )
    }

    /// Start transmitting `frame` on `(node, port)`: spawns the sending
    /// process and returns its handle. `extra_bytes` lengthen the
    /// transmission without touching the frame.
    pub(crate) fn pop(
        &mut self,
        node: NodeId,
        frame: FrameId,
        port: PortId,
        extra_bytes: u32,
        with_inspector: bool,
    ) -> Result<ProcessId, SimError> {
        let link: Link = self
            .topology
            .link(node, port)
            .ok_or_else(|| SimError::UnconnectedPort {
                address: self.nodes[node.index()].address().clone(),
                port,
            })?
            .clone();
        let total_bits =
            (self.frames.get(frame).total_size() + u64::from(extra_bytes)) as f64 * 8.0;
        let sending_time = total_bits / link.bandwidth + link.prop_delay;
        let inspector = with_inspector.then(|| {
            SendInspector::new(
                link.bandwidth,
                self.config.min_preemption_bytes(),
                self.config.preemption_penalty_bytes,
            )
        });
        let handle = self.kernel.spawn(ProcessState::Send(SendProcess::new(
            frame,
            node,
            link.peer,
            link.peer_port,
            sending_time,
            inspector,
        )));
        if self.config.verbose {
            log::debug!(
                "{:.2}: {}: {} sending on port {}",
                self.kernel.now(),
                self.nodes[node.index()].address(),
                self.frames.get(frame),
                port
            );
        }
        Ok(handle)
    }
}

/// One discrete-event network simulation.
pub struct Simulation {
    config: SimConfig,
    kernel: Kernel,
    topology: Topology,
    nodes: Vec<Node>,
    frames: FrameStore,
    rng: SimRng,
    addresses: HashMap<Address, NodeId>,
    stop_event: EventId,
}

impl Simulation {
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let mut kernel = Kernel::new();
        let stop_event = kernel.new_event();
        let rng = SimRng::new(config.seed);
        Self {
            config,
            kernel,
            topology: Topology::default(),
            nodes: Vec::new(),
            frames: FrameStore::default(),
            rng,
            addresses: HashMap::new(),
            stop_event,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Mutable configuration access, for scenario tweaks before the run.
    pub fn config_mut(&mut self) -> &mut SimConfig {
        &mut self.config
    }

    /// Current virtual time in µs.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.kernel.now()
    }

    /// All frames created so far.
    #[must_use]
    pub fn frames(&self) -> &FrameStore {
        &self.frames
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[must_use]
    pub fn node_by_address(&self, address: &Address) -> Option<NodeId> {
        self.addresses.get(address).copied()
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Link parameters between two addresses, for hop statistics.
    #[must_use]
    pub fn pair_params(&self, a: &Address, b: &Address) -> Option<PairParams> {
        self.topology.pair(a, b)
    }

    /// Learning-table entry of a switch, if present.
    #[must_use]
    pub fn switch_table_entry(&self, switch: NodeId, address: &Address) -> Option<TableEntry> {
        self.nodes[switch.index()]
            .switch()
            .and_then(|s| s.table_entry(address))
    }

    // --- builder surface ---------------------------------------------------

    fn add_node(&mut self, address: Address, monitor: bool, kind: NodeKind) -> Result<NodeId, BuildError> {
        if self.addresses.contains_key(&address) {
            return Err(BuildError::DuplicateAddress(address));
        }
        let id = NodeId(u32::try_from(self.nodes.len()).expect("node arena overflow"));
        self.addresses.insert(address.clone(), id);
        self.nodes.push(Node::new(address, monitor, kind));
        self.topology.ensure_node(id);
        Ok(id)
    }

    /// Add a sink: absorbs frames, contributes no behaviour.
    pub fn add_sink(&mut self, address: impl Into<Address>) -> Result<NodeId, BuildError> {
        self.add_node(address.into(), false, NodeKind::Sink)
    }

    /// Add a generator-driven source. One emitting process runs per
    /// connected port; the generator running dry stops the simulation.
    pub fn add_flow(
        &mut self,
        address: impl Into<Address>,
        generator: impl Generator<FrameSpec> + 'static,
        monitor: bool,
    ) -> Result<NodeId, BuildError> {
        self.add_node(
            address.into(),
            monitor,
            NodeKind::Flow(FlowNode {
                generator: Box::new(generator),
            }),
        )
    }

    /// Add a source that sends exactly one frame after `wait_until` µs.
    pub fn add_single_packet(
        &mut self,
        address: impl Into<Address>,
        destination: impl Into<Address>,
        payload: u32,
        wait_until: f64,
        priority: u8,
        monitor: bool,
    ) -> Result<NodeId, BuildError> {
        if priority > 7 {
            return Err(BuildError::InvalidPriority(priority));
        }
        let id = self.add_node(
            address.into(),
            monitor,
            NodeKind::SinglePacket(SinglePacketNode {
                destination: destination.into(),
                payload,
                priority,
                wait_until,
            }),
        )?;
        self.kernel
            .spawn(ProcessState::SinglePacket(SinglePacketWorker::new(id)));
        Ok(id)
    }

    /// Add an injector feeding frames straight into `target`'s ingress,
    /// paced at `intensity * frame_transmit_time` against `bandwidth_mbps`.
    /// The first injection happens at `start_at`.
    pub fn add_injector(
        &mut self,
        address: impl Into<Address>,
        target: impl Into<Address>,
        bandwidth_mbps: f64,
        start_at: f64,
        intensity: impl Generator<f64> + 'static,
        generator: impl Generator<FrameSpec> + 'static,
        monitor: bool,
    ) -> Result<NodeId, BuildError> {
        if bandwidth_mbps <= 0.0 {
            return Err(BuildError::InvalidBandwidth(bandwidth_mbps));
        }
        let target = target.into();
        let target_id = self
            .addresses
            .get(&target)
            .copied()
            .ok_or(BuildError::UnknownNode(target))?;
        let id = self.add_node(
            address.into(),
            monitor,
            NodeKind::Injector(InjectorNode {
                target: target_id,
                bandwidth: bandwidth_mbps,
                start_at,
                intensity: Box::new(intensity) as BoxGenerator<f64>,
                generator: Box::new(generator),
            }),
        )?;
        self.kernel
            .spawn(ProcessState::Injector(InjectorWorker::new(id)));
        Ok(id)
    }

    /// Add a learning bridge.
    pub fn add_switch(
        &mut self,
        address: impl Into<Address>,
        config: SwitchConfig,
        monitor: bool,
    ) -> Result<NodeId, BuildError> {
        self.add_node(
            address.into(),
            monitor,
            NodeKind::Switch(SwitchNode::new(config)),
        )
    }

    /// Wire `(a, next free port of a) <-> (b, next free port of b)`.
    ///
    /// Bandwidth defaults to 10 Mb/s when the spec leaves it zero. The
    /// propagation delay is `length / speed` with the speed resolved from
    /// the channel-type table, or zero for an ideal channel.
    pub fn connect_nodes(
        &mut self,
        a: NodeId,
        b: NodeId,
        spec: LinkSpec,
    ) -> Result<(), BuildError> {
        let bandwidth = if spec.bandwidth_mbps == 0.0 {
            crate::config::DEFAULT_BANDWIDTH
        } else {
            spec.bandwidth_mbps
        };
        if bandwidth <= 0.0 {
            return Err(BuildError::InvalidBandwidth(bandwidth));
        }
        let prop_delay = physical_delay(
            &self.config.channel_types,
            spec.channel_type.as_deref(),
            spec.channel_length_m,
        )?;

        let port_a = self.topology.next_port(a);
        let port_b = self.topology.next_port(b);
        self.topology.add_link(
            a,
            Link {
                peer: b,
                peer_port: port_b,
                bandwidth,
                prop_delay,
            },
        );
        self.topology.add_link(
            b,
            Link {
                peer: a,
                peer_port: port_a,
                bandwidth,
                prop_delay,
            },
        );
        self.topology.add_pair(
            self.nodes[a.index()].address().clone(),
            self.nodes[b.index()].address().clone(),
            PairParams {
                bandwidth,
                prop_delay,
            },
        );

        self.port_added(a, port_a, bandwidth, spec.param_a)?;
        self.port_added(b, port_b, bandwidth, spec.param_b)?;
        Ok(())
    }

    /// Register a freshly wired port on its node and spawn the processes
    /// it needs (port engines on switches, emitters on flows).
    fn port_added(
        &mut self,
        node: NodeId,
        port: PortId,
        bandwidth: f64,
        param: Option<SwitchPortParam>,
    ) -> Result<(), BuildError> {
        self.nodes[node.index()].ports.push(port);
        let monitored = self.nodes[node.index()].monitor;
        let preemption = match &self.nodes[node.index()].kind {
            NodeKind::Switch(switch) => Some(switch.preemption),
            _ => None,
        };
        if let Some(preemption) = preemption {
            let engine = self
                .kernel
                .spawn(ProcessState::Port(PortEngine::new(node, port, preemption)));
            if let NodeKind::Switch(switch) = &mut self.nodes[node.index()].kind {
                switch.add_port(port, bandwidth, param.unwrap_or_default(), monitored, engine);
            }
        } else if matches!(&self.nodes[node.index()].kind, NodeKind::Flow(_)) {
            self.kernel
                .spawn(ProcessState::Flow(FlowWorker::new(node, port)));
        }
        Ok(())
    }

    // --- run control -------------------------------------------------------

    /// Complete the stop event; a `run_until_stopped` ends at this tick.
    pub fn stop(&mut self) {
        self.kernel.succeed(self.stop_event);
    }

    /// The event completed by [`stop`](Self::stop) and by exhausted
    /// generators.
    #[must_use]
    pub fn stop_event(&self) -> EventId {
        self.stop_event
    }

    /// Run until virtual time reaches `until` (events scheduled exactly
    /// at `until` stay unprocessed) or no events remain.
    pub fn run_until(&mut self, until: f64) -> Result<(), SimError> {
        self.kernel.sentinel_at(until);
        self.run_loop(None)
    }

    /// Run until `event` fires or no events remain.
    pub fn run_until_event(&mut self, event: EventId) -> Result<(), SimError> {
        self.run_loop(Some(event))
    }

    /// Run until the stop event fires or no events remain.
    pub fn run_until_stopped(&mut self) -> Result<(), SimError> {
        let stop = self.stop_event;
        self.run_until_event(stop)
    }

    fn run_loop(&mut self, until_event: Option<EventId>) -> Result<(), SimError> {
        loop {
            if let Some(event) = until_event {
                if self.kernel.event_fired(event) {
                    return Ok(());
                }
            }
            let Some(entry) = self.kernel.pop_entry() else {
                return Ok(());
            };
            match entry.action {
                EntryAction::Sentinel => return Ok(()),
                EntryAction::Fire(event) => {
                    for pid in self.kernel.begin_fire(event) {
                        self.dispatch(pid, Wake::Fired)?;
                    }
                }
                EntryAction::Deliver(pid, cause) => {
                    if self.kernel.begin_deliver(pid) {
                        self.dispatch(pid, Wake::Interrupt(cause))?;
                    }
                }
                EntryAction::Resume(pid) => {
                    if self.kernel.alive(pid) {
                        self.dispatch(pid, Wake::Fired)?;
                    }
                }
            }
        }
    }

    /// Check a process out, resume it against the world, park it back.
    fn dispatch(&mut self, pid: ProcessId, wake: Wake) -> Result<(), SimError> {
        let Some(mut state) = self.kernel.take_state(pid) else {
            return Ok(());
        };
        let step = {
            let mut ctx = Ctx {
                config: &self.config,
                kernel: &mut self.kernel,
                topology: &self.topology,
                nodes: &mut self.nodes,
                frames: &mut self.frames,
                rng: &mut self.rng,
                stop_event: self.stop_event,
            };
            state.resume(&mut ctx, wake)
        };
        match step? {
            Step::Wait(event) => self.kernel.park(pid, state, event),
            Step::Done => self.kernel.finish(pid),
        }
        Ok(())
    }
}
