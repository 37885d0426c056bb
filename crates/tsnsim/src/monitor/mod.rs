// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Monitoring output.
//!
//! Two views of a finished (or paused) run:
//!
//! - **Flat tables** ([`tables`]): one [`PortEventRow`] per observed
//!   buffer event on a monitored switch port, one [`HopRow`] per hop of
//!   a monitored source's frames. Suitable for CSV export.
//! - **Hierarchical results** ([`results`]): per monitored node, the
//!   aggregate statistics of the run.
//!
//! Querying an unmonitored simulation is not an error — the tables and
//! result maps just come back empty.

pub mod stats;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::frame::FrameStore;
use crate::node::NodeKind;
use crate::sim::Simulation;
use crate::topology::{Address, PortId};
use crate::tsn::BufferLog;

use stats::PriorityKey;

/// What happened to a frame at a port buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Received,
    Transmitted,
    Dropped,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Received => f.write_str("received"),
            Self::Transmitted => f.write_str("transmitted"),
            Self::Dropped => f.write_str("dropped"),
        }
    }
}

/// One buffer event on a monitored switch port.
#[derive(Debug, Clone, Serialize)]
pub struct PortEventRow {
    pub sim_name: String,
    pub sim_id: u64,
    pub sim_seed: Option<u64>,
    pub switch_address: Address,
    pub egress_port: PortId,
    pub frame_id: u64,
    pub frame_source: Address,
    pub frame_destination: Address,
    pub frame_size: u64,
    pub frame_traffic_class: usize,
    pub action: Action,
    pub action_time: f64,
    pub action_q_len: usize,
    /// Transmission delay of the frame on this port's link, µs.
    pub d_trans: f64,
    /// Propagation delay of this port's link, µs.
    pub d_prop: f64,
}

/// One hop of a monitored source's frame.
#[derive(Debug, Clone, Serialize)]
pub struct HopRow {
    pub sim_name: String,
    pub sim_id: u64,
    pub sim_seed: Option<u64>,
    pub frame_id: u64,
    pub frame_source: Address,
    pub frame_destination: Address,
    pub frame_size: u64,
    pub frame_traffic_class: u8,
    pub frame_start_time: f64,
    pub frame_hop_count: u32,
    pub frame_last_hop: bool,
    pub frame_hop_sender: Address,
    pub frame_hop_sender_time: f64,
    pub frame_hop_receiver: Address,
    pub frame_hop_receiver_time: f64,
    pub d_trans: f64,
    pub d_prop: f64,
    /// Queueing share of the nodal delay: `d_nodal - d_trans - d_prop`.
    pub d_queue: f64,
    pub d_nodal: f64,
    /// Time from frame creation to arrival at this hop's receiver.
    pub latency: f64,
}

/// Flat-table monitoring output of one run.
#[derive(Debug, Default, Serialize)]
pub struct MonitorTables {
    pub port_events: Vec<PortEventRow>,
    pub frame_hops: Vec<HopRow>,
}

/// Aggregate statistics of one monitored switch port.
#[derive(Debug, Clone, Serialize)]
pub struct PortResults {
    pub frames_received: usize,
    pub frames_sent: usize,
    pub average_waiting_time: BTreeMap<PriorityKey, f64>,
    pub standard_deviation_waiting_time: BTreeMap<PriorityKey, f64>,
    pub average_queue_length: f64,
    pub standard_deviation_queue_length: f64,
    pub average_packet_size: f64,
    pub standard_deviation_packet_size: f64,
    pub max_queue_length: usize,
}

/// Aggregate statistics of one monitored traffic source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceResults {
    pub frames_injected: usize,
    pub frames_destination_reached: usize,
    pub average_packet_size: f64,
    pub standard_deviation_packet_size: f64,
    pub average_frame_latency: f64,
    pub standard_deviation_frame_latency: f64,
}

/// Per-node results of one run.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum NodeResults {
    Switch(BTreeMap<PortId, PortResults>),
    Source(SourceResults),
}

/// Assemble the flat monitor tables of a run.
#[must_use]
pub fn tables(sim: &Simulation) -> MonitorTables {
    let mut out = MonitorTables::default();
    for node in sim.nodes() {
        if !node.is_monitored() {
            continue;
        }
        match &node.kind {
            NodeKind::Switch(switch) => {
                let Some(node_id) = sim.node_by_address(node.address()) else {
                    continue;
                };
                for (port, module) in &switch.ports {
                    let Some(log) = module.buffer.log() else {
                        continue;
                    };
                    let Some(link) = sim.topology().link(node_id, *port) else {
                        continue;
                    };
                    for (entries, action) in [
                        (&log.append, Action::Received),
                        (&log.pop, Action::Transmitted),
                        (&log.drop, Action::Dropped),
                    ] {
                        for entry in entries.iter() {
                            let frame = sim.frames().get(entry.frame);
                            out.port_events.push(PortEventRow {
                                sim_name: sim.config().name.clone(),
                                sim_id: sim.config().run_index,
                                sim_seed: sim.config().seed,
                                switch_address: node.address().clone(),
                                egress_port: *port,
                                frame_id: entry.frame.as_u64(),
                                frame_source: frame.source().clone(),
                                frame_destination: frame.destination().clone(),
                                frame_size: frame.total_size(),
                                frame_traffic_class: module.buffer.traffic_class(frame.priority()),
                                action,
                                action_time: entry.time,
                                action_q_len: entry.queue_len,
                                d_trans: frame.total_size() as f64 * 8.0 / link.bandwidth,
                                d_prop: link.prop_delay,
                            });
                        }
                    }
                }
            }
            _ => hop_rows_of_source(sim, &node.emitted, &mut out.frame_hops),
        }
    }
    out
}

fn hop_rows_of_source(
    sim: &Simulation,
    emitted: &[crate::frame::FrameId],
    rows: &mut Vec<HopRow>,
) {
    for frame_id in emitted {
        let frame = sim.frames().get(*frame_id);
        let Some(trace) = frame.trace() else {
            continue;
        };
        for hop in trace.hops.hop_rows() {
            let pair = sim.pair_params(&hop.sender, &hop.receiver);
            let d_trans = pair.map_or(0.0, |p| frame.total_size() as f64 * 8.0 / p.bandwidth);
            let d_prop = pair.map_or(0.0, |p| p.prop_delay);
            let d_nodal = hop.receiver_time - hop.sender_time;
            rows.push(HopRow {
                sim_name: sim.config().name.clone(),
                sim_id: sim.config().run_index,
                sim_seed: sim.config().seed,
                frame_id: frame_id.as_u64(),
                frame_source: frame.source().clone(),
                frame_destination: frame.destination().clone(),
                frame_size: frame.total_size(),
                frame_traffic_class: frame.priority(),
                frame_start_time: trace.created,
                frame_hop_count: hop.hop_count,
                frame_last_hop: hop.last_hop,
                frame_hop_sender: hop.sender.clone(),
                frame_hop_sender_time: hop.sender_time,
                frame_hop_receiver: hop.receiver.clone(),
                frame_hop_receiver_time: hop.receiver_time,
                d_trans,
                d_prop,
                d_queue: d_nodal - d_trans - d_prop,
                d_nodal,
                latency: hop.receiver_time - trace.created,
            });
        }
    }
}

/// Assemble the hierarchical results of a run, keyed by node address.
#[must_use]
pub fn results(sim: &Simulation) -> BTreeMap<Address, NodeResults> {
    let mut out = BTreeMap::new();
    let runtime = sim.now();
    for node in sim.nodes() {
        if !node.is_monitored() {
            continue;
        }
        match &node.kind {
            NodeKind::Switch(switch) => {
                let mut per_port = BTreeMap::new();
                for (port, module) in &switch.ports {
                    let Some(log) = module.buffer.log() else {
                        continue;
                    };
                    per_port.insert(*port, port_results(log, sim.frames(), runtime));
                }
                out.insert(node.address().clone(), NodeResults::Switch(per_port));
            }
            NodeKind::Flow(_) | NodeKind::Injector(_) | NodeKind::SinglePacket(_) => {
                out.insert(
                    node.address().clone(),
                    NodeResults::Source(source_results(&node.emitted, sim.frames())),
                );
            }
            NodeKind::Sink => {}
        }
    }
    out
}

fn port_results(log: &BufferLog, frames: &FrameStore, runtime: f64) -> PortResults {
    let (average_waiting_time, standard_deviation_waiting_time) =
        stats::waiting_time_stats(&log.append, &log.pop, frames);
    let (average_packet_size, standard_deviation_packet_size) =
        stats::packet_size_stats(&log.append, frames);
    let mut merged: Vec<_> = log.append.iter().chain(log.pop.iter()).copied().collect();
    let (average_queue_length, standard_deviation_queue_length) =
        stats::queue_length_stats(&mut merged, runtime);
    PortResults {
        frames_received: log.append.len(),
        frames_sent: log.pop.len(),
        average_waiting_time,
        standard_deviation_waiting_time,
        average_queue_length,
        standard_deviation_queue_length,
        average_packet_size,
        standard_deviation_packet_size,
        max_queue_length: log.max_queue_len,
    }
}

fn source_results(emitted: &[crate::frame::FrameId], frames: &FrameStore) -> SourceResults {
    let (reached, average_frame_latency, standard_deviation_frame_latency) =
        stats::latency_stats(emitted, frames);
    let (average_packet_size, standard_deviation_packet_size) =
        stats::emitted_size_stats(emitted, frames);
    SourceResults {
        frames_injected: emitted.len(),
        frames_destination_reached: reached,
        average_packet_size,
        standard_deviation_packet_size,
        average_frame_latency,
        standard_deviation_frame_latency,
    }
}
