// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The learning bridge.
//!
//! On ingress a switch learns `source -> (ingress, time)`, then looks the
//! destination up:
//!
//! - table miss, or an entry older than the aging time: broadcast to
//!   every port except the ingress,
//! - entry pointing back at the ingress: silent split-horizon discard
//!   (logged, but never a `drop` monitor row),
//! - otherwise: append to the egress port buffer and wake that port's
//!   engine.
//!
//! Frames arriving over the injector side channel are learned with the
//! [`Ingress::Injected`] pseudo-port; a destination behind the side
//! channel cannot be forwarded to and is discarded like split-horizon
//! traffic.

pub(crate) mod port;

use std::collections::{BTreeMap, HashMap};

use crate::core::{Cause, ProcessId, Result};
use crate::frame::FrameId;
use crate::node::{Ingress, NodeId, NodeKind};
use crate::sim::Ctx;
use crate::topology::{Address, PortId};
use crate::tsn::{PortBuffer, SwitchPortParam};

/// Learning-table entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableEntry {
    pub ingress: Ingress,
    pub last_seen: f64,
}

/// Buffer and engine process of one output port.
pub(crate) struct PortModule {
    pub(crate) buffer: PortBuffer,
    pub(crate) engine: ProcessId,
}

/// Configuration of a switch node.
#[derive(Debug, Clone, Copy)]
pub struct SwitchConfig {
    /// Learning-table aging time in seconds; `<= 0` disables aging.
    pub aging_time_s: f64,
    /// Drive ports with the preemptive engine.
    pub preemption: bool,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            aging_time_s: -1.0,
            preemption: false,
        }
    }
}

/// State of a learning bridge.
pub(crate) struct SwitchNode {
    /// Aging time in µs; non-positive disables aging.
    pub(crate) aging_time: f64,
    pub(crate) preemption: bool,
    pub(crate) table: HashMap<Address, TableEntry>,
    /// Port modules in port order, for deterministic broadcast fan-out.
    pub(crate) ports: BTreeMap<PortId, PortModule>,
}

impl SwitchNode {
    pub(crate) fn new(config: SwitchConfig) -> Self {
        Self {
            aging_time: if config.aging_time_s > 0.0 {
                config.aging_time_s * 1_000_000.0
            } else {
                config.aging_time_s
            },
            preemption: config.preemption,
            table: HashMap::new(),
            ports: BTreeMap::new(),
        }
    }

    pub(crate) fn add_port(
        &mut self,
        port: PortId,
        bandwidth: f64,
        param: SwitchPortParam,
        monitored: bool,
        engine: ProcessId,
    ) {
        self.ports.insert(
            port,
            PortModule {
                buffer: PortBuffer::new(bandwidth, param, monitored),
                engine,
            },
        );
    }

    /// The learning table, for inspection by tests and scenarios.
    #[must_use]
    pub(crate) fn table_entry(&self, address: &Address) -> Option<TableEntry> {
        self.table.get(address).copied()
    }
}

fn switch_mut<'a>(ctx: &'a mut Ctx<'_>, node: NodeId) -> &'a mut SwitchNode {
    match &mut ctx.nodes[node.index()].kind {
        NodeKind::Switch(switch) => switch,
        _ => unreachable!("switch ingress on a non-switch node"),
    }
}

/// Handle one frame arriving at a switch.
pub(crate) fn ingress(
    ctx: &mut Ctx<'_>,
    node: NodeId,
    frame: FrameId,
    ingress: Ingress,
) -> Result<()> {
    let now = ctx.kernel.now();
    let (source, destination, priority) = {
        let frame_ref = ctx.frames.get(frame);
        (
            frame_ref.source().clone(),
            frame_ref.destination().clone(),
            frame_ref.priority(),
        )
    };

    let switch = switch_mut(ctx, node);
    switch.table.insert(
        source,
        TableEntry {
            ingress,
            last_seen: now,
        },
    );

    let aging_time = switch.aging_time;
    match switch.table.get(&destination).copied() {
        None => broadcast(ctx, node, frame, priority, ingress)?,
        Some(entry) if aging_time > 0.0 && now > entry.last_seen + aging_time => {
            switch_mut(ctx, node).table.remove(&destination);
            broadcast(ctx, node, frame, priority, ingress)?;
        }
        Some(entry) if entry.ingress == ingress => discard(ctx, node, frame),
        Some(entry) => match entry.ingress {
            Ingress::Port(egress) => forward(ctx, node, frame, priority, egress)?,
            // The destination lives behind the injector side channel;
            // there is no wire to put the frame on.
            Ingress::Injected => discard(ctx, node, frame),
        },
    }
    Ok(())
}

/// Enqueue on one egress port and wake its engine; tail-drop instead
/// when a bounded port is already full.
fn enqueue(module: &mut PortModule, kernel: &mut crate::core::Kernel, frame: FrameId, priority: u8) -> Result<()> {
    let now = kernel.now();
    module.buffer.append_frame(now, frame, priority);
    if module.buffer.over_capacity() {
        module.buffer.drop_frame(now, frame, priority)?;
    } else {
        kernel.interrupt(module.engine, Cause::NewFrame);
    }
    Ok(())
}

fn forward(
    ctx: &mut Ctx<'_>,
    node: NodeId,
    frame: FrameId,
    priority: u8,
    egress: PortId,
) -> Result<()> {
    let nodes = &mut *ctx.nodes;
    let kernel = &mut *ctx.kernel;
    let switch = match &mut nodes[node.index()].kind {
        NodeKind::Switch(switch) => switch,
        _ => unreachable!(),
    };
    let module = switch.ports.get_mut(&egress).expect("egress port exists");
    enqueue(module, kernel, frame, priority)
}

fn broadcast(
    ctx: &mut Ctx<'_>,
    node: NodeId,
    frame: FrameId,
    priority: u8,
    source: Ingress,
) -> Result<()> {
    if ctx.config.verbose {
        log::debug!(
            "{:.2}: {}: {} broadcasting",
            ctx.kernel.now(),
            ctx.nodes[node.index()].address,
            ctx.frames.get(frame)
        );
    }
    let nodes = &mut *ctx.nodes;
    let kernel = &mut *ctx.kernel;
    let switch = match &mut nodes[node.index()].kind {
        NodeKind::Switch(switch) => switch,
        _ => unreachable!(),
    };
    for (port, module) in &mut switch.ports {
        if Ingress::Port(*port) == source {
            continue;
        }
        enqueue(module, kernel, frame, priority)?;
    }
    Ok(())
}

fn discard(ctx: &mut Ctx<'_>, node: NodeId, frame: FrameId) {
    if ctx.config.verbose {
        log::debug!(
            "{:.2}: {}: {} discarded",
            ctx.kernel.now(),
            ctx.nodes[node.index()].address,
            ctx.frames.get(frame)
        );
    }
}
