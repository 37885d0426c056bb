// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Traffic sources.
//!
//! A [`FlowWorker`] drives one port of a Flow node: pull a frame spec
//! from the node's generator, transmit, wait for the channel to finish,
//! repeat. Generator exhaustion completes the stop event and ends the
//! worker. A [`SinglePacketWorker`] waits a configured delay and sends
//! exactly one frame.

use crate::core::{Result, Step, Wake};
use crate::generators::FrameSpec;
use crate::node::{self, NodeId, NodeKind};
use crate::sim::Ctx;
use crate::topology::PortId;

/// Per-port emitting process of a Flow node.
#[derive(Debug)]
pub(crate) struct FlowWorker {
    node: NodeId,
    port: PortId,
}

impl FlowWorker {
    pub(crate) fn new(node: NodeId, port: PortId) -> Self {
        Self { node, port }
    }

    pub(crate) fn resume(&mut self, ctx: &mut Ctx<'_>, _wake: Wake) -> Result<Step> {
        // Woken either for the initial start or because the previous
        // transmission completed; either way the next frame goes out.
        let Some(spec) = node::next_frame_spec(ctx, self.node) else {
            ctx.request_stop();
            return Ok(Step::Done);
        };
        let frame = node::emit_frame(ctx, self.node, &spec)?;
        let handle = ctx.pop(self.node, frame, self.port, 0, false)?;
        Ok(Step::Wait(ctx.kernel.completion_event(handle)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SingleShotPhase {
    Init,
    Armed,
    Sent,
}

/// Sends one frame after `wait_until` µs, then terminates.
#[derive(Debug)]
pub(crate) struct SinglePacketWorker {
    node: NodeId,
    phase: SingleShotPhase,
}

impl SinglePacketWorker {
    pub(crate) fn new(node: NodeId) -> Self {
        Self {
            node,
            phase: SingleShotPhase::Init,
        }
    }

    pub(crate) fn resume(&mut self, ctx: &mut Ctx<'_>, _wake: Wake) -> Result<Step> {
        match self.phase {
            SingleShotPhase::Init => {
                let wait_until = match &ctx.nodes[self.node.index()].kind {
                    NodeKind::SinglePacket(packet) => packet.wait_until,
                    _ => 0.0,
                };
                self.phase = SingleShotPhase::Armed;
                Ok(Step::Wait(ctx.kernel.timeout(wait_until)))
            }
            SingleShotPhase::Armed => {
                let (spec, port) = {
                    let node_ref = &ctx.nodes[self.node.index()];
                    let port = node_ref.ports.first().copied().unwrap_or(1);
                    match &node_ref.kind {
                        NodeKind::SinglePacket(packet) => (
                            FrameSpec::new(
                                packet.destination.clone(),
                                packet.payload,
                                packet.priority,
                            ),
                            port,
                        ),
                        _ => unreachable!("single-packet worker on a different node kind"),
                    }
                };
                let frame = node::emit_frame(ctx, self.node, &spec)?;
                let handle = ctx.pop(self.node, frame, port, 0, false)?;
                self.phase = SingleShotPhase::Sent;
                Ok(Step::Wait(ctx.kernel.completion_event(handle)))
            }
            SingleShotPhase::Sent => Ok(Step::Done),
        }
    }
}
