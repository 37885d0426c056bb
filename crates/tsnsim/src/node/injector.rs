// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Side-channel frame injector.
//!
//! An injector bypasses the channel entirely: it pushes generated frames
//! straight into a target node's ingress, then sleeps for
//! `intensity * frame_transmit_time`, with the intensity factor drawn
//! from its second generator. An intensity of 1 saturates the pretended
//! bandwidth; larger factors thin the load out. The worker halts the
//! simulation when either generator runs dry.

use crate::core::{Result, Step, Wake};
use crate::node::{self, Ingress, NodeId, NodeKind};
use crate::sim::Ctx;

#[derive(Debug)]
pub(crate) struct InjectorWorker {
    node: NodeId,
    started: bool,
}

impl InjectorWorker {
    pub(crate) fn new(node: NodeId) -> Self {
        Self {
            node,
            started: false,
        }
    }

    pub(crate) fn resume(&mut self, ctx: &mut Ctx<'_>, _wake: Wake) -> Result<Step> {
        if !self.started {
            self.started = true;
            let start_at = match &ctx.nodes[self.node.index()].kind {
                NodeKind::Injector(injector) => injector.start_at,
                _ => 0.0,
            };
            if start_at > 0.0 {
                return Ok(Step::Wait(ctx.kernel.timeout(start_at)));
            }
        }
        let Some(spec) = node::next_frame_spec(ctx, self.node) else {
            ctx.request_stop();
            return Ok(Step::Done);
        };
        let frame = node::emit_frame(ctx, self.node, &spec)?;

        let target = match &ctx.nodes[self.node.index()].kind {
            NodeKind::Injector(injector) => injector.target,
            _ => unreachable!("injector worker on a different node kind"),
        };
        node::deliver(ctx, target, frame, Ingress::Injected)?;

        let (intensity, bandwidth) = {
            let nodes = &mut *ctx.nodes;
            let rng = &mut *ctx.rng;
            match &mut nodes[self.node.index()].kind {
                NodeKind::Injector(injector) => {
                    (injector.intensity.next_value(rng), injector.bandwidth)
                }
                _ => unreachable!(),
            }
        };
        let Some(intensity) = intensity else {
            ctx.request_stop();
            return Ok(Step::Done);
        };

        let transmit_time = ctx.frames.get(frame).total_size() as f64 * 8.0 / bandwidth;
        Ok(Step::Wait(ctx.kernel.timeout(intensity * transmit_time)))
    }
}
