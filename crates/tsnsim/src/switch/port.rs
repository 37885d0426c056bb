// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The per-port transmission engine.
//!
//! One cooperative process per switch output port. The engine asks the
//! port buffer for the next eligible frame, transmits it over the
//! channel and sleeps when nothing is eligible. Ingress arrivals
//! interrupt the engine, which always re-peeks before deciding anything.
//!
//! The preemptive variant may pause the transmission in flight when the
//! re-peek names a different frame: the paused send is parked in a
//! pending set (the frame also stays in its queue for re-selection) and
//! resumed later, paying the preemption penalty. A pause request whose
//! remaining time is inside the guard band is dropped silently.
//!
//! A port whose classes are all gated (CBS credit below zero) despite
//! queued frames sleeps until the earliest credit-recovery instant
//! instead of waiting for the next arrival, so a lone shaped class
//! cannot stall.

use std::collections::HashMap;

use crate::core::{Cause, ProcessId, Result, SimError, Step, Wake};
use crate::frame::FrameId;
use crate::node::{NodeId, NodeKind};
use crate::sim::Ctx;
use crate::topology::PortId;
use crate::tsn::PortBuffer;

#[derive(Debug, Clone, Copy)]
struct CurrentSend {
    frame: FrameId,
    handle: ProcessId,
}

/// Engine state of one output port.
#[derive(Debug)]
pub(crate) struct PortEngine {
    node: NodeId,
    port: PortId,
    preemption: bool,
    current: Option<CurrentSend>,
    /// Paused transmissions, keyed by frame. A paused frame is
    /// simultaneously here and in its traffic-class queue until
    /// re-selected.
    pending: HashMap<FrameId, ProcessId>,
    /// Parked on the current send's completion (as opposed to a sleep or
    /// credit-recovery timeout).
    in_transmission: bool,
}

impl PortEngine {
    pub(crate) fn new(node: NodeId, port: PortId, preemption: bool) -> Self {
        Self {
            node,
            port,
            preemption,
            current: None,
            pending: HashMap::new(),
            in_transmission: false,
        }
    }

    fn with_buffer<R>(&self, ctx: &mut Ctx<'_>, f: impl FnOnce(&mut PortBuffer, f64) -> R) -> R {
        let now = ctx.kernel.now();
        match &mut ctx.nodes[self.node.index()].kind {
            NodeKind::Switch(switch) => {
                let module = switch
                    .ports
                    .get_mut(&self.port)
                    .expect("engine runs on a wired port");
                f(&mut module.buffer, now)
            }
            _ => unreachable!("port engine on a non-switch node"),
        }
    }

    pub(crate) fn resume(&mut self, ctx: &mut Ctx<'_>, wake: Wake) -> Result<Step> {
        match wake {
            Wake::Fired => {
                if self.in_transmission {
                    self.finish_current(ctx)?;
                }
                // Otherwise: woken from the sleep or credit-recovery
                // timeout; fall through and re-peek.
            }
            Wake::Interrupt(_) => {
                if self.preemption {
                    self.try_preempt(ctx)?;
                }
                // The non-preemptive engine reacts to arrivals purely by
                // re-running its selection loop.
            }
        }
        self.advance(ctx)
    }

    /// The current transmission completed: settle the buffer accounting.
    fn finish_current(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        self.in_transmission = false;
        let Some(current) = self.current else {
            return Ok(());
        };
        if !ctx.kernel.process_completed(current.handle) {
            return Ok(());
        }
        let priority = ctx.frames.get(current.frame).priority();
        self.with_buffer(ctx, |buffer, now| {
            buffer.transmission_done(now, current.frame, priority)
        })?;
        self.pending.remove(&current.frame);
        if ctx.config.verbose {
            log::debug!(
                "{:.2}: {}: {} sent on port {}",
                ctx.kernel.now(),
                ctx.nodes[self.node.index()].address,
                ctx.frames.get(current.frame),
                self.port
            );
        }
        Ok(())
    }

    /// Selection loop. Runs until the engine has something to park on.
    fn advance(&mut self, ctx: &mut Ctx<'_>) -> Result<Step> {
        loop {
            if let Some(current) = self.current {
                if ctx.kernel.process_completed(current.handle) {
                    // Line is free again: select the next frame.
                    match self.with_buffer(ctx, |buffer, now| buffer.peek_next_frame(now)) {
                        Some(next) => self.acquire(ctx, next)?,
                        None => self.current = None,
                    }
                } else {
                    let priority = ctx.frames.get(current.frame).priority();
                    self.with_buffer(ctx, |buffer, now| {
                        buffer.transmission_start(now, priority);
                    });
                    self.in_transmission = true;
                    return Ok(Step::Wait(ctx.kernel.completion_event(current.handle)));
                }
            } else if !self.with_buffer(ctx, |buffer, _| buffer.is_empty()) {
                match self.with_buffer(ctx, |buffer, now| buffer.peek_next_frame(now)) {
                    Some(next) => self.acquire(ctx, next)?,
                    // Frames queued but every class gated: sleep until
                    // the earliest credit recovery.
                    None => return self.sleep_gated(ctx),
                }
            } else {
                self.in_transmission = false;
                return Ok(Step::Wait(ctx.kernel.sleep_event()));
            }
        }
    }

    /// Make `frame` the current transmission: resume its paused sender
    /// if it has one, otherwise spawn a fresh send. `extra_bytes` is paid
    /// on fresh sends only (the preempt path charges the resync penalty).
    fn acquire_with_extra(
        &mut self,
        ctx: &mut Ctx<'_>,
        frame: FrameId,
        extra_bytes: u32,
    ) -> Result<()> {
        if self.preemption {
            if let Some(&handle) = self.pending.get(&frame) {
                ctx.kernel.interrupt(handle, Cause::ContinueSending);
                if ctx.config.verbose {
                    log::debug!(
                        "{:.2}: {}: {} continued on port {}",
                        ctx.kernel.now(),
                        ctx.nodes[self.node.index()].address,
                        ctx.frames.get(frame),
                        self.port
                    );
                }
                self.current = Some(CurrentSend { frame, handle });
                return Ok(());
            }
            let handle = ctx.pop(self.node, frame, self.port, extra_bytes, true)?;
            self.current = Some(CurrentSend { frame, handle });
        } else {
            let handle = ctx.pop(self.node, frame, self.port, 0, false)?;
            self.current = Some(CurrentSend { frame, handle });
        }
        Ok(())
    }

    fn acquire(&mut self, ctx: &mut Ctx<'_>, frame: FrameId) -> Result<()> {
        self.acquire_with_extra(ctx, frame, 0)
    }

    /// Interrupt arrived mid-transmission: re-peek and, if a different
    /// frame now ranks first and the guard band allows it, pause the
    /// current send in favour of the newcomer.
    fn try_preempt(&mut self, ctx: &mut Ctx<'_>) -> Result<()> {
        let Some(current) = self.current else {
            return Ok(());
        };
        if !self.in_transmission || ctx.kernel.process_completed(current.handle) {
            return Ok(());
        }
        let Some(next) = self.with_buffer(ctx, |buffer, now| buffer.peek_next_frame(now)) else {
            return Ok(());
        };
        if next == current.frame {
            return Ok(());
        }
        let now = ctx.kernel.now();
        let interruptable = ctx
            .kernel
            .send_inspector(current.handle)
            .ok_or(SimError::MissingInspector)?
            .process_interruptable(now);
        if !interruptable {
            // Too close to completion; the request is dropped silently.
            return Ok(());
        }

        self.pending.insert(current.frame, current.handle);
        ctx.kernel.interrupt(current.handle, Cause::StopSending);
        let priority = ctx.frames.get(current.frame).priority();
        self.with_buffer(ctx, |buffer, now| {
            buffer.transmission_pause(now, priority);
        });
        if ctx.config.verbose {
            log::debug!(
                "{:.2}: {}: {} stopped on port {}",
                now,
                ctx.nodes[self.node.index()].address,
                ctx.frames.get(current.frame),
                self.port
            );
        }
        self.in_transmission = false;
        let penalty = ctx.config.preemption_penalty_bytes;
        self.acquire_with_extra(ctx, next, penalty)
    }

    /// Nothing eligible although frames are queued: wait for credit to
    /// recover, or for the next arrival if no class can recover on its
    /// own.
    fn sleep_gated(&mut self, ctx: &mut Ctx<'_>) -> Result<Step> {
        self.in_transmission = false;
        let recovery = self.with_buffer(ctx, |buffer, _| buffer.credit_recovery_in());
        match recovery {
            Some(delay) => Ok(Step::Wait(ctx.kernel.timeout(delay))),
            None => Ok(Step::Wait(ctx.kernel.sleep_event())),
        }
    }
}
