// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Frame transmission over a link.
//!
//! A transmission is a cooperative process with states Sending, Paused
//! and Done. The sending time of a frame is
//! `((total_size + extra_bytes) * 8) / bandwidth + propagation_delay`.
//! An interrupt while sending pauses the transmission and freezes the
//! remaining time; an interrupt while paused resumes it, paying the
//! preemption penalty bytes for the resync sequence on the wire.
//!
//! Pausing a transmission that was spawned without an inspector is a
//! protocol error: without the inspector's `finish_time` the port engine
//! cannot rule out interrupting a send in the same instant it completes.

use crate::core::{SimError, Step, Wake};
use crate::frame::FrameId;
use crate::node::{self, Ingress, NodeId};
use crate::sim::Ctx;
use crate::topology::PortId;

/// Auxiliary handle onto an in-flight transmission, consulted by the
/// preemptive port engine before pausing it.
#[derive(Debug, Clone)]
pub struct SendInspector {
    bandwidth: f64,
    min_preemption_bytes: u32,
    penalty_bytes: u32,
    /// Virtual instant the transmission will complete; negative while the
    /// transmission is paused.
    pub(crate) finish_time: f64,
}

impl SendInspector {
    pub(crate) fn new(bandwidth: f64, min_preemption_bytes: u32, penalty_bytes: u32) -> Self {
        Self {
            bandwidth,
            min_preemption_bytes,
            penalty_bytes,
            finish_time: 0.0,
        }
    }

    /// Extra transmission time paid when the paused frame resumes.
    #[must_use]
    pub(crate) fn penalty_time(&self) -> f64 {
        f64::from(self.penalty_bytes) * 8.0 / self.bandwidth
    }

    /// Whether the transmission may legally be paused right now.
    ///
    /// True when already paused, or when more than `min_preemption_bytes`
    /// would still be outstanding after the penalty. In particular this
    /// rejects pausing a transmission that completes at this very
    /// instant.
    #[must_use]
    pub fn process_interruptable(&self, now: f64) -> bool {
        if self.finish_time < 0.0 {
            return true;
        }
        let bytes_left = (self.finish_time - now) * self.bandwidth / 8.0;
        bytes_left - f64::from(self.penalty_bytes) > f64::from(self.min_preemption_bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendPhase {
    /// Spawned, first resumption pending.
    Init,
    Sending,
    Paused,
}

/// The sending process of one frame on one link.
#[derive(Debug)]
pub(crate) struct SendProcess {
    frame: FrameId,
    sender: NodeId,
    receiver: NodeId,
    ingress_port: PortId,
    /// Transmission time still outstanding, in µs.
    remaining: f64,
    /// Instant the current sending stretch began.
    start_time: f64,
    phase: SendPhase,
    inspector: Option<SendInspector>,
}

impl SendProcess {
    pub(crate) fn new(
        frame: FrameId,
        sender: NodeId,
        receiver: NodeId,
        ingress_port: PortId,
        sending_time: f64,
        inspector: Option<SendInspector>,
    ) -> Self {
        Self {
            frame,
            sender,
            receiver,
            ingress_port,
            remaining: sending_time,
            start_time: 0.0,
            phase: SendPhase::Init,
            inspector,
        }
    }

    pub(crate) fn inspector(&self) -> Option<&SendInspector> {
        self.inspector.as_ref()
    }

    pub(crate) fn resume(&mut self, ctx: &mut Ctx<'_>, wake: Wake) -> Result<Step, SimError> {
        let now = ctx.kernel.now();
        match (self.phase, wake) {
            (SendPhase::Init, _) => {
                self.start_time = now;
                if let Some(inspector) = self.inspector.as_mut() {
                    inspector.finish_time = now + self.remaining;
                }
                self.phase = SendPhase::Sending;
                Ok(Step::Wait(ctx.kernel.timeout(self.remaining)))
            }
            (SendPhase::Sending, Wake::Fired) => {
                self.remaining = 0.0;
                node::deliver(ctx, self.receiver, self.frame, Ingress::Port(self.ingress_port))?;
                let sender_address = ctx.nodes[self.sender.index()].address().clone();
                let receiver_address = ctx.nodes[self.receiver.index()].address().clone();
                let frame = ctx.frames.get_mut(self.frame);
                frame.record_hop(&sender_address, &receiver_address, now);
                if frame.destination() == &receiver_address {
                    frame.record_destination_reached(now);
                }
                Ok(Step::Done)
            }
            (SendPhase::Sending, Wake::Interrupt(_)) => {
                let inspector = self.inspector.as_mut().ok_or(SimError::MissingInspector)?;
                self.remaining -= now - self.start_time;
                inspector.finish_time = -1.0;
                self.phase = SendPhase::Paused;
                Ok(Step::Wait(ctx.kernel.sleep_event()))
            }
            (SendPhase::Paused, Wake::Interrupt(_)) => {
                let inspector = self.inspector.as_mut().ok_or(SimError::MissingInspector)?;
                self.start_time = now;
                // The resumed fragment re-announces itself on the wire.
                self.remaining += inspector.penalty_time();
                inspector.finish_time = now + self.remaining;
                self.phase = SendPhase::Sending;
                Ok(Step::Wait(ctx.kernel.timeout(self.remaining)))
            }
            (SendPhase::Paused, Wake::Fired) => {
                // The sleep event never fires; stay paused.
                Ok(Step::Wait(ctx.kernel.sleep_event()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interruptable_with_plenty_left() {
        let mut inspector = SendInspector::new(10.0, 1, 0);
        inspector.finish_time = 1_000.0;
        // 1000 µs left at 10 b/µs = 1250 bytes outstanding.
        assert!(inspector.process_interruptable(0.0));
    }

    #[test]
    fn test_not_interruptable_at_completion_instant() {
        let mut inspector = SendInspector::new(10.0, 1, 0);
        inspector.finish_time = 100.0;
        assert!(!inspector.process_interruptable(100.0));
    }

    #[test]
    fn test_paused_is_always_interruptable() {
        let mut inspector = SendInspector::new(10.0, 80, 8);
        inspector.finish_time = -1.0;
        assert!(inspector.process_interruptable(123.0));
    }

    #[test]
    fn test_guard_band_respects_penalty() {
        let mut inspector = SendInspector::new(10.0, 80, 8);
        // 100 bytes outstanding, penalty 8: 92 > 80 holds.
        inspector.finish_time = 80.0;
        assert!(inspector.process_interruptable(0.0));
        // 88 bytes outstanding, penalty 8: exactly 80, not above.
        inspector.finish_time = 70.4;
        assert!(!inspector.process_interruptable(0.0));
    }

    #[test]
    fn test_penalty_time() {
        let inspector = SendInspector::new(10.0, 80, 8);
        assert!((inspector.penalty_time() - 6.4).abs() < 1e-12);
    }
}
