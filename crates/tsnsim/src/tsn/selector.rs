// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transmission selection algorithms.
//!
//! One selector per traffic class per port. Strict Priority releases the
//! head of its FIFO whenever the class is scanned; the Credit-Based
//! Shaper additionally gates on a credit counter:
//!
//! - credit accrues at `idle_slope = delta_bandwidth * port_rate` while
//!   the class is not transmitting,
//! - credit drains at `send_slope = idle_slope - port_rate` (negative)
//!   during transmission,
//! - a class with an empty queue cannot hoard positive credit,
//! - the class may transmit iff `credit >= 0`.

use std::collections::VecDeque;

use crate::core::SimError;
use crate::frame::FrameId;

/// Which transmission selection algorithm a traffic class runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TsaKind {
    #[default]
    StrictPriority,
    CreditBasedShaper,
}

/// Selector of one traffic class.
#[derive(Debug)]
pub(crate) enum Selector {
    Strict(StrictQueue),
    Cbs(CbsQueue),
}

impl Selector {
    pub(crate) fn strict() -> Self {
        Self::Strict(StrictQueue::default())
    }

    pub(crate) fn cbs(delta_bandwidth: f64, port_rate: f64) -> Self {
        Self::Cbs(CbsQueue::new(delta_bandwidth, port_rate))
    }

    pub(crate) fn append_frame(&mut self, now: f64, frame: FrameId) {
        match self {
            Self::Strict(q) => q.queue.push_back(frame),
            Self::Cbs(q) => {
                q.update_credit(now);
                q.queue.push_back(frame);
            }
        }
    }

    /// Head of the FIFO if the class is eligible to transmit right now.
    pub(crate) fn get_frame(&mut self, now: f64) -> Option<FrameId> {
        match self {
            Self::Strict(q) => q.queue.front().copied(),
            Self::Cbs(q) => {
                q.update_credit(now);
                if q.transmit_allowed {
                    q.queue.front().copied()
                } else {
                    None
                }
            }
        }
    }

    /// Record the class starting (`true`) or stopping (`false`) to occupy
    /// the line.
    pub(crate) fn set_transmitting(&mut self, now: f64, status: bool) {
        match self {
            Self::Strict(_) => {}
            Self::Cbs(q) => {
                q.update_credit(now);
                q.transmit = status;
            }
        }
    }

    /// Remove `frame` by identity (transmission completed or dropped).
    pub(crate) fn remove_frame(&mut self, now: f64, frame: FrameId) -> Result<(), SimError> {
        let queue = match self {
            Self::Strict(q) => &mut q.queue,
            Self::Cbs(q) => {
                q.update_credit(now);
                &mut q.queue
            }
        };
        let position = queue
            .iter()
            .position(|f| *f == frame)
            .ok_or(SimError::FrameNotQueued(frame.as_u64()))?;
        queue.remove(position);
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Strict(q) => q.queue.len(),
            Self::Cbs(q) => q.queue.len(),
        }
    }

    /// Time until a gated CBS class becomes eligible again, if it can
    /// recover on its own. `None` for strict priority, eligible classes,
    /// classes without queued frames and classes with no idle slope.
    pub(crate) fn recovery_in(&self) -> Option<f64> {
        match self {
            Self::Strict(_) => None,
            Self::Cbs(q) => {
                if q.queue.is_empty() || q.transmit_allowed || q.transmit || q.idle_slope <= 0.0 {
                    None
                } else {
                    Some(-q.credit / q.idle_slope)
                }
            }
        }
    }

    /// Current credit, for diagnostics and tests. Strict priority has no
    /// credit state.
    #[cfg(test)]
    pub(crate) fn credit(&self) -> Option<f64> {
        match self {
            Self::Strict(_) => None,
            Self::Cbs(q) => Some(q.credit),
        }
    }
}

/// Strict Priority: nothing beyond the FIFO.
#[derive(Debug, Default)]
pub(crate) struct StrictQueue {
    queue: VecDeque<FrameId>,
}

/// Credit-Based Shaper state.
#[derive(Debug)]
pub(crate) struct CbsQueue {
    queue: VecDeque<FrameId>,
    credit: f64,
    last_update: f64,
    transmit: bool,
    transmit_allowed: bool,
    idle_slope: f64,
    send_slope: f64,
}

impl CbsQueue {
    fn new(delta_bandwidth: f64, port_rate: f64) -> Self {
        let idle_slope = delta_bandwidth * port_rate;
        Self {
            queue: VecDeque::new(),
            credit: 0.0,
            last_update: 0.0,
            transmit: false,
            transmit_allowed: true,
            idle_slope,
            send_slope: idle_slope - port_rate,
        }
    }

    /// Advance the credit to `now` under the current transmit state, then
    /// re-derive eligibility. Invariant afterwards:
    /// `transmit_allowed == (credit >= 0)`.
    fn update_credit(&mut self, now: f64) {
        let elapsed = now - self.last_update;
        if self.transmit {
            self.credit += elapsed * self.send_slope;
        } else {
            self.credit += elapsed * self.idle_slope;
        }
        if self.queue.is_empty() && self.credit > 0.0 && !self.transmit {
            self.credit = 0.0;
        }
        self.transmit_allowed = self.credit >= 0.0;
        self.last_update = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: u32) -> FrameId {
        FrameId(n)
    }

    #[test]
    fn test_strict_returns_head_in_fifo_order() {
        let mut selector = Selector::strict();
        selector.append_frame(0.0, frame(1));
        selector.append_frame(0.0, frame(2));
        assert_eq!(selector.get_frame(0.0), Some(frame(1)));
        selector.remove_frame(0.0, frame(1)).unwrap();
        assert_eq!(selector.get_frame(0.0), Some(frame(2)));
    }

    #[test]
    fn test_remove_missing_frame_is_an_error() {
        let mut selector = Selector::strict();
        assert_eq!(
            selector.remove_frame(0.0, frame(9)),
            Err(SimError::FrameNotQueued(9))
        );
    }

    #[test]
    fn test_cbs_drains_credit_while_transmitting() {
        // 25% of a 10 Mb/s port: idle 2.5 b/µs, send -7.5 b/µs.
        let mut selector = Selector::cbs(0.25, 10.0);
        selector.append_frame(0.0, frame(1));
        assert_eq!(selector.get_frame(0.0), Some(frame(1)));

        selector.set_transmitting(0.0, true);
        // 100 µs of transmission drains 750 bits of credit.
        selector.set_transmitting(100.0, false);
        assert_eq!(selector.credit(), Some(-750.0));
        assert_eq!(selector.get_frame(100.0), None);

        // Recovery at idle slope: 750 / 2.5 = 300 µs.
        assert_eq!(selector.recovery_in(), Some(300.0));
        assert_eq!(selector.get_frame(400.0), Some(frame(1)));
    }

    #[test]
    fn test_cbs_empty_queue_cannot_hoard_credit() {
        let mut selector = Selector::cbs(0.5, 10.0);
        // Nothing queued: credit pins at zero no matter how long we idle.
        assert_eq!(selector.get_frame(1_000.0), None);
        assert_eq!(selector.credit(), Some(0.0));

        selector.append_frame(1_000.0, frame(1));
        // With a frame queued the class is immediately eligible...
        assert_eq!(selector.get_frame(1_000.0), Some(frame(1)));
        // ...and accrues credit only from the moment of the append.
        assert_eq!(selector.get_frame(1_010.0), Some(frame(1)));
        assert_eq!(selector.credit(), Some(50.0));
    }

    #[test]
    fn test_cbs_transmit_allowed_iff_credit_non_negative() {
        let mut selector = Selector::cbs(0.1, 10.0);
        selector.append_frame(0.0, frame(1));
        selector.set_transmitting(0.0, true);
        selector.set_transmitting(10.0, false);
        // credit = 10 * (1.0 - 10.0) = -99
        assert_eq!(selector.credit(), Some(-99.0));
        assert_eq!(selector.get_frame(10.0), None);
        let recovery = selector.recovery_in().unwrap();
        assert!((recovery - 99.0).abs() < 1e-9);
    }
}
