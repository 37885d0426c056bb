// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-port multi-queue buffer.
//!
//! Thin aggregator over the traffic-class selectors of one output port:
//! routes appends through the priority map, answers the "next frame to
//! send" query by scanning classes from the highest index down, and is
//! the sole mutation authority for the per-class queues. Monitored ports
//! additionally log every append/pop/drop with the instant and queue
//! length.

use crate::core::SimError;
use crate::frame::FrameId;

use super::selector::Selector;
use super::SwitchPortParam;

/// One monitor log record: `(time, queue length, frame)`.
///
/// Appends log the length *after* insertion; pops and drops log the
/// length *before* removal.
#[derive(Debug, Clone, Copy)]
pub struct LogEntry {
    pub time: f64,
    pub queue_len: usize,
    pub frame: FrameId,
}

/// Append/pop/drop history of a monitored port.
#[derive(Debug, Default)]
pub struct BufferLog {
    pub append: Vec<LogEntry>,
    pub pop: Vec<LogEntry>,
    pub drop: Vec<LogEntry>,
    /// Largest queue length observed.
    pub max_queue_len: usize,
}

/// The multi-queue buffer of one switch output port.
#[derive(Debug)]
pub(crate) struct PortBuffer {
    selectors: Vec<Selector>,
    param: SwitchPortParam,
    log: Option<BufferLog>,
}

impl PortBuffer {
    pub(crate) fn new(port_rate: f64, param: SwitchPortParam, monitored: bool) -> Self {
        Self {
            selectors: param.build_selectors(port_rate),
            param,
            log: monitored.then(BufferLog::default),
        }
    }

    fn class_of(&self, priority: u8) -> usize {
        self.param.priority_map.traffic_class(priority)
    }

    /// Enqueue a frame into its traffic class.
    pub(crate) fn append_frame(&mut self, now: f64, frame: FrameId, priority: u8) {
        let class = self.class_of(priority);
        self.selectors[class].append_frame(now, frame);
        let queue_len = self.len();
        if let Some(log) = self.log.as_mut() {
            log.append.push(LogEntry {
                time: now,
                queue_len,
                frame,
            });
            log.max_queue_len = log.max_queue_len.max(queue_len);
        }
    }

    /// Remove a dropped frame from its class.
    pub(crate) fn drop_frame(&mut self, now: f64, frame: FrameId, priority: u8) -> Result<(), SimError> {
        let queue_len = self.len();
        if let Some(log) = self.log.as_mut() {
            log.drop.push(LogEntry {
                time: now,
                queue_len,
                frame,
            });
        }
        let class = self.class_of(priority);
        self.selectors[class].remove_frame(now, frame)
    }

    /// A frame of the given priority starts occupying the line.
    pub(crate) fn transmission_start(&mut self, now: f64, priority: u8) {
        let class = self.class_of(priority);
        self.selectors[class].set_transmitting(now, true);
    }

    /// The frame in flight was preempted; its class stops occupying the
    /// line but the frame stays queued for re-selection.
    pub(crate) fn transmission_pause(&mut self, now: f64, priority: u8) {
        let class = self.class_of(priority);
        self.selectors[class].set_transmitting(now, false);
    }

    /// The frame left the port: stop the class, dequeue, log the pop.
    pub(crate) fn transmission_done(
        &mut self,
        now: f64,
        frame: FrameId,
        priority: u8,
    ) -> Result<(), SimError> {
        let class = self.class_of(priority);
        self.selectors[class].set_transmitting(now, false);
        let queue_len = self.len();
        if let Some(log) = self.log.as_mut() {
            log.pop.push(LogEntry {
                time: now,
                queue_len,
                frame,
            });
        }
        self.selectors[class].remove_frame(now, frame)
    }

    /// Transmission selection: the first eligible head-of-queue, scanning
    /// traffic classes from the highest index down. `None` when every
    /// class is empty or gated.
    pub(crate) fn peek_next_frame(&mut self, now: f64) -> Option<FrameId> {
        for class in (0..self.selectors.len()).rev() {
            if let Some(frame) = self.selectors[class].get_frame(now) {
                return Some(frame);
            }
        }
        None
    }

    /// Earliest instant (as a delay from now) at which some gated CBS
    /// class with queued frames recovers eligibility on its own.
    pub(crate) fn credit_recovery_in(&self) -> Option<f64> {
        self.selectors
            .iter()
            .filter_map(Selector::recovery_in)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// True when a bounded port holds more frames than its capacity
    /// allows; the arriving frame is then tail-dropped.
    pub(crate) fn over_capacity(&self) -> bool {
        self.param
            .queue_capacity
            .is_some_and(|capacity| self.len() > capacity)
    }

    /// Total frames queued across all classes.
    pub(crate) fn len(&self) -> usize {
        self.selectors.iter().map(Selector::len).sum()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Traffic class a priority maps to on this port.
    pub(crate) fn traffic_class(&self, priority: u8) -> usize {
        self.class_of(priority)
    }

    /// Monitor log, if this port is monitored.
    pub(crate) fn log(&self) -> Option<&BufferLog> {
        self.log.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tsn::TsaKind;

    fn frame(n: u32) -> FrameId {
        FrameId(n)
    }

    #[test]
    fn test_append_routes_by_priority_map() {
        let param = SwitchPortParam::new(8).unwrap();
        let mut buffer = PortBuffer::new(10.0, param, false);
        buffer.append_frame(0.0, frame(1), 0);
        buffer.append_frame(0.0, frame(2), 7);
        // Class 7 outranks class 1 in the scan.
        assert_eq!(buffer.peek_next_frame(0.0), Some(frame(2)));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_peek_skips_gated_cbs_class() {
        let mut param = SwitchPortParam::new(8).unwrap();
        param.set_tsa(7, TsaKind::CreditBasedShaper).unwrap();
        param.set_delta_bandwidth(7, 0.1).unwrap();
        let mut buffer = PortBuffer::new(10.0, param, false);

        buffer.append_frame(0.0, frame(1), 7);
        buffer.append_frame(0.0, frame(2), 0);
        assert_eq!(buffer.peek_next_frame(0.0), Some(frame(1)));

        // Drain class 7's credit; the scan falls through to class 1.
        buffer.transmission_start(0.0, 7);
        buffer.transmission_pause(50.0, 7);
        assert_eq!(buffer.peek_next_frame(50.0), Some(frame(2)));
        assert!(buffer.credit_recovery_in().is_some());
    }

    #[test]
    fn test_done_pops_and_logs() {
        let param = SwitchPortParam::new(8).unwrap();
        let mut buffer = PortBuffer::new(10.0, param, true);
        buffer.append_frame(1.0, frame(1), 5);
        buffer.transmission_start(1.0, 5);
        buffer.transmission_done(9.0, frame(1), 5).unwrap();

        assert!(buffer.is_empty());
        let log = buffer.log().unwrap();
        assert_eq!(log.append.len(), 1);
        assert_eq!(log.append[0].queue_len, 1);
        assert_eq!(log.pop.len(), 1);
        // Pops record the length before removal.
        assert_eq!(log.pop[0].queue_len, 1);
        assert_eq!(log.max_queue_len, 1);
    }

    #[test]
    fn test_drop_removes_from_class() {
        let param = SwitchPortParam::new(8).unwrap();
        let mut buffer = PortBuffer::new(10.0, param, true);
        buffer.append_frame(0.0, frame(1), 3);
        buffer.drop_frame(2.0, frame(1), 3).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.log().unwrap().drop.len(), 1);
    }
}
