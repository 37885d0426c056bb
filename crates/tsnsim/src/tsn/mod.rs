// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Time-sensitive networking mechanisms of the output port: priority to
//! traffic-class mapping, transmission selection algorithms (Strict
//! Priority, Credit-Based Shaper) and the per-port multi-queue buffer.

mod port_buffer;
mod priority_map;
mod selector;

pub use port_buffer::{BufferLog, LogEntry};
pub use priority_map::PriorityMap;
pub use selector::TsaKind;

pub(crate) use port_buffer::PortBuffer;
pub(crate) use selector::Selector;

use crate::topology::BuildError;

/// Egress configuration of one switch port: the priority map, the
/// transmission selection algorithm per traffic class and the CBS
/// bandwidth share per traffic class.
#[derive(Debug, Clone)]
pub struct SwitchPortParam {
    pub(crate) priority_map: PriorityMap,
    tsa: Vec<TsaKind>,
    delta_bandwidth: Vec<f64>,
    pub(crate) queue_capacity: Option<usize>,
}

impl SwitchPortParam {
    /// Parameters for a port carrying `available_traffic_classes` classes,
    /// all strict priority.
    pub fn new(available_traffic_classes: usize) -> Result<Self, BuildError> {
        let priority_map = PriorityMap::new(available_traffic_classes)?;
        Ok(Self {
            priority_map,
            tsa: vec![TsaKind::StrictPriority; available_traffic_classes],
            delta_bandwidth: vec![0.0; available_traffic_classes],
            queue_capacity: None,
        })
    }

    /// Number of traffic classes on this port.
    #[must_use]
    pub fn available_traffic_classes(&self) -> usize {
        self.tsa.len()
    }

    /// Override the priority map for one priority.
    pub fn map_priority(&mut self, priority: u8, traffic_class: usize) -> Result<(), BuildError> {
        self.priority_map.set(priority, traffic_class)
    }

    /// Select the transmission selection algorithm of a traffic class.
    pub fn set_tsa(&mut self, traffic_class: usize, kind: TsaKind) -> Result<(), BuildError> {
        let slot = self
            .tsa
            .get_mut(traffic_class)
            .ok_or(BuildError::InvalidTrafficClass {
                class: traffic_class,
                available: self.delta_bandwidth.len(),
            })?;
        *slot = kind;
        Ok(())
    }

    /// Bound the total queue occupancy of the port. Frames arriving at
    /// a full port are appended and immediately dropped (tail drop),
    /// which keeps the append/pop/drop accounting balanced.
    pub fn set_queue_capacity(&mut self, capacity: usize) {
        self.queue_capacity = Some(capacity);
    }

    /// Fraction of the port rate reserved for a CBS traffic class.
    pub fn set_delta_bandwidth(
        &mut self,
        traffic_class: usize,
        delta: f64,
    ) -> Result<(), BuildError> {
        if !(0.0..=1.0).contains(&delta) {
            return Err(BuildError::InvalidDeltaBandwidth(delta));
        }
        let available = self.delta_bandwidth.len();
        let slot = self
            .delta_bandwidth
            .get_mut(traffic_class)
            .ok_or(BuildError::InvalidTrafficClass {
                class: traffic_class,
                available,
            })?;
        *slot = delta;
        Ok(())
    }

    /// Instantiate the selector per traffic class for a port of the given
    /// rate (bits/µs).
    pub(crate) fn build_selectors(&self, port_rate: f64) -> Vec<Selector> {
        self.tsa
            .iter()
            .zip(&self.delta_bandwidth)
            .map(|(kind, delta)| match kind {
                TsaKind::StrictPriority => Selector::strict(),
                TsaKind::CreditBasedShaper => Selector::cbs(*delta, port_rate),
            })
            .collect()
    }
}

impl Default for SwitchPortParam {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_TRAFFIC_CLASSES).expect("default class count is valid")
    }
}
