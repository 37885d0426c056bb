// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Priority to traffic-class mapping (IEEE 802.1Q-2018, table 8-5).
//!
//! An 8x8 table maps `(available traffic classes - 1, priority)` to a
//! traffic class index. Row `T - 1` is used by a port carrying `T`
//! classes; with one class every priority lands in class 0.

use crate::topology::BuildError;

/// The standard recommendation of 802.1Q section 8.6.6. Row = available
/// traffic classes - 1, column = frame priority.
const DEFAULT_MAP: [[u8; 8]; 8] = [
    [0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 0, 0, 1, 1, 1, 1],
    [0, 0, 0, 0, 1, 1, 2, 2],
    [0, 0, 1, 1, 2, 2, 3, 3],
    [0, 0, 1, 1, 2, 2, 3, 4],
    [1, 0, 2, 2, 3, 3, 4, 5],
    [1, 0, 2, 3, 4, 4, 5, 6],
    [1, 0, 2, 3, 4, 5, 6, 7],
];

/// Mapping from 3-bit frame priorities to traffic classes for one port.
#[derive(Debug, Clone)]
pub struct PriorityMap {
    available: usize,
    map: [[u8; 8]; 8],
}

impl PriorityMap {
    /// Standard map for a port carrying `available_traffic_classes`
    /// classes.
    pub fn new(available_traffic_classes: usize) -> Result<Self, BuildError> {
        if !(1..=8).contains(&available_traffic_classes) {
            return Err(BuildError::InvalidTrafficClassCount(
                available_traffic_classes,
            ));
        }
        Ok(Self {
            available: available_traffic_classes,
            map: DEFAULT_MAP,
        })
    }

    /// Number of traffic classes this map targets.
    #[must_use]
    pub fn available_traffic_classes(&self) -> usize {
        self.available
    }

    /// Traffic class of a frame priority.
    #[must_use]
    pub fn traffic_class(&self, priority: u8) -> usize {
        usize::from(self.map[self.available - 1][usize::from(priority & 0x7)])
    }

    /// Override one priority's class at configuration time.
    pub fn set(&mut self, priority: u8, traffic_class: usize) -> Result<(), BuildError> {
        if priority > 7 {
            return Err(BuildError::InvalidPriority(priority));
        }
        if traffic_class >= self.available {
            return Err(BuildError::InvalidTrafficClass {
                class: traffic_class,
                available: self.available,
            });
        }
        self.map[self.available - 1][usize::from(priority)] =
            u8::try_from(traffic_class).expect("traffic class fits u8");
        Ok(())
    }
}

impl Default for PriorityMap {
    fn default() -> Self {
        Self::new(8).expect("8 classes is valid")
    }
}
