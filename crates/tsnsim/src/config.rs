// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Simulation configuration - single source of truth.
//!
//! This module centralizes the physical constants and per-simulation
//! parameters. **Never hardcode these elsewhere!**
//!
//! # Units
//!
//! - Time: microseconds (`f64`)
//! - Bandwidth: bits per microsecond (numerically equal to Mb/s)
//! - Sizes: bytes
//! - Propagation speed: meters per microsecond

use std::collections::HashMap;

use serde::Deserialize;

/// Speed of light in vacuum, in m/µs.
pub const SPEED_OF_LIGHT_M_PER_US: f64 = 299.792;

/// Propagation factor of optical fiber (fraction of c).
pub const FIBER_FACTOR: f64 = 0.97;

/// Propagation factor of coaxial cable (fraction of c).
pub const COAX_FACTOR: f64 = 0.8;

/// Propagation factor of copper twisted pair (fraction of c).
pub const COPPER_FACTOR: f64 = 0.6;

/// Propagation factor of a radio link near ground (fraction of c).
pub const RADIO_FACTOR: f64 = 0.2;

/// Size of the standard Ethernet framing overhead in bytes
/// (preamble + SFD + MAC header + FCS + VLAN tag).
pub const ETHERNET_HEADER_BYTES: u32 = 26;

/// Tag attached to the default Ethernet header.
pub const ETHERNET_HEADER_TAG: &str = "ethernet";

/// Default link bandwidth in bits/µs (= Mb/s).
pub const DEFAULT_BANDWIDTH: f64 = 10.0;

/// Number of traffic classes a port carries unless configured otherwise.
pub const DEFAULT_TRAFFIC_CLASSES: usize = 8;

/// Highest valid frame priority (802.1Q PCP is a 3-bit field).
pub const MAX_PRIORITY: u8 = 7;

/// Minimum remaining bytes below which a running transmission may no
/// longer be preempted (express preemption guard band).
pub const DEFAULT_MIN_PREEMPTION_BYTES: u32 = 80;

/// Extra bytes transmitted when a preempted frame resumes on the wire
/// (fragment re-sync overhead).
pub const DEFAULT_PREEMPTION_PENALTY_BYTES: u32 = 8;

/// The standard channel-type table: medium name to propagation speed in
/// m/µs.
///
/// Scenario builders may pass their own table via [`SimConfig`]; this one
/// covers the common media.
#[must_use]
pub fn default_channel_types() -> HashMap<String, f64> {
    let mut table = HashMap::new();
    table.insert("fiber".to_string(), FIBER_FACTOR * SPEED_OF_LIGHT_M_PER_US);
    table.insert("coax".to_string(), COAX_FACTOR * SPEED_OF_LIGHT_M_PER_US);
    table.insert("copper".to_string(), COPPER_FACTOR * SPEED_OF_LIGHT_M_PER_US);
    table.insert("radio".to_string(), RADIO_FACTOR * SPEED_OF_LIGHT_M_PER_US);
    table
}

/// Per-simulation configuration.
///
/// `min_preemption_bytes` is clamped to at least 1 byte; a value of 1 makes
/// every non-trivial transmission preemptible.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Name of this simulation, carried into every monitor row.
    pub name: String,
    /// Index of this run within a campaign (1-based).
    pub run_index: u64,
    /// Seed of the simulation RNG. `None` seeds from entropy, which
    /// forfeits reproducibility.
    pub seed: Option<u64>,
    /// Emit per-event debug logging.
    pub verbose: bool,
    /// Minimum remaining bytes for a transmission to stay preemptible.
    pub min_preemption_bytes: u32,
    /// Resync overhead in bytes paid when a preempted frame resumes.
    pub preemption_penalty_bytes: u32,
    /// Channel-type table: medium name to propagation speed in m/µs.
    pub channel_types: HashMap<String, f64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "unnamed".to_string(),
            run_index: 1,
            seed: None,
            verbose: false,
            min_preemption_bytes: DEFAULT_MIN_PREEMPTION_BYTES,
            preemption_penalty_bytes: DEFAULT_PREEMPTION_PENALTY_BYTES,
            channel_types: default_channel_types(),
        }
    }
}

impl SimConfig {
    /// Configuration with a fixed seed and a name, the common case for
    /// reproducible experiments.
    #[must_use]
    pub fn named(name: &str, seed: u64) -> Self {
        Self {
            name: name.to_string(),
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Effective preemption guard band, never below one byte.
    #[must_use]
    pub fn min_preemption_bytes(&self) -> u32 {
        self.min_preemption_bytes.max(1)
    }
}
