// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # tsnsim - Time-Sensitive Networking simulator
//!
//! A discrete-event simulator for store-and-forward packet-switched
//! networks modelled after IEEE 802.1Q bridged LANs, including frame
//! preemption and the Credit-Based Shaper per traffic class. It computes
//! queueing statistics (latency distributions, waiting times, queue
//! occupancy) under synthetic traffic loads.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tsnsim::{LinkSpec, SimConfig, Simulation, SwitchConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut sim = Simulation::new(SimConfig::named("single-hop", 42));
//!     let talker = sim.add_single_packet("talker", "listener", 0, 0.0, 0, true)?;
//!     let bridge = sim.add_switch("bridge", SwitchConfig::default(), true)?;
//!     let listener = sim.add_sink("listener")?;
//!     sim.connect_nodes(talker, bridge, LinkSpec::default())?;
//!     sim.connect_nodes(bridge, listener, LinkSpec::default())?;
//!     sim.run_until(1_000.0)?;
//!
//!     for (address, results) in tsnsim::monitor::results(&sim) {
//!         println!("{address}: {results:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                        Scenario / Campaign                         |
//! |      builder API | multi-run driver | CSV/JSON export              |
//! +--------------------------------------------------------------------+
//! |                          Switch Layer                              |
//! |  learning bridge | port engines (preemptive) | port buffers        |
//! +--------------------------------------------------------------------+
//! |                           TSN Layer                                |
//! |  priority map | Strict Priority | Credit-Based Shaper              |
//! +--------------------------------------------------------------------+
//! |                        Channel / Kernel                            |
//! |  timed transmission with suspend/resume | virtual-time scheduler   |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Simulation`] | One simulation run: kernel, nodes, frames, topology |
//! | [`SimConfig`] | Name, seed, preemption parameters, channel types |
//! | [`SwitchConfig`] | Aging time and preemption mode of a bridge |
//! | [`SwitchPortParam`] | Priority map, TSA and CBS share per egress port |
//! | [`Generator`] | Lazy value source driving synthetic traffic |
//!
//! ## Units
//!
//! Time is virtual and counted in microseconds; bandwidth in bits/µs
//! (numerically Mb/s); sizes in bytes; propagation speeds in m/µs.
//!
//! ## Determinism
//!
//! A simulation with a fixed seed produces a byte-identical monitored
//! event sequence on every run: the kernel fires same-instant events in
//! scheduling order and every random draw flows through the simulation's
//! own RNG.

/// Multi-run campaigns, confidence intervals, CSV/JSON export.
pub mod campaign;
/// Frame transmission over links (suspend/resume state machine).
pub mod channel;
/// Physical constants and per-simulation configuration.
pub mod config;
/// Discrete-event kernel: virtual clock, events, cooperative processes.
pub mod core;
/// Frames, headers and hop traces.
pub mod frame;
/// Lazy generators for synthetic traffic.
pub mod generators;
/// Monitor tables and per-run statistics.
pub mod monitor;
/// Network nodes: sources, sinks, injectors.
pub mod node;
/// The simulation facade and builder API.
pub mod sim;
/// The learning bridge and its port engines.
pub mod switch;
/// Node addresses and connection tables.
pub mod topology;
/// Priority maps, transmission selection, port buffers.
pub mod tsn;

pub use crate::core::{EventId, SimError};
pub use config::SimConfig;
pub use frame::{Frame, FrameId, Header};
pub use generators::{Exponential, FrameSpec, Generator, Limited, SimRng, Static, Uniform};
pub use node::NodeId;
pub use sim::{LinkSpec, Simulation};
pub use switch::SwitchConfig;
pub use topology::{Address, BuildError, PortId};
pub use tsn::{PriorityMap, SwitchPortParam, TsaKind};
