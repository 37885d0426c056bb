// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::cast_precision_loss)] // Stats/metrics need this
#![allow(clippy::float_cmp)] // Test assertions with constants
#![allow(clippy::unreadable_literal)] // Large test constants
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! End-to-end scenarios over small topologies: single-hop delivery,
//! broadcast on unknown destinations, split-horizon discards, frame
//! preemption timing and learning-table aging.

use tsnsim::monitor::{self, Action};
use tsnsim::switch::SwitchConfig;
use tsnsim::{
    FrameSpec, Limited, LinkSpec, SimConfig, SimRng, Simulation, Static,
};

const TOLERANCE: f64 = 1e-9;

fn approx(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < TOLERANCE
}

/// One empty-payload frame through one switch at 10 Mb/s: 26 bytes of
/// header transmit in 20.8 µs per hop.
#[test]
fn test_single_hop_no_contention() {
    let mut sim = Simulation::new(SimConfig::named("single-hop", 1));
    let talker = sim
        .add_single_packet("talker", "listener", 0, 0.0, 0, true)
        .unwrap();
    let bridge = sim
        .add_switch("bridge", SwitchConfig::default(), true)
        .unwrap();
    let listener = sim.add_sink("listener").unwrap();
    sim.connect_nodes(talker, bridge, LinkSpec::default()).unwrap();
    sim.connect_nodes(bridge, listener, LinkSpec::default()).unwrap();
    sim.run_until(1_000.0).unwrap();

    assert_eq!(sim.frames().len(), 1);
    let frame = sim.frames().iter().next().unwrap();
    assert_eq!(frame.total_size(), 26);

    let trace = frame.trace().expect("monitored frame has a trace");
    assert!(approx(trace.latency.unwrap(), 41.6));

    let tables = monitor::tables(&sim);
    assert_eq!(tables.frame_hops.len(), 2);
    let first = &tables.frame_hops[0];
    assert!(approx(first.d_trans, 20.8));
    assert!(approx(first.latency, 20.8));
    assert!(first.d_queue.abs() < TOLERANCE);
    let last = &tables.frame_hops[1];
    assert!(last.frame_last_hop);
    assert!(approx(last.latency, 41.6));

    // Exactly one received and one transmitted event on the egress port.
    let received: Vec<_> = tables
        .port_events
        .iter()
        .filter(|r| r.action == Action::Received)
        .collect();
    let transmitted: Vec<_> = tables
        .port_events
        .iter()
        .filter(|r| r.action == Action::Transmitted)
        .collect();
    assert_eq!(received.len(), 1);
    assert_eq!(transmitted.len(), 1);
    assert!(approx(received[0].action_time, 20.8));
    assert!(approx(transmitted[0].action_time, 41.6));
    assert!(tables.port_events.iter().all(|r| r.action_q_len <= 1));
}

/// A frame to an unknown destination floods every port except the
/// ingress, and the source address gets learned.
#[test]
fn test_broadcast_on_unknown_destination() {
    let mut sim = Simulation::new(SimConfig::named("broadcast", 1));
    let a = sim.add_single_packet("a", "z", 74, 0.0, 0, true).unwrap();
    let bridge = sim
        .add_switch("bridge", SwitchConfig::default(), true)
        .unwrap();
    let b = sim.add_sink("b").unwrap();
    let c = sim.add_sink("c").unwrap();
    let d = sim.add_sink("d").unwrap();
    for peer in [a, b, c, d] {
        sim.connect_nodes(bridge, peer, LinkSpec::default()).unwrap();
    }
    sim.run_until(10_000.0).unwrap();

    let tables = monitor::tables(&sim);
    // First hop a -> bridge, then one leaf hop per flooded port.
    assert_eq!(tables.frame_hops.len(), 4);
    let receivers: Vec<String> = tables
        .frame_hops
        .iter()
        .skip(1)
        .map(|h| h.frame_hop_receiver.to_string())
        .collect();
    assert_eq!(receivers, ["b", "c", "d"]);
    assert!(tables.frame_hops.iter().skip(1).all(|h| h.frame_last_hop));

    let entry = sim
        .switch_table_entry(bridge, &"a".into())
        .expect("source was learned");
    assert_eq!(entry.ingress, tsnsim::node::Ingress::Port(1));
    // The unknown destination must not appear in the table.
    assert!(sim.switch_table_entry(bridge, &"z".into()).is_none());
}

/// Frames whose destination sits behind the ingress port are silently
/// discarded: no drop rows, no egress traffic.
#[test]
fn test_split_horizon_discard() {
    let mut sim = Simulation::new(SimConfig::named("split-horizon", 1));
    let a = sim
        .add_flow(
            "a",
            Limited::new(|_: &mut SimRng| Some(FrameSpec::new("a", 74, 0)), 2),
            true,
        )
        .unwrap();
    let bridge = sim
        .add_switch("bridge", SwitchConfig::default(), true)
        .unwrap();
    let b = sim.add_sink("b").unwrap();
    sim.connect_nodes(a, bridge, LinkSpec::default()).unwrap();
    sim.connect_nodes(bridge, b, LinkSpec::default()).unwrap();
    sim.run_until(10_000.0).unwrap();

    assert_eq!(sim.frames().len(), 2);
    let tables = monitor::tables(&sim);
    // Discard is distinct from drop: neither buffered nor dropped.
    assert!(tables.port_events.is_empty());
    // The frames reached the bridge (one hop) and went no further.
    assert!(tables.frame_hops.iter().all(|h| h.frame_hop_count == 0));
    assert!(sim.switch_table_entry(bridge, &"a".into()).is_some());
}

/// Spec timing of strict-priority preemption: a 64-byte express frame
/// injected at t=100 finishes at 151.2 µs; the paused 1500-byte frame
/// finishes at 1251.2 µs (penalty 0).
#[test]
fn test_strict_priority_preemption_timing() {
    let mut sim = Simulation::new(SimConfig::named("preemption", 1));
    sim.config_mut().min_preemption_bytes = 1;
    sim.config_mut().preemption_penalty_bytes = 0;
    let bridge = sim
        .add_switch(
            "bridge",
            SwitchConfig {
                preemption: true,
                ..SwitchConfig::default()
            },
            true,
        )
        .unwrap();
    let sink = sim.add_sink("sink").unwrap();
    sim.connect_nodes(bridge, sink, LinkSpec::default()).unwrap();

    sim.add_injector(
        "best-effort",
        "bridge",
        10.0,
        0.0,
        Static(1.0),
        Limited::new(|_: &mut SimRng| Some(FrameSpec::new("sink", 1474, 0)), 1),
        true,
    )
    .unwrap();
    sim.add_injector(
        "express",
        "bridge",
        10.0,
        100.0,
        Static(1.0),
        Limited::new(|_: &mut SimRng| Some(FrameSpec::new("sink", 38, 7)), 1),
        true,
    )
    .unwrap();
    sim.run_until(100_000.0).unwrap();

    let tables = monitor::tables(&sim);
    let pops: Vec<_> = tables
        .port_events
        .iter()
        .filter(|r| r.action == Action::Transmitted)
        .collect();
    assert_eq!(pops.len(), 2);

    let express = pops.iter().find(|r| r.frame_size == 64).unwrap();
    assert!(approx(express.action_time, 151.2));
    let best_effort = pops.iter().find(|r| r.frame_size == 1500).unwrap();
    assert!(approx(best_effort.action_time, 1251.2));

    // End-to-end latencies as seen by the monitored injectors.
    let hops = &tables.frame_hops;
    let express_hop = hops.iter().find(|h| h.frame_size == 64).unwrap();
    assert!(approx(express_hop.latency, 51.2));
    let paused_hop = hops.iter().find(|h| h.frame_size == 1500).unwrap();
    assert!(approx(paused_hop.latency, 1251.2));
}

/// With the default guard band a nearly-finished transmission is not
/// preempted.
#[test]
fn test_preemption_guard_band_blocks_late_pause() {
    let mut sim = Simulation::new(SimConfig::named("guard-band", 1));
    // 1500-byte frame: anything after 1388 bytes sent is inside the
    // guard band of min 80 + penalty 8 bytes.
    sim.config_mut().min_preemption_bytes = 80;
    sim.config_mut().preemption_penalty_bytes = 8;
    let bridge = sim
        .add_switch(
            "bridge",
            SwitchConfig {
                preemption: true,
                ..SwitchConfig::default()
            },
            true,
        )
        .unwrap();
    let sink = sim.add_sink("sink").unwrap();
    sim.connect_nodes(bridge, sink, LinkSpec::default()).unwrap();

    sim.add_injector(
        "best-effort",
        "bridge",
        10.0,
        0.0,
        Static(1.0),
        Limited::new(|_: &mut SimRng| Some(FrameSpec::new("sink", 1474, 0)), 1),
        false,
    )
    .unwrap();
    // Injected 60 µs (75 bytes) before the low frame finishes at 1200.
    sim.add_injector(
        "express",
        "bridge",
        10.0,
        1140.0,
        Static(1.0),
        Limited::new(|_: &mut SimRng| Some(FrameSpec::new("sink", 38, 7)), 1),
        false,
    )
    .unwrap();
    sim.run_until(100_000.0).unwrap();

    let tables = monitor::tables(&sim);
    let pops: Vec<_> = tables
        .port_events
        .iter()
        .filter(|r| r.action == Action::Transmitted)
        .collect();
    // The big frame finishes untouched at 1200, the express frame after.
    let best_effort = pops.iter().find(|r| r.frame_size == 1500).unwrap();
    assert!(approx(best_effort.action_time, 1200.0));
    let express = pops.iter().find(|r| r.frame_size == 64).unwrap();
    assert!(approx(express.action_time, 1251.2));
}

/// A bounded port tail-drops the overflow and records it as ordinary
/// `dropped` monitor rows; the append/pop/drop accounting stays
/// balanced.
#[test]
fn test_bounded_port_tail_drops() {
    let mut sim = Simulation::new(SimConfig::named("tail-drop", 1));
    let bridge = sim
        .add_switch("bridge", SwitchConfig::default(), true)
        .unwrap();
    let sink = sim.add_sink("sink").unwrap();
    let mut param = tsnsim::SwitchPortParam::new(8).unwrap();
    param.set_queue_capacity(2);
    sim.connect_nodes(
        bridge,
        sink,
        LinkSpec {
            param_a: Some(param),
            ..LinkSpec::default()
        },
    )
    .unwrap();
    // A zero-intensity burst: all ten frames hit the port at t=0.
    sim.add_injector(
        "burst",
        "bridge",
        10.0,
        0.0,
        Static(0.0),
        Limited::new(|_: &mut SimRng| Some(FrameSpec::new("sink", 474, 0)), 10),
        false,
    )
    .unwrap();
    sim.run_until(100_000.0).unwrap();

    let tables = monitor::tables(&sim);
    let count = |action: Action| {
        tables
            .port_events
            .iter()
            .filter(|r| r.action == action)
            .count()
    };
    assert_eq!(count(Action::Received), 10);
    assert_eq!(count(Action::Transmitted), 2);
    assert_eq!(count(Action::Dropped), 8);
}

/// An aged learning entry is deleted and the frame broadcast again.
#[test]
fn test_learning_table_aging() {
    let mut sim = Simulation::new(SimConfig::named("aging", 1));
    let bridge = sim
        .add_switch(
            "bridge",
            SwitchConfig {
                aging_time_s: 1.0,
                ..SwitchConfig::default()
            },
            true,
        )
        .unwrap();
    // x teaches the bridge its port at t=0, then stays silent.
    let x = sim.add_single_packet("x", "nobody", 74, 0.0, 0, false).unwrap();
    // y sends to x well past the aging time.
    let y = sim
        .add_single_packet("y", "x", 74, 1_200_000.0, 0, true)
        .unwrap();
    let b = sim.add_sink("b").unwrap();
    sim.connect_nodes(bridge, x, LinkSpec::default()).unwrap();
    sim.connect_nodes(bridge, y, LinkSpec::default()).unwrap();
    sim.connect_nodes(bridge, b, LinkSpec::default()).unwrap();
    sim.run_until(2_000_000.0).unwrap();

    // The aged entry was removed while handling y's frame.
    assert!(sim.switch_table_entry(bridge, &"x".into()).is_none());

    // y's frame was flooded to x and b.
    let tables = monitor::tables(&sim);
    let receivers: Vec<String> = tables
        .frame_hops
        .iter()
        .filter(|h| h.frame_hop_count == 1)
        .map(|h| h.frame_hop_receiver.to_string())
        .collect();
    assert_eq!(receivers, ["x", "b"]);
}

/// With aging disabled the year-old entry still forwards directly.
#[test]
fn test_aging_disabled_keeps_entries() {
    let mut sim = Simulation::new(SimConfig::named("no-aging", 1));
    let bridge = sim
        .add_switch("bridge", SwitchConfig::default(), true)
        .unwrap();
    let x = sim.add_single_packet("x", "nobody", 74, 0.0, 0, false).unwrap();
    let y = sim
        .add_single_packet("y", "x", 74, 1_200_000.0, 0, true)
        .unwrap();
    let b = sim.add_sink("b").unwrap();
    sim.connect_nodes(bridge, x, LinkSpec::default()).unwrap();
    sim.connect_nodes(bridge, y, LinkSpec::default()).unwrap();
    sim.connect_nodes(bridge, b, LinkSpec::default()).unwrap();
    sim.run_until(2_000_000.0).unwrap();

    assert!(sim.switch_table_entry(bridge, &"x".into()).is_some());
    let tables = monitor::tables(&sim);
    let receivers: Vec<String> = tables
        .frame_hops
        .iter()
        .filter(|h| h.frame_hop_count == 1)
        .map(|h| h.frame_hop_receiver.to_string())
        .collect();
    // Unicast to x only, no flood.
    assert_eq!(receivers, ["x"]);
}
