// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::cast_precision_loss)] // Stats/metrics need this
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Multi-run campaigns: per-run results, confidence-interval aggregation
//! and CSV/JSON export.

use tsnsim::campaign::run_campaign;
use tsnsim::switch::SwitchConfig;
use tsnsim::{
    Exponential, FrameSpec, Limited, LinkSpec, SimConfig, SimRng, Simulation, BuildError,
};

fn scenario(run: u64) -> Result<Simulation, BuildError> {
    let mut config = SimConfig::named("campaign", 1000 + run);
    config.run_index = run;
    let mut sim = Simulation::new(config);
    let bridge = sim.add_switch("bridge", SwitchConfig::default(), true)?;
    let sink = sim.add_sink("sink")?;
    sim.connect_nodes(bridge, sink, LinkSpec::default())?;
    sim.add_injector(
        "load",
        "bridge",
        10.0,
        0.0,
        Exponential::with_mean(1.5),
        Limited::new(
            |rng: &mut SimRng| {
                Some(FrameSpec::new("sink", rng.range(38, 1000), 0))
            },
            100,
        ),
        true,
    )?;
    Ok(sim)
}

#[test]
fn test_campaign_runs_and_aggregates() {
    let result = run_campaign(4, 1_000_000.0, 0.95, scenario).unwrap();

    assert_eq!(result.runs.len(), 4);
    // 100 appends and 100 pops per run on the monitored port.
    assert_eq!(result.tables.port_events.len(), 4 * 200);

    // The aggregate mirrors the per-run tree with interval leaves.
    let sent = &result.aggregate["bridge"]["1"]["frames_sent"];
    assert_eq!(sent["average"].as_f64().unwrap(), 100.0);
    assert_eq!(sent["lower"], sent["upper"]);

    // Waiting times differ across seeds, so the interval has width.
    let wait = &result.aggregate["bridge"]["1"]["average_waiting_time"]["-1"];
    assert!(wait["average"].as_f64().unwrap() > 0.0);
    assert!(wait["upper"].as_f64().unwrap() >= wait["lower"].as_f64().unwrap());

    // The injector results aggregate too.
    let injected = &result.aggregate["load"]["frames_injected"];
    assert_eq!(injected["average"].as_f64().unwrap(), 100.0);
}

#[test]
fn test_campaign_csv_export() {
    let result = run_campaign(2, 1_000_000.0, 0.95, scenario).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("campaign");
    let written = result.write_csv(&prefix).unwrap();
    assert_eq!(written.len(), 2);

    let port_events = std::fs::read_to_string(&written[0]).unwrap();
    let mut lines = port_events.lines();
    let header = lines.next().unwrap();
    assert!(header.contains("action"));
    assert!(header.contains("switch_address"));
    // Header plus one line per row.
    assert_eq!(lines.count(), result.tables.port_events.len());
}

#[test]
fn test_campaign_json_export_roundtrip() {
    let result = run_campaign(2, 1_000_000.0, 0.95, scenario).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.json");
    result.write_json(&path).unwrap();

    let reparsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(reparsed["aggregate"], result.aggregate);
    assert_eq!(
        reparsed["runs"].as_array().unwrap().len(),
        result.runs.len()
    );
}

#[test]
fn test_campaign_propagates_build_errors() {
    let err = run_campaign(1, 1_000.0, 0.95, |_| {
        let mut sim = Simulation::new(SimConfig::default());
        sim.add_sink("dup")?;
        sim.add_sink("dup")?;
        Ok(sim)
    })
    .unwrap_err();
    assert!(matches!(
        err,
        tsnsim::campaign::CampaignError::Build(BuildError::DuplicateAddress(_))
    ));
}
