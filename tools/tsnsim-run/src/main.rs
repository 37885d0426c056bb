// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! tsnsim-run - scenario driver for the tsnsim network simulator
//!
//! Runs canned experiments (single hop, saturated switch, frame
//! preemption, CBS shaping) as multi-run campaigns and exports the
//! monitored tables as CSV and the aggregated results as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use tsnsim::campaign::{run_campaign, CampaignResult};
use tsnsim::switch::SwitchConfig;
use tsnsim::{
    Exponential, FrameSpec, Limited, LinkSpec, SimConfig, SimRng, Simulation, Static,
    SwitchPortParam, TsaKind,
};

/// tsnsim scenario driver
#[derive(Parser, Debug)]
#[command(name = "tsnsim-run")]
#[command(version = "0.1.0")]
#[command(about = "Run tsnsim scenarios and export monitor tables")]
struct Args {
    #[command(subcommand)]
    scenario: Scenario,

    /// Number of runs in the campaign
    #[arg(short, long, default_value = "1", global = true)]
    runs: u64,

    /// Base RNG seed; run i uses seed + i
    #[arg(short, long, default_value = "42", global = true)]
    seed: u64,

    /// Runtime per run in µs (0 = run until the scenario stops itself)
    #[arg(short, long, default_value = "100000", global = true)]
    until: f64,

    /// Confidence coefficient for the aggregate intervals
    #[arg(long, default_value = "0.95", global = true)]
    confidence: f64,

    /// Write the flat monitor tables as CSV files with this path prefix
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Write per-run and aggregated results as JSON
    #[arg(long, global = true)]
    json: Option<PathBuf>,

    /// Per-event engine logging (also respects RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum Scenario {
    /// One frame, one switch, one sink: the smallest end-to-end path
    SingleHop {
        /// Payload bytes of the single frame
        #[arg(long, default_value = "0")]
        payload: u32,
    },

    /// Injector-driven load on one monitored switch port
    Saturated {
        /// Number of injected frames per run
        #[arg(short = 'n', long, default_value = "1000")]
        frames: u64,

        /// Mean intensity factor (sleep = intensity * transmit time);
        /// 1.0 saturates the line rate
        #[arg(short, long, default_value = "1.1")]
        intensity: f64,

        /// Link bandwidth in Mb/s
        #[arg(short, long, default_value = "10")]
        bandwidth: f64,
    },

    /// Express frame preempting a best-effort frame in flight
    Preemption {
        /// Total size of the low-priority frame in bytes
        #[arg(long, default_value = "1500")]
        low_size: u32,

        /// Total size of the high-priority frame in bytes
        #[arg(long, default_value = "64")]
        high_size: u32,

        /// Injection instant of the high-priority frame in µs
        #[arg(long, default_value = "100")]
        high_at: f64,
    },

    /// Credit-Based Shaper bounding one class to a bandwidth share
    Cbs {
        /// Fraction of the port rate reserved for the shaped class
        #[arg(short, long, default_value = "0.25")]
        delta: f64,

        /// Number of injected frames per run
        #[arg(short = 'n', long, default_value = "500")]
        frames: u64,

        /// Total frame size in bytes
        #[arg(long, default_value = "500")]
        size: u32,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let result = campaign_for(args)?;

    println!(
        "{} port events, {} hop rows over {} run(s)",
        result.tables.port_events.len(),
        result.tables.frame_hops.len(),
        args.runs
    );
    println!("{}", serde_json::to_string_pretty(&result.aggregate)?);

    if let Some(prefix) = &args.csv {
        for path in result.write_csv(prefix)? {
            println!("wrote {}", path.display());
        }
    }
    if let Some(path) = &args.json {
        result.write_json(path)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn campaign_for(args: &Args) -> Result<CampaignResult, Box<dyn std::error::Error>> {
    let base_seed = args.seed;
    let verbose = args.verbose;
    let result = match args.scenario.clone() {
        Scenario::SingleHop { payload } => run_campaign(args.runs, args.until, args.confidence, {
            move |run| {
                let mut sim = scenario_sim("single-hop", base_seed, run, verbose);
                let talker = sim.add_single_packet("talker", "listener", payload, 0.0, 0, true)?;
                let bridge = sim.add_switch("bridge", SwitchConfig::default(), true)?;
                let listener = sim.add_sink("listener")?;
                sim.connect_nodes(talker, bridge, LinkSpec::default())?;
                sim.connect_nodes(bridge, listener, LinkSpec::default())?;
                Ok(sim)
            }
        })?,

        Scenario::Saturated {
            frames,
            intensity,
            bandwidth,
        } => run_campaign(args.runs, args.until, args.confidence, move |run| {
            let mut sim = scenario_sim("saturated", base_seed, run, verbose);
            let bridge = sim.add_switch("bridge", SwitchConfig::default(), true)?;
            let sink = sim.add_sink("sink")?;
            sim.connect_nodes(
                bridge,
                sink,
                LinkSpec {
                    bandwidth_mbps: bandwidth,
                    ..LinkSpec::default()
                },
            )?;
            let load = Limited::new(
                move |rng: &mut SimRng| {
                    let payload = rng.range(64, 1474);
                    let priority = rng.range(0, 8) as u8;
                    Some(FrameSpec::new("sink", payload, priority))
                },
                frames,
            );
            sim.add_injector(
                "load",
                "bridge",
                bandwidth,
                0.0,
                Exponential::with_mean(intensity),
                load,
                true,
            )?;
            Ok(sim)
        })?,

        Scenario::Preemption {
            low_size,
            high_size,
            high_at,
        } => run_campaign(args.runs, args.until, args.confidence, move |run| {
            let mut sim = scenario_sim("preemption", base_seed, run, verbose);
            sim.config_mut().min_preemption_bytes = 1;
            sim.config_mut().preemption_penalty_bytes = 0;
            let bridge = sim.add_switch(
                "bridge",
                SwitchConfig {
                    preemption: true,
                    ..SwitchConfig::default()
                },
                true,
            )?;
            let sink = sim.add_sink("sink")?;
            sim.connect_nodes(bridge, sink, LinkSpec::default())?;

            let low_payload = low_size.saturating_sub(26);
            sim.add_injector(
                "best-effort",
                "bridge",
                10.0,
                0.0,
                Static(1.0),
                Limited::new(
                    move |_: &mut SimRng| Some(FrameSpec::new("sink", low_payload, 0)),
                    1,
                ),
                true,
            )?;
            let high_payload = high_size.saturating_sub(26);
            sim.add_injector(
                "express",
                "bridge",
                10.0,
                high_at,
                Static(1.0),
                Limited::new(
                    move |_: &mut SimRng| Some(FrameSpec::new("sink", high_payload, 7)),
                    1,
                ),
                true,
            )?;
            Ok(sim)
        })?,

        Scenario::Cbs {
            delta,
            frames,
            size,
        } => run_campaign(args.runs, args.until, args.confidence, move |run| {
            let mut sim = scenario_sim("cbs", base_seed, run, verbose);
            let bridge = sim.add_switch("bridge", SwitchConfig::default(), true)?;
            let sink = sim.add_sink("sink")?;
            let mut param = SwitchPortParam::new(8)?;
            param.set_tsa(7, TsaKind::CreditBasedShaper)?;
            param.set_delta_bandwidth(7, delta)?;
            sim.connect_nodes(
                bridge,
                sink,
                LinkSpec {
                    param_a: Some(param),
                    ..LinkSpec::default()
                },
            )?;
            let payload = size.saturating_sub(26);
            sim.add_injector(
                "shaped",
                "bridge",
                10.0,
                0.0,
                Static(1.0),
                Limited::new(
                    move |_: &mut SimRng| Some(FrameSpec::new("sink", payload, 7)),
                    frames,
                ),
                true,
            )?;
            Ok(sim)
        })?,
    };
    Ok(result)
}

fn scenario_sim(name: &str, base_seed: u64, run: u64, verbose: bool) -> Simulation {
    let mut config = SimConfig::named(name, base_seed + run);
    config.run_index = run;
    config.verbose = verbose;
    Simulation::new(config)
}
