// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Multi-run campaigns.
//!
//! A campaign runs one scenario repeatedly (distinct run index per
//! iteration, the seed handed to the factory), merges the flat monitor
//! tables and aggregates every numeric leaf of the per-run results into
//! `{average, standard_deviation, lower, upper}` with a Student-t
//! confidence interval. CSV and JSON writers cover the export formats
//! the plotting side consumes.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::core::SimError;
use crate::monitor::{self, HopRow, MonitorTables, PortEventRow};
use crate::sim::Simulation;
use crate::topology::BuildError;

/// Errors of a campaign run.
#[derive(Debug)]
pub enum CampaignError {
    /// Scenario factory failed to assemble a simulation.
    Build(BuildError),
    /// A run aborted with an engine error.
    Sim(SimError),
}

impl fmt::Display for CampaignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build(e) => write!(f, "scenario build failed: {e}"),
            Self::Sim(e) => write!(f, "simulation run failed: {e}"),
        }
    }
}

impl std::error::Error for CampaignError {}

impl From<BuildError> for CampaignError {
    fn from(e: BuildError) -> Self {
        Self::Build(e)
    }
}

impl From<SimError> for CampaignError {
    fn from(e: SimError) -> Self {
        Self::Sim(e)
    }
}

/// Outcome of a campaign.
#[derive(Debug)]
pub struct CampaignResult {
    /// Flat tables of every run, concatenated.
    pub tables: MonitorTables,
    /// Hierarchical results per run, as JSON trees.
    pub runs: Vec<Value>,
    /// Recursive aggregate over `runs`: every numeric leaf becomes a
    /// confidence-interval record.
    pub aggregate: Value,
}

/// Run `factory`-built simulations `count` times.
///
/// Each run executes for `runtime` µs, or until its stop event for a
/// non-positive `runtime`. The factory receives the 1-based run index
/// and typically derives the seed from it.
pub fn run_campaign(
    count: u64,
    runtime: f64,
    confidence: f64,
    mut factory: impl FnMut(u64) -> Result<Simulation, BuildError>,
) -> Result<CampaignResult, CampaignError> {
    let mut tables = MonitorTables::default();
    let mut runs = Vec::new();
    for run in 1..=count {
        let mut sim = factory(run)?;
        if runtime > 0.0 {
            sim.run_until(runtime)?;
        } else {
            sim.run_until_stopped()?;
        }
        let mut run_tables = monitor::tables(&sim);
        tables.port_events.append(&mut run_tables.port_events);
        tables.frame_hops.append(&mut run_tables.frame_hops);
        runs.push(
            serde_json::to_value(monitor::results(&sim)).expect("results serialize to JSON"),
        );
    }
    let aggregate = aggregate_runs(&runs, confidence);
    Ok(CampaignResult {
        tables,
        runs,
        aggregate,
    })
}

/// Confidence-interval record of one aggregated leaf.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Interval {
    pub average: f64,
    pub standard_deviation: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Student-t confidence interval over a sample.
///
/// With fewer than two samples the interval collapses onto the mean.
#[must_use]
pub fn confidence_interval(values: &[f64], confidence: f64) -> Interval {
    let average = monitor::stats::mean(values);
    let standard_deviation = monitor::stats::sample_std_dev(values);
    if values.len() < 2 || standard_deviation == 0.0 {
        return Interval {
            average,
            standard_deviation,
            lower: average,
            upper: average,
        };
    }
    let freedom = (values.len() - 1) as f64;
    let quantile = StudentsT::new(0.0, 1.0, freedom)
        .expect("valid t distribution")
        .inverse_cdf(1.0 - (1.0 - confidence) / 2.0);
    let half_width = quantile * standard_deviation / (values.len() as f64).sqrt();
    Interval {
        average,
        standard_deviation,
        lower: average - half_width,
        upper: average + half_width,
    }
}

/// Walk the per-run result trees in parallel and replace every numeric
/// leaf with its confidence interval across runs.
fn aggregate_runs(runs: &[Value], confidence: f64) -> Value {
    let Some(first) = runs.first() else {
        return Value::Null;
    };
    aggregate_node(first, runs, &[], confidence)
}

fn aggregate_node(template: &Value, runs: &[Value], path: &[String], confidence: f64) -> Value {
    match template {
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for key in map.keys() {
                let mut child_path = path.to_vec();
                child_path.push(key.clone());
                out.insert(
                    key.clone(),
                    aggregate_node(&map[key], runs, &child_path, confidence),
                );
            }
            Value::Object(out)
        }
        Value::Number(_) => {
            let values: Vec<f64> = runs
                .iter()
                .filter_map(|run| lookup(run, path).and_then(Value::as_f64))
                .collect();
            serde_json::to_value(confidence_interval(&values, confidence))
                .expect("interval serializes")
        }
        other => other.clone(),
    }
}

fn lookup<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(key))
}

// --- export ----------------------------------------------------------------

fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => {
            if s.contains(',') || s.contains('"') {
                format!("\"{}\"", s.replace('"', "\"\""))
            } else {
                s.clone()
            }
        }
        other => other.to_string(),
    }
}

fn write_rows<T: serde::Serialize>(path: &Path, rows: &[T]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    let mut header_written = false;
    for row in rows {
        let value = serde_json::to_value(row).expect("row serializes");
        let object = value.as_object().expect("row is a flat object");
        if !header_written {
            let header: Vec<&str> = object.keys().map(String::as_str).collect();
            writeln!(out, "{}", header.join(","))?;
            header_written = true;
        }
        let fields: Vec<String> = object.values().map(csv_field).collect();
        writeln!(out, "{}", fields.join(","))?;
    }
    out.flush()
}

impl CampaignResult {
    /// Write the merged flat tables as CSV, one file per table kind.
    /// Returns the paths written; empty tables produce no file.
    pub fn write_csv(&self, prefix: &Path) -> io::Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        if !self.tables.port_events.is_empty() {
            let path = with_suffix(prefix, "port_events.csv");
            write_rows::<PortEventRow>(&path, &self.tables.port_events)?;
            written.push(path);
        }
        if !self.tables.frame_hops.is_empty() {
            let path = with_suffix(prefix, "frame_hops.csv");
            write_rows::<HopRow>(&path, &self.tables.frame_hops)?;
            written.push(path);
        }
        Ok(written)
    }

    /// Write the aggregate (and per-run results) as pretty JSON.
    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        let mut doc = BTreeMap::new();
        doc.insert("aggregate", self.aggregate.clone());
        doc.insert("runs", Value::Array(self.runs.clone()));
        let out = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(out, &doc)?;
        Ok(())
    }
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let stem = prefix
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = if stem.is_empty() {
        suffix.to_string()
    } else {
        format!("{stem}_{suffix}")
    };
    prefix.with_file_name(name)
}
