// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-run aggregate statistics over monitor logs.
//!
//! Waiting time is measured from a frame entering the port buffer to it
//! leaving the port, transmission included, keyed by frame priority with
//! `-1` aggregating all priorities. Queue-length statistics weight each
//! observed length by the time it persisted, relative to the runtime.
//! Empty logs yield `-1` sentinels, matching the row format of runs
//! without traffic.

use std::collections::{BTreeMap, HashMap};

use crate::frame::{FrameId, FrameStore};
use crate::tsn::LogEntry;

/// Key for per-priority statistics; `-1` aggregates every priority.
pub type PriorityKey = i8;

/// Mean and sample standard deviation of port waiting times, keyed by
/// priority.
///
/// Append and pop entries are matched per frame; frames still queued at
/// the end of the run have no pop entry and are left out.
#[must_use]
pub fn waiting_time_stats(
    append: &[LogEntry],
    pop: &[LogEntry],
    frames: &FrameStore,
) -> (BTreeMap<PriorityKey, f64>, BTreeMap<PriorityKey, f64>) {
    let popped: HashMap<FrameId, f64> = pop.iter().map(|e| (e.frame, e.time)).collect();
    let mut waits: BTreeMap<PriorityKey, Vec<f64>> = BTreeMap::new();
    for entry in append {
        let Some(pop_time) = popped.get(&entry.frame) else {
            continue;
        };
        let waiting = pop_time - entry.time;
        let priority = frames.get(entry.frame).priority() as PriorityKey;
        waits.entry(priority).or_default().push(waiting);
        waits.entry(-1).or_default().push(waiting);
    }
    if waits.is_empty() {
        waits.insert(-1, Vec::new());
    }

    let mut averages = BTreeMap::new();
    let mut deviations = BTreeMap::new();
    for (priority, values) in &waits {
        averages.insert(*priority, mean(values));
        deviations.insert(*priority, sample_std_dev(values));
    }
    (averages, deviations)
}

/// Time-weighted mean and standard deviation of the queue length.
///
/// `entries` is the merged append+pop log; each entry's length is
/// weighted by the time elapsed since the previous entry.
#[must_use]
pub fn queue_length_stats(entries: &mut Vec<LogEntry>, runtime: f64) -> (f64, f64) {
    if entries.is_empty() || runtime <= 0.0 {
        return (-1.0, -1.0);
    }
    entries.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal));

    let mut average = 0.0;
    let mut last_time = 0.0;
    for entry in entries.iter() {
        average += (entry.time - last_time) * entry.queue_len as f64 / runtime;
        last_time = entry.time;
    }

    let mut variance = 0.0;
    last_time = 0.0;
    for entry in entries.iter() {
        variance +=
            (entry.time - last_time) * (entry.queue_len as f64 - average).powi(2) / runtime;
        last_time = entry.time;
    }
    (average, variance.sqrt())
}

/// Mean and sample standard deviation of the sizes of received frames.
#[must_use]
pub fn packet_size_stats(append: &[LogEntry], frames: &FrameStore) -> (f64, f64) {
    if append.is_empty() {
        return (-1.0, -1.0);
    }
    let sizes: Vec<f64> = append
        .iter()
        .map(|e| frames.get(e.frame).total_size() as f64)
        .collect();
    (mean(&sizes), sample_std_dev(&sizes))
}

/// Latency statistics of a monitored source's emitted frames: count
/// delivered, mean and sample standard deviation of the end-to-end
/// latency. Undelivered frames carry no latency and are skipped.
#[must_use]
pub fn latency_stats(emitted: &[FrameId], frames: &FrameStore) -> (usize, f64, f64) {
    let latencies: Vec<f64> = emitted
        .iter()
        .filter_map(|id| frames.get(*id).trace().and_then(|t| t.latency))
        .collect();
    if latencies.is_empty() {
        return (0, -1.0, -1.0);
    }
    (latencies.len(), mean(&latencies), sample_std_dev(&latencies))
}

/// Size statistics over every emitted frame of a source.
#[must_use]
pub fn emitted_size_stats(emitted: &[FrameId], frames: &FrameStore) -> (f64, f64) {
    if emitted.is_empty() {
        return (-1.0, -1.0);
    }
    let sizes: Vec<f64> = emitted
        .iter()
        .map(|id| frames.get(*id).total_size() as f64)
        .collect();
    (mean(&sizes), sample_std_dev(&sizes))
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return -1.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (`n - 1` divisor, 0 for fewer than two
/// samples).
pub(crate) fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
