// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Frames and their monitoring trace.
//!
//! A frame is a value: payload byte count, a stack of headers, a priority
//! in `0..=7` and source/destination addresses. The simulator never
//! carries frame contents — only sizes and metadata. Total size is
//! constant for the whole lifetime of a frame.
//!
//! Frames live in a per-simulation arena ([`FrameStore`]) and are passed
//! around as [`FrameId`] handles; queues, pending maps and monitor logs
//! all reference the arena.

use crate::topology::Address;

/// Handle into a simulation's frame arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(pub(crate) u32);

impl FrameId {
    /// The monotonically assigned frame number.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        u64::from(self.0)
    }
}

/// One stacked header: a byte count and an opaque tag.
///
/// Stacking a header on a frame models encapsulation; the tag is never
/// interpreted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub bytes: u32,
    pub tag: String,
}

impl Header {
    #[must_use]
    pub fn new(bytes: u32, tag: &str) -> Self {
        Self {
            bytes,
            tag: tag.to_string(),
        }
    }
}

/// A frame descriptor.
#[derive(Debug)]
pub struct Frame {
    id: FrameId,
    source: Address,
    destination: Address,
    payload: u32,
    headers: Vec<Header>,
    priority: u8,
    trace: Option<FrameTrace>,
}

impl Frame {
    #[must_use]
    pub fn id(&self) -> FrameId {
        self.id
    }

    #[must_use]
    pub fn source(&self) -> &Address {
        &self.source
    }

    #[must_use]
    pub fn destination(&self) -> &Address {
        &self.destination
    }

    #[must_use]
    pub fn payload(&self) -> u32 {
        self.payload
    }

    #[must_use]
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Payload plus every stacked header, in bytes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        u64::from(self.payload) + self.headers.iter().map(|h| u64::from(h.bytes)).sum::<u64>()
    }

    #[must_use]
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Stack another header on the frame (encapsulation).
    pub fn append_header(&mut self, header: Header) {
        self.headers.push(header);
    }

    /// The innermost-pushed header, if any.
    #[must_use]
    pub fn peek_header(&self) -> Option<&Header> {
        self.headers.last()
    }

    /// Pop the innermost-pushed header (decapsulation).
    pub fn pop_header(&mut self) -> Option<Header> {
        self.headers.pop()
    }

    /// Monitoring trace, present on monitored frames only.
    #[must_use]
    pub fn trace(&self) -> Option<&FrameTrace> {
        self.trace.as_ref()
    }

    pub(crate) fn record_hop(&mut self, sender: &Address, receiver: &Address, now: f64) {
        if let Some(trace) = self.trace.as_mut() {
            trace.hops.append(sender, receiver, now);
        }
    }

    pub(crate) fn record_destination_reached(&mut self, now: f64) {
        if let Some(trace) = self.trace.as_mut() {
            trace.latency = Some(now - trace.created);
        }
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "frame {} ({} -> {}, {} B, prio {})",
            self.id.0,
            self.source,
            self.destination,
            self.total_size(),
            self.priority
        )
    }
}

/// Creation time, per-hop history and end-to-end latency of a monitored
/// frame.
#[derive(Debug)]
pub struct FrameTrace {
    /// Virtual time of frame creation.
    pub created: f64,
    /// End-to-end latency in µs; `None` until the destination is reached.
    pub latency: Option<f64>,
    /// Hop history. A tree, because broadcast fans a frame out to several
    /// receivers.
    pub hops: HopTree,
}

/// One row of a frame's hop table, before link parameters are attached.
#[derive(Debug, Clone)]
pub struct RawHop {
    pub hop_count: u32,
    pub last_hop: bool,
    pub sender: Address,
    pub sender_time: f64,
    pub receiver: Address,
    pub receiver_time: f64,
}

/// Hop history of a frame.
///
/// The root records the creation instant; every child edge is one hop
/// `(sender, receiver, arrival time)`. Branches appear when a switch
/// broadcasts the frame.
#[derive(Debug)]
pub struct HopTree {
    node: Option<Address>,
    time: f64,
    children: Vec<HopTree>,
}

impl HopTree {
    fn root(created: f64) -> Self {
        Self {
            node: None,
            time: created,
            children: Vec::new(),
        }
    }

    /// Creation instant of the frame (time of the tree root).
    #[must_use]
    pub fn created(&self) -> f64 {
        self.time
    }

    fn append(&mut self, sender: &Address, receiver: &Address, time: f64) {
        if self.node.is_none() {
            self.node = Some(sender.clone());
        }
        if self.node.as_ref() == Some(sender) {
            self.children.push(Self {
                node: Some(receiver.clone()),
                time,
                children: Vec::new(),
            });
        } else {
            for child in &mut self.children {
                child.append(sender, receiver, time);
            }
        }
    }

    /// Flatten the tree into hop rows. A hop is marked `last_hop` when
    /// its receiver forwarded the frame no further.
    #[must_use]
    pub fn hop_rows(&self) -> Vec<RawHop> {
        self.collect_rows(0)
    }

    fn collect_rows(&self, hop_count: u32) -> Vec<RawHop> {
        let mut rows = Vec::new();
        let Some(sender) = self.node.as_ref() else {
            return rows;
        };
        for child in &self.children {
            let receiver = child.node.clone().expect("hop child without address");
            rows.push(RawHop {
                hop_count,
                last_hop: true,
                sender: sender.clone(),
                sender_time: self.time,
                receiver,
                receiver_time: child.time,
            });
            let descendants = child.collect_rows(hop_count + 1);
            if !descendants.is_empty() {
                rows.last_mut().expect("row just pushed").last_hop = false;
                rows.extend(descendants);
            }
        }
        rows
    }
}

/// Per-simulation frame arena. Frame numbers are assigned monotonically
/// from 0 and are unique within one simulation.
#[derive(Debug, Default)]
pub struct FrameStore {
    frames: Vec<Frame>,
}

impl FrameStore {
    /// Allocate a frame. Monitored frames additionally carry a trace
    /// recording creation time, hops and completion latency.
    pub(crate) fn alloc(
        &mut self,
        source: Address,
        destination: Address,
        payload: u32,
        priority: u8,
        headers: Vec<Header>,
        monitored: bool,
        now: f64,
    ) -> FrameId {
        let id = FrameId(u32::try_from(self.frames.len()).expect("frame arena overflow"));
        self.frames.push(Frame {
            id,
            source,
            destination,
            payload,
            headers,
            priority,
            trace: monitored.then(|| FrameTrace {
                created: now,
                latency: None,
                hops: HopTree::root(now),
            }),
        });
        id
    }

    #[must_use]
    pub fn get(&self, id: FrameId) -> &Frame {
        &self.frames[id.0 as usize]
    }

    pub(crate) fn get_mut(&mut self, id: FrameId) -> &mut Frame {
        &mut self.frames[id.0 as usize]
    }

    /// Number of frames created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// All frames in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_frame(payload: u32, monitored: bool) -> (FrameStore, FrameId) {
        let mut store = FrameStore::default();
        let id = store.alloc(
            "a".into(),
            "b".into(),
            payload,
            3,
            vec![Header::new(26, "ethernet")],
            monitored,
            0.0,
        );
        (store, id)
    }

    #[test]
    fn test_total_size_includes_headers() {
        let (store, id) = store_with_frame(1000, false);
        assert_eq!(store.get(id).total_size(), 1026);
    }

    #[test]
    fn test_empty_payload_keeps_header_bytes() {
        let (store, id) = store_with_frame(0, false);
        assert_eq!(store.get(id).total_size(), 26);
    }

    #[test]
    fn test_header_stacking() {
        let (mut store, id) = store_with_frame(100, false);
        store.get_mut(id).append_header(Header::new(8, "vlan"));
        assert_eq!(store.get(id).total_size(), 134);
        assert_eq!(store.get(id).peek_header().unwrap().tag, "vlan");
        let popped = store.get_mut(id).pop_header().unwrap();
        assert_eq!(popped.bytes, 8);
        assert_eq!(store.get(id).total_size(), 126);
    }

    #[test]
    fn test_hop_tree_linear_path() {
        let (mut store, id) = store_with_frame(0, true);
        let frame = store.get_mut(id);
        frame.record_hop(&"a".into(), &"sw".into(), 5.0);
        frame.record_hop(&"sw".into(), &"b".into(), 9.0);
        frame.record_destination_reached(9.0);

        let trace = store.get(id).trace().unwrap();
        assert_eq!(trace.latency, Some(9.0));
        let rows = trace.hops.hop_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].hop_count, 0);
        assert!(!rows[0].last_hop);
        assert_eq!(rows[1].hop_count, 1);
        assert!(rows[1].last_hop);
        assert_eq!(rows[1].receiver_time, 9.0);
    }

    #[test]
    fn test_hop_tree_broadcast_branches() {
        let (mut store, id) = store_with_frame(0, true);
        let frame = store.get_mut(id);
        frame.record_hop(&"a".into(), &"sw".into(), 2.0);
        frame.record_hop(&"sw".into(), &"b".into(), 4.0);
        frame.record_hop(&"sw".into(), &"c".into(), 6.0);

        let rows = store.get(id).trace().unwrap().hops.hop_rows();
        assert_eq!(rows.len(), 3);
        // Both broadcast legs are terminal.
        assert!(rows.iter().filter(|r| r.last_hop).count() == 2);
        assert!(rows.iter().all(|r| r.hop_count <= 1));
    }
}
