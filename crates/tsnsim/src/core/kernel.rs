// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The virtual-time kernel.
//!
//! Owns the clock, the event arena, the process arena and the schedule
//! heap. The kernel never calls into process state machines itself — the
//! simulation run loop pops entries, checks processes out of the arena,
//! resumes them against the world, and parks them back. This keeps the
//! kernel free of borrows into the rest of the simulation.
//!
//! # Ordering contract
//!
//! Entries due at the same virtual instant fire in FIFO order of
//! scheduling, except that interrupt deliveries are urgent: a process
//! waiting on an event that is due at the same instant observes the
//! interrupt, never the completion. The interrupted event counts as
//! consumed for that process.

use std::collections::BinaryHeap;

use super::event::{Entry, EntryAction, EntryClass, EventId, EventSlot};
use super::process::{Cause, ProcessId, ProcessState};
use crate::channel::SendInspector;

/// One slot in the process arena.
#[derive(Debug)]
struct Proc {
    /// The state machine; `None` while checked out by the run loop or
    /// after the process finished.
    state: Option<ProcessState>,
    /// Event this process is parked on, if any.
    waiting: Option<EventId>,
    /// Fires when the process finishes; other processes may park on it.
    completion: EventId,
    done: bool,
}

/// Virtual-time cooperative scheduler state.
#[derive(Debug)]
pub struct Kernel {
    now: f64,
    seq: u64,
    heap: BinaryHeap<Entry>,
    events: Vec<EventSlot>,
    procs: Vec<Proc>,
    /// Shared event that never fires; parked on by idle engines and
    /// paused transmissions. Wake-up happens through interrupts only.
    sleep_event: EventId,
}

impl Kernel {
    #[must_use]
    pub(crate) fn new() -> Self {
        let mut kernel = Self {
            now: 0.0,
            seq: 0,
            heap: BinaryHeap::new(),
            events: Vec::new(),
            procs: Vec::new(),
            sleep_event: EventId(0),
        };
        kernel.sleep_event = kernel.new_event();
        kernel
    }

    /// Current virtual time in µs.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.now
    }

    /// The shared never-firing event.
    #[must_use]
    pub fn sleep_event(&self) -> EventId {
        self.sleep_event
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn push(&mut self, time: f64, class: EntryClass, action: EntryAction) {
        let seq = self.next_seq();
        self.heap.push(Entry {
            time,
            class,
            seq,
            action,
        });
    }

    /// Allocate a fresh event that only fires via [`succeed`](Self::succeed).
    pub fn new_event(&mut self) -> EventId {
        let id = EventId(u32::try_from(self.events.len()).expect("event arena overflow"));
        self.events.push(EventSlot::default());
        id
    }

    /// Allocate an event that fires `delta` µs from now.
    pub fn timeout(&mut self, delta: f64) -> EventId {
        debug_assert!(delta >= 0.0, "negative timeout");
        let id = self.new_event();
        self.events[id.0 as usize].triggered = true;
        self.push(self.now + delta, EntryClass::Normal, EntryAction::Fire(id));
        id
    }

    /// Schedule `event` to fire at the current instant.
    ///
    /// Succeeding an already-triggered event is a no-op, so several
    /// exhausted sources may all complete the stop event.
    pub fn succeed(&mut self, event: EventId) {
        let slot = &mut self.events[event.0 as usize];
        if slot.triggered {
            return;
        }
        slot.triggered = true;
        self.push(self.now, EntryClass::Normal, EntryAction::Fire(event));
    }

    /// True once the event fired and its waiters were resumed.
    #[must_use]
    pub fn event_fired(&self, event: EventId) -> bool {
        self.events[event.0 as usize].fired
    }

    /// Register a process and schedule its initial start at the current
    /// instant (urgent, so build-time processes run before ordinary
    /// events of the first tick).
    pub(crate) fn spawn(&mut self, state: ProcessState) -> ProcessId {
        let completion = self.new_event();
        let pid = ProcessId(u32::try_from(self.procs.len()).expect("process arena overflow"));
        self.procs.push(Proc {
            state: Some(state),
            waiting: None,
            completion,
            done: false,
        });
        self.push(self.now, EntryClass::Urgent, EntryAction::Resume(pid));
        pid
    }

    /// The event that fires when `pid` finishes.
    #[must_use]
    pub fn completion_event(&self, pid: ProcessId) -> EventId {
        self.procs[pid.0 as usize].completion
    }

    /// True once the completion event of `pid` fired.
    #[must_use]
    pub fn process_completed(&self, pid: ProcessId) -> bool {
        self.event_fired(self.procs[pid.0 as usize].completion)
    }

    /// Deliver an interrupt to `pid` at the current instant.
    ///
    /// The process's currently-awaited event is consumed immediately; the
    /// wake-up itself is queued urgent so it lands before any ordinary
    /// event due at the same instant. Interrupting a finished process is
    /// a no-op.
    pub fn interrupt(&mut self, pid: ProcessId, cause: Cause) {
        if self.procs[pid.0 as usize].done {
            return;
        }
        self.detach(pid);
        self.push(self.now, EntryClass::Urgent, EntryAction::Deliver(pid, cause));
    }

    /// Remove `pid` from the waiter list of whatever it is parked on.
    fn detach(&mut self, pid: ProcessId) {
        if let Some(event) = self.procs[pid.0 as usize].waiting.take() {
            self.events[event.0 as usize].waiters.retain(|p| *p != pid);
        }
    }

    /// Inspector of the in-flight transmission run by `pid`, if `pid` is
    /// a sender spawned with one.
    #[must_use]
    pub(crate) fn send_inspector(&self, pid: ProcessId) -> Option<&SendInspector> {
        match self.procs[pid.0 as usize].state {
            Some(ProcessState::Send(ref send)) => send.inspector(),
            _ => None,
        }
    }

    // --- run-loop plumbing -------------------------------------------------

    /// Check a process state machine out of the arena for resumption.
    pub(crate) fn take_state(&mut self, pid: ProcessId) -> Option<ProcessState> {
        self.procs[pid.0 as usize].state.take()
    }

    /// Park a checked-out process on `event`.
    ///
    /// Parking on an event that already fired schedules an immediate
    /// normal wake-up instead of waiting forever.
    pub(crate) fn park(&mut self, pid: ProcessId, state: ProcessState, event: EventId) {
        self.procs[pid.0 as usize].state = Some(state);
        if self.events[event.0 as usize].fired {
            self.push(self.now, EntryClass::Normal, EntryAction::Resume(pid));
        } else {
            self.procs[pid.0 as usize].waiting = Some(event);
            self.events[event.0 as usize].waiters.push(pid);
        }
    }

    /// Retire a finished process and fire its completion event.
    pub(crate) fn finish(&mut self, pid: ProcessId) {
        let completion = {
            let proc = &mut self.procs[pid.0 as usize];
            proc.done = true;
            proc.waiting = None;
            proc.completion
        };
        self.succeed(completion);
    }

    /// True if the process still exists and has not finished.
    pub(crate) fn alive(&self, pid: ProcessId) -> bool {
        !self.procs[pid.0 as usize].done
    }

    /// Install a run-loop sentinel at `time` (urgent, so events scheduled
    /// exactly at `time` stay unprocessed — the run ends first).
    pub(crate) fn sentinel_at(&mut self, time: f64) {
        self.push(time, EntryClass::Urgent, EntryAction::Sentinel);
    }

    /// Pop the next due entry and advance the clock to it.
    pub(crate) fn pop_entry(&mut self) -> Option<Entry> {
        let entry = self.heap.pop()?;
        debug_assert!(entry.time >= self.now, "virtual time went backwards");
        self.now = self.now.max(entry.time);
        Some(entry)
    }

    /// Mark `event` fired and hand its waiters (in arrival order) to the
    /// run loop for resumption.
    pub(crate) fn begin_fire(&mut self, event: EventId) -> Vec<ProcessId> {
        let slot = &mut self.events[event.0 as usize];
        slot.fired = true;
        let waiters = std::mem::take(&mut slot.waiters);
        for pid in &waiters {
            self.procs[pid.0 as usize].waiting = None;
        }
        waiters
    }

    /// Consume the current wait of `pid` ahead of an interrupt delivery.
    ///
    /// Returns false if the process finished in the meantime and the
    /// delivery must be dropped.
    pub(crate) fn begin_deliver(&mut self, pid: ProcessId) -> bool {
        if self.procs[pid.0 as usize].done {
            return false;
        }
        self.detach(pid);
        true
    }
}
