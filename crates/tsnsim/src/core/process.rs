// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cooperative processes.
//!
//! Every long-running entity of the simulator (a channel transmission, a
//! switch port engine, a traffic source) is a state machine over its wait
//! states, advanced by the kernel whenever the event it parked on fires or
//! an interrupt is delivered. The kernel stores exactly one pending event
//! per process.

use super::event::EventId;
use super::SimError;
use crate::channel::SendProcess;
use crate::node::injector::InjectorWorker;
use crate::node::source::{FlowWorker, SinglePacketWorker};
use crate::sim::Ctx;
use crate::switch::port::PortEngine;

/// Handle to a cooperative process.
///
/// Process slots are never reclaimed within a run; a handle stays valid
/// (and keeps answering [`completed`](crate::core::Kernel::process_completed))
/// after the process finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(pub(crate) u32);

/// Why a process was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    /// A frame arrived at a buffer the interrupted process drains.
    NewFrame,
    /// A port engine pauses the current transmission (preemption).
    StopSending,
    /// A port engine resumes a previously paused transmission.
    ContinueSending,
}

/// What woke a process up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The awaited event fired normally (also used for the initial start).
    Fired,
    /// An interrupt consumed the awaited event.
    Interrupt(Cause),
}

/// What a process does next after being resumed.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Park on the given event until it fires or an interrupt arrives.
    Wait(EventId),
    /// The process is finished; its completion event fires.
    Done,
}

/// Discriminated union over every process state machine in the simulator.
#[derive(Debug)]
pub(crate) enum ProcessState {
    /// A frame in flight on a channel.
    Send(SendProcess),
    /// A switch output port engine.
    Port(PortEngine),
    /// A generator-driven traffic source on one port.
    Flow(FlowWorker),
    /// A one-shot packet source.
    SinglePacket(SinglePacketWorker),
    /// A side-channel frame injector.
    Injector(InjectorWorker),
}

impl ProcessState {
    pub(crate) fn resume(&mut self, ctx: &mut Ctx<'_>, wake: Wake) -> Result<Step, SimError> {
        match self {
            Self::Send(p) => p.resume(ctx, wake),
            Self::Port(p) => p.resume(ctx, wake),
            Self::Flow(p) => p.resume(ctx, wake),
            Self::SinglePacket(p) => p.resume(ctx, wake),
            Self::Injector(p) => p.resume(ctx, wake),
        }
    }
}
