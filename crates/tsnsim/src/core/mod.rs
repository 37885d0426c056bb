// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discrete-event kernel: virtual clock, event schedule, cooperative
//! processes.
//!
//! Time is virtual and measured in microseconds. A simulation run is a
//! single-threaded loop over the schedule heap; processes only ever
//! suspend by yielding a kernel event ([`Step::Wait`]) and the actions
//! between two yields are atomic with respect to every other process.

mod event;
mod kernel;
mod process;

pub use event::EventId;
pub use kernel::Kernel;
pub use process::{Cause, ProcessId, Step, Wake};

pub(crate) use event::EntryAction;
pub(crate) use process::ProcessState;

use crate::topology::{Address, PortId};

/// Fatal runtime errors of the engine.
///
/// Everything here is a protocol-misuse or configuration fault; it
/// propagates synchronously out of the run loop. Generator exhaustion is
/// not an error — it completes the stop event and ends the run.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// A transmission was paused although its sender was spawned without
    /// an inspector.
    MissingInspector,
    /// A frame carried a priority outside `0..=7`.
    InvalidPriority(u8),
    /// A node tried to transmit on a port with no connection.
    UnconnectedPort {
        /// Address of the sending node.
        address: Address,
        /// The port that has no link.
        port: PortId,
    },
    /// A buffer operation named a frame that is not queued in the
    /// addressed traffic class.
    FrameNotQueued(u64),
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingInspector => {
                write!(f, "transmission paused without an inspector")
            }
            Self::InvalidPriority(priority) => {
                write!(f, "frame priority {priority} outside 0..=7")
            }
            Self::UnconnectedPort { address, port } => {
                write!(f, "node {address} has no connection on port {port}")
            }
            Self::FrameNotQueued(frame) => {
                write!(f, "frame {frame} is not queued in its traffic class")
            }
        }
    }
}

impl std::error::Error for SimError {}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, SimError>;
