//! Event system for scan progress
//!
//! Events emitted by the scan worker so the interactive side can update its
//! feedback and receive the final result.

use std::time::Instant;

use super::session::ScanPhase;
use crate::mrz::DecodedMrzFields;

/// Things that can happen while scanning
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// Session moved to a new phase
    PhaseChanged {
        from: ScanPhase,
        to: ScanPhase,
    },
    /// Document framing crossed the alignment threshold
    AlignmentChanged {
        aligned: bool,
    },
    /// Consensus reached; emitted once per session
    Resolved(DecodedMrzFields),
    /// A frame arrived out of capture order and was ignored
    FrameDropped {
        sequence: u64,
        last_sequence: u64,
    },
}

/// A timestamped scan event
#[derive(Debug, Clone)]
pub struct TimestampedEvent {
    /// The event
    pub event: ScanEvent,
    /// When it occurred
    pub timestamp: Instant,
}

impl TimestampedEvent {
    /// Stamp an event with the current time
    pub fn now(event: ScanEvent) -> Self {
        Self {
            event,
            timestamp: Instant::now(),
        }
    }
}
