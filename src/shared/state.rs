//! Runtime state shared between the scan worker and the caller

use crate::analysis::ScanPhase;

/// Counters and status that are not persisted
#[derive(Debug, Clone)]
pub struct RuntimeState {
    /// Whether the scan worker is running
    pub is_running: bool,
    /// Current phase of the active session
    pub phase: ScanPhase,
    /// Whether the last non-blank frame was aligned
    pub aligned: bool,
    /// Frames handed to the worker
    pub frames_received: u64,
    /// Frames in which an MRZ was decoded
    pub frames_decoded: u64,
    /// Frames ignored for arriving out of order
    pub frames_dropped: u64,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            is_running: false,
            phase: ScanPhase::Searching,
            aligned: false,
            frames_received: 0,
            frames_decoded: 0,
            frames_dropped: 0,
        }
    }
}

impl RuntimeState {
    /// Clear per-session counters after a reset
    pub fn reset_session(&mut self) {
        self.phase = ScanPhase::Searching;
        self.aligned = false;
        self.frames_received = 0;
        self.frames_decoded = 0;
        self.frames_dropped = 0;
    }
}
