//! Message types for communication between the caller and the scan worker

use crate::analysis::TimestampedEvent;
use crate::capture::frame::OcrFrame;

/// Input sent from the caller to the scan worker
///
/// Frames and commands share one queue so a reset is applied exactly between
/// the frames submitted before and after it.
#[derive(Debug, Clone)]
pub enum CallerToScanner {
    /// Next recognized frame, in capture order
    Frame(OcrFrame),
    /// Discard all progress and start a new scan
    Reset,
    /// Stop the worker
    Shutdown,
}

/// Messages sent from the scan worker to the caller
#[derive(Debug, Clone)]
pub enum ScannerToCaller {
    /// Scan progress
    Event(TimestampedEvent),
    /// Worker has stopped
    Stopped,
}
