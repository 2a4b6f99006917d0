//! Analysis Layer
//!
//! Temporal consensus over per-frame MRZ reads. Decides when a decoded
//! result has been seen consistently enough to hand to the caller.

pub mod consensus;
pub mod events;
pub mod session;

pub use consensus::{ConsensusConfig, ConsensusError, ConsensusWindow, TrackedField};
pub use events::{ScanEvent, TimestampedEvent};
pub use session::{ScanPhase, ScanSession};
