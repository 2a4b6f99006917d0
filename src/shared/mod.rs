//! Shared state and messaging between the caller and the scan worker
//!
//! This module provides thread-safe shared state and message passing
//! for communication across the frame-processing boundary.

pub mod messages;
pub mod state;

pub use messages::{CallerToScanner, ScannerToCaller};
pub use state::RuntimeState;
