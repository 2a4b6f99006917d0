//! MrzScanner - machine readable zone decoding with temporal consensus
//!
//! Decodes TD1, TD2 and TD3 machine readable zones from recognized text and
//! only reports a document once its key fields have been read identically
//! across consecutive frames.

pub mod analysis;
pub mod app;
pub mod capture;
pub mod config;
pub mod mrz;
pub mod shared;
pub mod storage;
pub mod vision;

pub use analysis::{ScanPhase, ScanSession};
pub use app::ScannerApp;
pub use config::AppConfig;
pub use mrz::{DecodedMrzFields, MrzFormat, MrzParser};
