//! Machine Readable Zone decoding
//!
//! Locates MRZ lines among a frame's recognized text, classifies the document
//! format (TD1, TD2, TD3), decodes the fixed-offset fields and validates the
//! ICAO 9303 check digits. Checksum failures are reported through
//! [`DecodedMrzFields::valid`] rather than by rejecting the frame.

pub mod check_digit;
pub mod encode;
pub mod fields;
pub mod format;
pub mod parser;

pub use encode::encode;
pub use fields::{resolve_date, DateRole, DecodedMrzFields, Sex};
pub use format::MrzFormat;
pub use parser::{decode, MrzParser};
