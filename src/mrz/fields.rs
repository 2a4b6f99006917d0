//! Structured fields decoded from a machine readable zone

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::format::MrzFormat;

/// Expiry dates resolve into `[reference - LOOKBACK, reference + (99 - LOOKBACK)]`
pub const EXPIRY_LOOKBACK_YEARS: i32 = 50;

/// Holder sex as printed in the zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    /// `M`
    Male,
    /// `F`
    Female,
    /// `<` or `X`
    Unspecified,
}

impl Sex {
    /// Parse the raw sex character, `None` for anything else
    pub fn from_mrz(c: char) -> Option<Self> {
        match c {
            'M' => Some(Sex::Male),
            'F' => Some(Sex::Female),
            '<' | 'X' => Some(Sex::Unspecified),
            _ => None,
        }
    }

    /// Character used when encoding
    pub fn as_mrz(self) -> char {
        match self {
            Sex::Male => 'M',
            Sex::Female => 'F',
            Sex::Unspecified => '<',
        }
    }
}

/// How a two-digit year is placed in a century
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRole {
    /// Latest year not after the reference year
    Birth,
    /// Year within the expiry window around the reference year
    Expiry,
}

/// Resolve a raw `YYMMDD` string to a calendar date
///
/// Returns `None` when the raw value is not six digits or does not name a
/// real calendar day.
pub fn resolve_date(raw: &str, role: DateRole, reference: NaiveDate) -> Option<NaiveDate> {
    if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let yy: i32 = raw[0..2].parse().ok()?;
    let month: u32 = raw[2..4].parse().ok()?;
    let day: u32 = raw[4..6].parse().ok()?;

    let ref_year = reference.year();
    let mut year = ref_year - ref_year.rem_euclid(100) + yy;
    match role {
        DateRole::Birth => {
            if year > ref_year {
                year -= 100;
            }
        }
        DateRole::Expiry => {
            if year < ref_year - EXPIRY_LOOKBACK_YEARS {
                year += 100;
            } else if year > ref_year + (99 - EXPIRY_LOOKBACK_YEARS) {
                year -= 100;
            }
        }
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Fields decoded from one frame's MRZ lines
///
/// Text values keep their raw ICAO encoding apart from trailing filler being
/// trimmed and, for names, fillers being read as spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedMrzFields {
    /// Layout the lines were decoded as
    pub format: MrzFormat,
    /// Document type code, e.g. `P` or `ID`
    pub document_type: String,
    /// Issuing state or organization
    pub issuing_state: String,
    /// Document (passport) number
    pub document_number: String,
    /// Holder nationality
    pub nationality: String,
    /// Birth date, raw `YYMMDD`
    pub birth_date: String,
    /// Holder sex
    pub sex: Sex,
    /// Expiry date, raw `YYMMDD`
    pub expiry_date: String,
    /// Primary identifier
    pub surname: String,
    /// Secondary identifier, components separated by spaces
    pub given_names: String,
    /// Personal number or first optional data field
    pub personal_number: Option<String>,
    /// Second optional data field (TD1 only)
    pub optional_data: Option<String>,
    /// Whether every check digit passed
    pub valid: bool,
    /// Normalized lines in document order
    pub raw_lines: Vec<String>,
}

impl DecodedMrzFields {
    /// Birth date placed in a century relative to `reference`
    pub fn birth_date_on(&self, reference: NaiveDate) -> Option<NaiveDate> {
        resolve_date(&self.birth_date, DateRole::Birth, reference)
    }

    /// Expiry date placed in a century relative to `reference`
    pub fn expiry_date_on(&self, reference: NaiveDate) -> Option<NaiveDate> {
        resolve_date(&self.expiry_date, DateRole::Expiry, reference)
    }

    /// Whether the document has expired as of `reference`
    pub fn is_expired_on(&self, reference: NaiveDate) -> Option<bool> {
        self.expiry_date_on(reference).map(|expiry| expiry < reference)
    }
}
