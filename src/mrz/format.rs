//! MRZ document formats and format selection

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standardized MRZ layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MrzFormat {
    /// ID card, three lines of 30 characters
    Td1,
    /// Official travel document, two lines of 36 characters
    Td2,
    /// Passport, two lines of 44 characters
    Td3,
}

impl MrzFormat {
    /// Selection preference when formats tie on discarded lines
    pub const PREFERENCE: [MrzFormat; 3] = [MrzFormat::Td3, MrzFormat::Td2, MrzFormat::Td1];

    /// Characters per line
    pub fn line_len(self) -> usize {
        match self {
            MrzFormat::Td1 => 30,
            MrzFormat::Td2 => 36,
            MrzFormat::Td3 => 44,
        }
    }

    /// Number of lines making up the zone
    pub fn line_count(self) -> usize {
        match self {
            MrzFormat::Td1 => 3,
            MrzFormat::Td2 | MrzFormat::Td3 => 2,
        }
    }
}

impl fmt::Display for MrzFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MrzFormat::Td1 => write!(f, "TD1"),
            MrzFormat::Td2 => write!(f, "TD2"),
            MrzFormat::Td3 => write!(f, "TD3"),
        }
    }
}

/// Pick the format to attempt given how many lines fit each width
///
/// `fits` reports the number of candidate lines that fit a format and
/// `total` is the number of alphabet-valid lines in the frame. Among formats
/// with enough fitting lines, the one discarding the fewest lines wins, with
/// ties going to the earlier entry of [`MrzFormat::PREFERENCE`].
pub fn select_format<F>(fits: F, total: usize) -> Option<MrzFormat>
where
    F: Fn(MrzFormat) -> usize,
{
    MrzFormat::PREFERENCE
        .iter()
        .copied()
        .filter(|format| fits(*format) >= format.line_count())
        .min_by_key(|format| total.saturating_sub(format.line_count()))
}
