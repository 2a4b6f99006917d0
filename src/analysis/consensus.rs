//! Per-field agreement windows
//!
//! Each tracked field keeps the last few raw values read for it. A value that
//! disagrees with anything in the window clears it and starts a new streak;
//! there is no voting or similarity scoring.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

use crate::mrz::DecodedMrzFields;

/// Default number of identical consecutive reads required per field
pub const DEFAULT_WINDOW_SIZE: usize = 3;

/// Smallest window that still rules out single-frame results
pub const MIN_WINDOW_SIZE: usize = 2;

/// Largest accepted window, about four seconds of camera frames
pub const MAX_WINDOW_SIZE: usize = 120;

/// Fields whose readings can be tracked for agreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedField {
    DocumentNumber,
    BirthDate,
    ExpiryDate,
    Surname,
    GivenNames,
    Nationality,
}

impl TrackedField {
    /// Fields tracked unless configured otherwise
    pub const DEFAULT: [TrackedField; 3] = [
        TrackedField::DocumentNumber,
        TrackedField::BirthDate,
        TrackedField::ExpiryDate,
    ];

    /// Raw value of this field in a decoded result
    pub fn value(self, fields: &DecodedMrzFields) -> &str {
        match self {
            TrackedField::DocumentNumber => &fields.document_number,
            TrackedField::BirthDate => &fields.birth_date,
            TrackedField::ExpiryDate => &fields.expiry_date,
            TrackedField::Surname => &fields.surname,
            TrackedField::GivenNames => &fields.given_names,
            TrackedField::Nationality => &fields.nationality,
        }
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackedField::DocumentNumber => "document_number",
            TrackedField::BirthDate => "birth_date",
            TrackedField::ExpiryDate => "expiry_date",
            TrackedField::Surname => "surname",
            TrackedField::GivenNames => "given_names",
            TrackedField::Nationality => "nationality",
        };
        write!(f, "{}", name)
    }
}

/// Invalid consensus configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    #[error("window size {0} is below the minimum of 2")]
    WindowTooSmall(usize),
    #[error("window size {0} exceeds the maximum of 120")]
    WindowTooLarge(usize),
    #[error("at least one field must be tracked")]
    NoTrackedFields,
    #[error("field {0} is tracked more than once")]
    DuplicateField(TrackedField),
}

/// Consensus policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Identical consecutive reads required per field
    pub window_size: usize,
    /// Fields that must each reach agreement
    pub tracked_fields: Vec<TrackedField>,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            tracked_fields: TrackedField::DEFAULT.to_vec(),
        }
    }
}

impl ConsensusConfig {
    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<(), ConsensusError> {
        if self.window_size < MIN_WINDOW_SIZE {
            return Err(ConsensusError::WindowTooSmall(self.window_size));
        }
        if self.window_size > MAX_WINDOW_SIZE {
            return Err(ConsensusError::WindowTooLarge(self.window_size));
        }
        if self.tracked_fields.is_empty() {
            return Err(ConsensusError::NoTrackedFields);
        }
        for (i, field) in self.tracked_fields.iter().enumerate() {
            if self.tracked_fields[..i].contains(field) {
                return Err(ConsensusError::DuplicateField(*field));
            }
        }
        Ok(())
    }
}

/// Recent readings of one field
#[derive(Debug, Clone)]
pub struct ConsensusWindow {
    capacity: usize,
    values: VecDeque<String>,
}

impl ConsensusWindow {
    /// Create an empty window holding at most `capacity` readings
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            values: VecDeque::new(),
        }
    }

    /// Record a reading
    ///
    /// Returns `true` when the reading disagreed with the window and
    /// restarted the streak.
    pub fn push(&mut self, value: &str) -> bool {
        let disagrees = self.values.iter().any(|v| v != value);
        if disagrees {
            self.values.clear();
        }
        self.values.push_back(value.to_string());
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
        disagrees
    }

    /// Number of agreeing readings held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the window is full of agreeing readings
    pub fn is_satisfied(&self) -> bool {
        self.values.len() >= self.capacity
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
