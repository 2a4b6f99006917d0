//! Scan session state machine
//!
//! A session accumulates decoded frames and only hands out a result once
//! every tracked field has been read identically for a full window of
//! frames. Sessions own all of their state, so any number of scanners can run
//! side by side.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

use super::consensus::{ConsensusConfig, ConsensusError, ConsensusWindow, TrackedField};
use crate::mrz::DecodedMrzFields;

/// Progress of a scan, used to drive user feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    /// No MRZ seen yet
    Searching,
    /// Something MRZ-shaped decoded, but not all tracked fields
    Aligning,
    /// Tracked fields are being collected into their windows
    Scanning,
    /// Result emitted; nothing changes until reset
    Resolved,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanPhase::Searching => write!(f, "searching"),
            ScanPhase::Aligning => write!(f, "aligning"),
            ScanPhase::Scanning => write!(f, "scanning"),
            ScanPhase::Resolved => write!(f, "resolved"),
        }
    }
}

/// Consensus state for one scan attempt
///
/// Frames must be observed in capture order by a single consumer.
#[derive(Debug)]
pub struct ScanSession {
    id: Uuid,
    phase: ScanPhase,
    windows: Vec<(TrackedField, ConsensusWindow)>,
    result: Option<DecodedMrzFields>,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::from_valid_config(&ConsensusConfig::default())
    }
}

impl ScanSession {
    /// Create a session, rejecting unusable configurations up front
    pub fn new(config: &ConsensusConfig) -> Result<Self, ConsensusError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: &ConsensusConfig) -> Self {
        let windows = config
            .tracked_fields
            .iter()
            .map(|field| (*field, ConsensusWindow::new(config.window_size)))
            .collect();
        let session = Self {
            id: Uuid::new_v4(),
            phase: ScanPhase::Searching,
            windows,
            result: None,
        };
        debug!(session = %session.id, "Scan session created");
        session
    }

    /// Session identifier, renewed on every reset
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn is_resolved(&self) -> bool {
        self.phase == ScanPhase::Resolved
    }

    /// The emitted result, once resolved
    pub fn result(&self) -> Option<&DecodedMrzFields> {
        self.result.as_ref()
    }

    /// Readings currently held for `field`; zero for untracked fields
    pub fn window_len(&self, field: TrackedField) -> usize {
        self.windows
            .iter()
            .find(|(tracked, _)| *tracked == field)
            .map_or(0, |(_, window)| window.len())
    }

    /// Feed the parser's output for the next frame
    ///
    /// Returns the decoded fields exactly once, on the frame that completes
    /// the last window. `None` input leaves every window untouched.
    pub fn observe(&mut self, fields: Option<DecodedMrzFields>) -> Option<DecodedMrzFields> {
        if self.phase == ScanPhase::Resolved {
            return None;
        }
        let fields = fields?;

        if self.phase == ScanPhase::Searching {
            self.transition(ScanPhase::Aligning);
        }

        let complete = self
            .windows
            .iter()
            .all(|(field, _)| !field.value(&fields).is_empty());
        if complete && self.phase == ScanPhase::Aligning {
            self.transition(ScanPhase::Scanning);
        }
        if self.phase != ScanPhase::Scanning {
            return None;
        }

        for (field, window) in &mut self.windows {
            let value = field.value(&fields);
            if value.is_empty() {
                continue;
            }
            if window.push(value) {
                debug!(session = %self.id, "{} streak restarted at {}", field, value);
            }
        }

        let satisfied = self.windows.iter().all(|(_, window)| window.is_satisfied());
        if !(complete && satisfied) {
            return None;
        }

        self.transition(ScanPhase::Resolved);
        info!(
            session = %self.id,
            "Resolved document {} (valid: {})",
            fields.document_number, fields.valid
        );
        self.result = Some(fields.clone());
        Some(fields)
    }

    /// Clear all windows and start over
    pub fn reset(&mut self) {
        for (_, window) in &mut self.windows {
            window.clear();
        }
        self.result = None;
        self.phase = ScanPhase::Searching;
        self.id = Uuid::new_v4();
        info!(session = %self.id, "Scan session reset");
    }

    fn transition(&mut self, to: ScanPhase) {
        info!(session = %self.id, "Scan phase {} -> {}", self.phase, to);
        self.phase = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mrz::MrzParser;

    const LINE1: &str = "P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<";
    const LINE2: &str = "L898902C36UTO7408122F1204159ZE184226B<<<<<10";

    fn specimen() -> DecodedMrzFields {
        MrzParser::default().decode_lines([LINE1, LINE2]).unwrap()
    }

    fn with_number(number: &str) -> DecodedMrzFields {
        let line2 = LINE2.replacen("L898902C3", number, 1);
        MrzParser::default().decode_lines([LINE1, line2.as_str()]).unwrap()
    }

    #[test]
    fn test_resolves_on_third_agreeing_frame() {
        let mut session = ScanSession::default();
        assert_eq!(session.phase(), ScanPhase::Searching);

        assert!(session.observe(Some(specimen())).is_none());
        assert_eq!(session.phase(), ScanPhase::Scanning);
        assert!(session.observe(Some(specimen())).is_none());

        let result = session.observe(Some(specimen())).expect("third frame resolves");
        assert_eq!(result.surname, "ERIKSSON");
        assert_eq!(result.given_names, "ANNA MARIA");
        assert_eq!(result.sex, crate::mrz::Sex::Female);
        assert!(session.is_resolved());
        assert_eq!(session.result(), Some(&result));
    }

    #[test]
    fn test_single_character_slip_restarts_streak() {
        let mut session = ScanSession::default();

        session.observe(Some(with_number("L898902C3")));
        session.observe(Some(with_number("L898902C8")));
        assert_eq!(session.window_len(TrackedField::DocumentNumber), 1);

        let result = session.observe(Some(with_number("L898902C3")));
        assert!(result.is_none());
        assert_eq!(session.window_len(TrackedField::DocumentNumber), 1);
        assert_eq!(session.window_len(TrackedField::BirthDate), 3);
        assert!(!session.is_resolved());
    }

    #[test]
    fn test_disagreement_never_leaves_two() {
        let mut session = ScanSession::default();
        session.observe(Some(with_number("AAAAAAAAA")));
        session.observe(Some(with_number("BBBBBBBBB")));
        assert_eq!(session.window_len(TrackedField::DocumentNumber), 1);
    }

    #[test]
    fn test_none_does_not_touch_windows() {
        let mut session = ScanSession::default();
        assert!(session.observe(None).is_none());
        assert_eq!(session.phase(), ScanPhase::Searching);

        session.observe(Some(specimen()));
        session.observe(Some(specimen()));
        assert!(session.observe(None).is_none());
        assert_eq!(session.window_len(TrackedField::DocumentNumber), 2);

        // Absence is not disagreement: the next read completes the window
        assert!(session.observe(Some(specimen())).is_some());
    }

    #[test]
    fn test_resolved_is_idempotent() {
        let mut session = ScanSession::default();
        for _ in 0..3 {
            session.observe(Some(specimen()));
        }
        assert!(session.is_resolved());
        let id = session.id();

        assert!(session.observe(Some(specimen())).is_none());
        assert!(session.observe(Some(with_number("X00000000"))).is_none());
        assert!(session.observe(None).is_none());
        assert!(session.is_resolved());
        assert_eq!(session.window_len(TrackedField::DocumentNumber), 3);
        assert_eq!(session.id(), id);
    }

    #[test]
    fn test_reset_returns_to_searching() {
        let mut session = ScanSession::default();
        for _ in 0..3 {
            session.observe(Some(specimen()));
        }
        let id = session.id();
        session.reset();

        assert_eq!(session.phase(), ScanPhase::Searching);
        assert!(session.result().is_none());
        assert_eq!(session.window_len(TrackedField::DocumentNumber), 0);
        assert_ne!(session.id(), id);

        for _ in 0..2 {
            assert!(session.observe(Some(specimen())).is_none());
        }
        assert!(session.observe(Some(specimen())).is_some());
    }

    #[test]
    fn test_incomplete_frame_only_aligns() {
        let mut session = ScanSession::default();
        let mut partial = specimen();
        partial.document_number.clear();

        assert!(session.observe(Some(partial.clone())).is_none());
        assert_eq!(session.phase(), ScanPhase::Aligning);
        assert_eq!(session.window_len(TrackedField::BirthDate), 0);

        session.observe(Some(specimen()));
        assert_eq!(session.phase(), ScanPhase::Scanning);

        // Once scanning, present fields still advance and the empty one is skipped
        session.observe(Some(partial.clone()));
        assert_eq!(session.window_len(TrackedField::BirthDate), 2);
        assert_eq!(session.window_len(TrackedField::DocumentNumber), 1);

        session.observe(Some(partial));
        assert_eq!(session.window_len(TrackedField::BirthDate), 3);
        assert!(!session.is_resolved());
    }

    #[test]
    fn test_checksum_invalid_results_still_tracked() {
        let mut session = ScanSession::default();
        let invalid = with_number("L898902C8");
        assert!(!invalid.valid);

        session.observe(Some(invalid.clone()));
        session.observe(Some(invalid.clone()));
        let result = session.observe(Some(invalid)).unwrap();
        assert!(!result.valid);
        assert_eq!(result.document_number, "L898902C8");
    }

    #[test]
    fn test_custom_window_and_fields() {
        let config = ConsensusConfig {
            window_size: 2,
            tracked_fields: vec![TrackedField::DocumentNumber, TrackedField::Surname],
        };
        let mut session = ScanSession::new(&config).unwrap();
        assert!(session.observe(Some(specimen())).is_none());
        assert!(session.observe(Some(specimen())).is_some());
        assert_eq!(session.window_len(TrackedField::BirthDate), 0);
    }

    #[test]
    fn test_invalid_config_fails_at_construction() {
        let config = ConsensusConfig {
            window_size: 0,
            tracked_fields: TrackedField::DEFAULT.to_vec(),
        };
        assert!(ScanSession::new(&config).is_err());
    }

    #[test]
    fn test_oversized_window_is_an_error() {
        let config: ConsensusConfig = toml::from_str("window_size = 9223372036854775807").unwrap();
        assert_eq!(
            ScanSession::new(&config).err(),
            Some(ConsensusError::WindowTooLarge(9223372036854775807))
        );
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut first = ScanSession::default();
        let mut second = ScanSession::default();
        first.observe(Some(specimen()));
        first.observe(Some(specimen()));

        assert_eq!(second.window_len(TrackedField::DocumentNumber), 0);
        assert!(second.observe(Some(specimen())).is_none());
        assert!(first.observe(Some(specimen())).is_some());
        assert!(!second.is_resolved());
    }
}
