//! ICAO 9303 check digit computation
//!
//! Weights cycle 7, 3, 1 over the field. Digits keep their value, letters map
//! to 10-35 and the filler character counts as zero.

/// Filler character used to pad MRZ fields
pub const FILLER: char = '<';

const WEIGHTS: [u32; 3] = [7, 3, 1];

/// Numeric value of a single MRZ character
///
/// Returns `None` for characters outside the MRZ alphabet.
pub fn char_value(c: char) -> Option<u32> {
    match c {
        '0'..='9' => c.to_digit(10),
        'A'..='Z' => Some(c as u32 - 'A' as u32 + 10),
        FILLER => Some(0),
        _ => None,
    }
}

/// Compute the check digit for a field
pub fn compute(field: &str) -> Option<u32> {
    let mut sum = 0;
    for (i, c) in field.chars().enumerate() {
        sum += char_value(c)? * WEIGHTS[i % WEIGHTS.len()];
    }
    Some(sum % 10)
}

/// Check a field against the digit printed in its check position
pub fn verify(field: &str, check: char) -> bool {
    match check.to_digit(10) {
        Some(expected) => compute(field) == Some(expected),
        None => false,
    }
}

/// Like [`verify`], but a filler check character is also accepted for an
/// all-filler field
///
/// Only optional fields such as the TD3 personal number may leave their
/// check position blank.
pub fn verify_optional(field: &str, check: char) -> bool {
    if check == FILLER {
        return field.chars().all(|c| c == FILLER);
    }
    verify(field, check)
}

/// Outcome of validating one check-digit protected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CheckDigitResult {
    /// Which field was checked
    pub field: &'static str,
    /// Character printed on the document
    pub expected: char,
    /// Digit computed from the field contents
    pub computed: Option<u32>,
    /// Whether the two agree
    pub valid: bool,
}

impl CheckDigitResult {
    pub(crate) fn check(field: &'static str, value: &str, expected: char) -> Self {
        Self {
            field,
            expected,
            computed: compute(value),
            valid: verify(value, expected),
        }
    }

    /// Check an optional field, whose blank check position is legitimate
    pub(crate) fn check_optional(field: &'static str, value: &str, expected: char) -> Self {
        Self {
            valid: verify_optional(value, expected),
            ..Self::check(field, value, expected)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_values() {
        assert_eq!(char_value('0'), Some(0));
        assert_eq!(char_value('9'), Some(9));
        assert_eq!(char_value('A'), Some(10));
        assert_eq!(char_value('Z'), Some(35));
        assert_eq!(char_value('<'), Some(0));
        assert_eq!(char_value('a'), None);
        assert_eq!(char_value(' '), None);
    }

    #[test]
    fn test_specimen_check_digits() {
        // ICAO 9303 specimen passport
        assert_eq!(compute("L898902C3"), Some(6));
        assert_eq!(compute("740812"), Some(2));
        assert_eq!(compute("120415"), Some(9));
        assert_eq!(compute("ZE184226B<<<<<"), Some(1));
    }

    #[test]
    fn test_verify() {
        assert!(verify("740812", '2'));
        assert!(!verify("740812", '3'));
        assert!(!verify("740812", 'X'));
        assert!(verify("<<<<<<<<<<<<<<", '0'));
    }

    #[test]
    fn test_filler_check_only_for_optional_fields() {
        // A misread filler over a real zero check digit must not pass
        assert_eq!(compute("740810"), Some(0));
        assert!(!verify("740810", '<'));
        assert!(!verify("<<<<<<<<<<<<<<", '<'));

        assert!(verify_optional("<<<<<<<<<<<<<<", '<'));
        assert!(verify_optional("<<<<<<<<<<<<<<", '0'));
        assert!(verify_optional("ZE184226B<<<<<", '1'));
        assert!(!verify_optional("ZE184226B<<<<<", '<'));
    }

    #[test]
    fn test_invalid_character_has_no_check_digit() {
        assert_eq!(compute("L89-902C3"), None);
        assert!(!verify("L89-902C3", '6'));
    }

    #[test]
    fn test_check_digit_result() {
        let result = CheckDigitResult::check("document_number", "L898902C3", '6');
        assert!(result.valid);
        assert_eq!(result.computed, Some(6));

        let result = CheckDigitResult::check("document_number", "L898902C8", '6');
        assert!(!result.valid);

        let result = CheckDigitResult::check_optional("personal_number", "<<<<<<<<<<<<<<", '<');
        assert!(result.valid);
        assert_eq!(result.computed, Some(0));
    }
}
