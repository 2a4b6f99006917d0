//! MRZ line detection and field decoding
//!
//! Turns the raw text lines recognized in one frame into [`DecodedMrzFields`].
//! Frames without a machine readable zone are the common case and simply
//! decode to `None`.

use tracing::{debug, trace};

use super::check_digit::{CheckDigitResult, FILLER};
use super::fields::{DecodedMrzFields, Sex};
use super::format::{select_format, MrzFormat};
use crate::vision::{TextBlock, TextLine};

/// Default number of filler characters OCR may drop or invent at a line end
pub const DEFAULT_FILLER_SLACK: usize = 2;

/// Largest slack that keeps every line within reach of a single format width
///
/// The closest widths (TD1 and TD2) are 6 apart, so a slack of 3 would let a
/// 33 character line fit both.
pub const MAX_FILLER_SLACK: usize = 2;

/// Upper bound on same-width lines considered when assigning line roles
const MAX_CANDIDATES: usize = 6;

/// Expected character class at one position of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Not used to discriminate line roles
    Any,
    /// `0-9`
    Digit,
    /// `A-Z`
    Letter,
    /// `A-Z` or filler
    Text,
    /// `M`, `F`, `X` or filler
    Sex,
    /// Digit or filler
    Check,
}

impl Slot {
    fn accepts(self, c: u8) -> bool {
        match self {
            Slot::Any => false,
            Slot::Digit => c.is_ascii_digit(),
            Slot::Letter => c.is_ascii_uppercase(),
            Slot::Text => c.is_ascii_uppercase() || c == b'<',
            Slot::Sex => matches!(c, b'M' | b'F' | b'X' | b'<'),
            Slot::Check => c.is_ascii_digit() || c == b'<',
        }
    }
}

/// Character class expected at `pos` of line `line` in `format`
fn slot(format: MrzFormat, line: usize, pos: usize) -> Slot {
    match (format, line) {
        (MrzFormat::Td1, 0) => match pos {
            0 => Slot::Letter,
            1..=4 => Slot::Text,
            14 => Slot::Check,
            _ => Slot::Any,
        },
        (MrzFormat::Td1, 1) => match pos {
            0..=6 | 8..=14 | 29 => Slot::Digit,
            7 => Slot::Sex,
            15..=17 => Slot::Text,
            _ => Slot::Any,
        },
        (MrzFormat::Td1, _) => Slot::Text,
        (_, 0) => match pos {
            0 => Slot::Letter,
            _ => Slot::Text,
        },
        (format, _) => {
            let last = format.line_len() - 1;
            match pos {
                9 | 19 | 27 => Slot::Digit,
                10..=12 => Slot::Text,
                13..=18 | 21..=26 => Slot::Digit,
                20 => Slot::Sex,
                p if p == last => Slot::Digit,
                p if format == MrzFormat::Td3 && p == last - 1 => Slot::Check,
                _ => Slot::Any,
            }
        }
    }
}

/// How well `text` fits the shape of line `line` in `format`
fn line_score(format: MrzFormat, line: usize, text: &str) -> usize {
    text.bytes()
        .enumerate()
        .filter(|(pos, c)| slot(format, line, *pos).accepts(*c))
        .count()
}

/// Decodes MRZ lines from recognized text
#[derive(Debug, Clone)]
pub struct MrzParser {
    max_filler_slack: usize,
}

impl Default for MrzParser {
    fn default() -> Self {
        Self::new(DEFAULT_FILLER_SLACK)
    }
}

impl MrzParser {
    /// Create a parser tolerating `max_filler_slack` missing or extra
    /// trailing fillers per line
    pub fn new(max_filler_slack: usize) -> Self {
        Self { max_filler_slack }
    }

    /// Decode the lines of one frame
    pub fn decode(&self, lines: &[TextLine]) -> Option<DecodedMrzFields> {
        self.decode_lines(lines.iter().map(|line| line.text.as_str()))
    }

    /// Decode every line of every block in one frame
    pub fn decode_blocks(&self, blocks: &[TextBlock]) -> Option<DecodedMrzFields> {
        self.decode_lines(
            blocks
                .iter()
                .flat_map(|block| block.lines.iter())
                .map(|line| line.text.as_str()),
        )
    }

    /// Decode raw text lines in any order
    pub fn decode_lines<'a, I>(&self, lines: I) -> Option<DecodedMrzFields>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let normalized: Vec<String> = lines
            .into_iter()
            .flat_map(str::lines)
            .filter_map(normalize_line)
            .collect();

        if normalized.is_empty() {
            return None;
        }

        let fitted = |format: MrzFormat| -> Vec<String> {
            normalized
                .iter()
                .filter_map(|line| self.fit_to_width(line, format.line_len()))
                .collect()
        };

        let format = select_format(|format| fitted(format).len(), normalized.len())?;
        let ordered = arrange(format, &fitted(format))?;

        let decoded = match format {
            MrzFormat::Td1 => decode_td1(&ordered),
            MrzFormat::Td2 | MrzFormat::Td3 => decode_two_line(format, &ordered),
        }?;

        debug!(
            "Decoded {} zone, document {} (valid: {})",
            format, decoded.document_number, decoded.valid
        );
        Some(decoded)
    }

    /// Bring a line to exactly `width` characters, if only trailing fillers differ
    fn fit_to_width(&self, line: &str, width: usize) -> Option<String> {
        let len = line.len();
        if len == width {
            return Some(line.to_string());
        }
        if len > width {
            let excess = &line[width..];
            if len - width <= self.max_filler_slack && excess.chars().all(|c| c == FILLER) {
                return Some(line[..width].to_string());
            }
            return None;
        }
        if width - len <= self.max_filler_slack && line.ends_with(FILLER) {
            let mut padded = line.to_string();
            padded.extend(std::iter::repeat(FILLER).take(width - len));
            return Some(padded);
        }
        None
    }
}

/// Decode with default settings
pub fn decode(lines: &[TextLine]) -> Option<DecodedMrzFields> {
    MrzParser::default().decode(lines)
}

/// Strip whitespace and uppercase; `None` if anything outside the MRZ alphabet remains
fn normalize_line(text: &str) -> Option<String> {
    let line: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if line.is_empty() {
        return None;
    }
    if !line
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == FILLER)
    {
        trace!("Skipping non-MRZ line: {}", line);
        return None;
    }
    Some(line)
}

/// Choose and order the lines making up the zone
///
/// Every ordered selection of `line_count` candidates is scored against the
/// format's line shapes. OCR order wins ties.
fn arrange(format: MrzFormat, candidates: &[String]) -> Option<Vec<String>> {
    let candidates = &candidates[..candidates.len().min(MAX_CANDIDATES)];
    let count = format.line_count();
    if candidates.len() < count {
        return None;
    }

    let mut best: Option<(usize, Vec<usize>)> = None;
    let mut current = Vec::with_capacity(count);
    search(format, candidates, count, &mut current, &mut best);

    best.map(|(_, picks)| picks.into_iter().map(|i| candidates[i].clone()).collect())
}

fn search(
    format: MrzFormat,
    candidates: &[String],
    count: usize,
    current: &mut Vec<usize>,
    best: &mut Option<(usize, Vec<usize>)>,
) {
    if current.len() == count {
        let score: usize = current
            .iter()
            .enumerate()
            .map(|(line, &i)| line_score(format, line, &candidates[i]))
            .sum();
        if best.as_ref().map_or(true, |(top, _)| score > *top) {
            *best = Some((score, current.clone()));
        }
        return;
    }
    for i in 0..candidates.len() {
        if current.contains(&i) {
            continue;
        }
        current.push(i);
        search(format, candidates, count, current, best);
        current.pop();
    }
}

fn trim_filler(field: &str) -> String {
    field.trim_end_matches(FILLER).to_string()
}

fn optional_field(field: &str) -> Option<String> {
    let trimmed = field.trim_matches(FILLER);
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Split the name field into surname and given names
fn split_names(field: &str) -> (String, String) {
    let field = field.trim_end_matches(FILLER);
    let (primary, secondary) = field.split_once("<<").unwrap_or((field, ""));
    let join = |part: &str| {
        part.split(FILLER)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    };
    (join(primary), join(secondary))
}

/// Document number, its check character and what is left of the optional data
///
/// Numbers longer than nine characters put a filler in the check position
/// and continue into the optional data, ending with the real check digit.
fn document_number(field: &str, check: char, optional: &str) -> (String, char, String) {
    if check == FILLER {
        let extension: String = optional.chars().take_while(|c| *c != FILLER).collect();
        if let Some(real_check) = extension.chars().last() {
            let number = format!("{}{}", field, &extension[..extension.len() - 1]);
            let rest = optional[extension.len()..].to_string();
            return (number, real_check, rest);
        }
    }
    (field.to_string(), check, optional.to_string())
}

fn char_at(line: &str, pos: usize) -> char {
    line.as_bytes()[pos] as char
}

fn validity(checks: &[CheckDigitResult]) -> bool {
    for check in checks.iter().filter(|c| !c.valid) {
        debug!(
            "Check digit mismatch on {}: printed {}, computed {:?}",
            check.field, check.expected, check.computed
        );
    }
    checks.iter().all(|c| c.valid)
}

fn decode_two_line(format: MrzFormat, lines: &[String]) -> Option<DecodedMrzFields> {
    let (upper, lower) = (&lines[0], &lines[1]);
    let last = format.line_len() - 1;

    if !upper.as_bytes()[0].is_ascii_uppercase() {
        return None;
    }
    let sex = Sex::from_mrz(char_at(lower, 20))?;

    let (surname, given_names) = split_names(&upper[5..]);
    // Passport numbers never overflow into the personal number
    let (number, number_check, optional) = match format {
        MrzFormat::Td2 => document_number(&lower[0..9], char_at(lower, 9), &lower[28..last]),
        _ => (lower[0..9].to_string(), char_at(lower, 9), lower[28..42].to_string()),
    };

    let mut checks = vec![
        CheckDigitResult::check("document_number", &number, number_check),
        CheckDigitResult::check("birth_date", &lower[13..19], char_at(lower, 19)),
        CheckDigitResult::check("expiry_date", &lower[21..27], char_at(lower, 27)),
    ];
    if format == MrzFormat::Td3 {
        checks.push(CheckDigitResult::check_optional(
            "personal_number",
            &lower[28..42],
            char_at(lower, 42),
        ));
    }
    let composite = format!("{}{}{}", &lower[0..10], &lower[13..20], &lower[21..last]);
    checks.push(CheckDigitResult::check("composite", &composite, char_at(lower, last)));

    Some(DecodedMrzFields {
        format,
        document_type: trim_filler(&upper[0..2]),
        issuing_state: trim_filler(&upper[2..5]),
        document_number: trim_filler(&number),
        nationality: trim_filler(&lower[10..13]),
        birth_date: lower[13..19].to_string(),
        sex,
        expiry_date: lower[21..27].to_string(),
        surname,
        given_names,
        personal_number: optional_field(&optional),
        optional_data: None,
        valid: validity(&checks),
        raw_lines: lines.to_vec(),
    })
}

fn decode_td1(lines: &[String]) -> Option<DecodedMrzFields> {
    let (upper, middle, lower) = (&lines[0], &lines[1], &lines[2]);

    if !upper.as_bytes()[0].is_ascii_uppercase() {
        return None;
    }
    let sex = Sex::from_mrz(char_at(middle, 7))?;

    let (number, number_check, optional) =
        document_number(&upper[5..14], char_at(upper, 14), &upper[15..30]);
    let (surname, given_names) = split_names(lower);

    let composite = format!(
        "{}{}{}{}",
        &upper[5..30],
        &middle[0..7],
        &middle[8..15],
        &middle[18..29]
    );
    let checks = [
        CheckDigitResult::check("document_number", &number, number_check),
        CheckDigitResult::check("birth_date", &middle[0..6], char_at(middle, 6)),
        CheckDigitResult::check("expiry_date", &middle[8..14], char_at(middle, 14)),
        CheckDigitResult::check("composite", &composite, char_at(middle, 29)),
    ];

    Some(DecodedMrzFields {
        format: MrzFormat::Td1,
        document_type: trim_filler(&upper[0..2]),
        issuing_state: trim_filler(&upper[2..5]),
        document_number: trim_filler(&number),
        nationality: trim_filler(&middle[15..18]),
        birth_date: middle[0..6].to_string(),
        sex,
        expiry_date: middle[8..14].to_string(),
        surname,
        given_names,
        personal_number: optional_field(&optional),
        optional_data: optional_field(&middle[18..29]),
        valid: validity(&checks),
        raw_lines: lines.to_vec(),
    })
}
