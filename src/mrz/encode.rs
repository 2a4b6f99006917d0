//! Encode decoded fields back into MRZ lines
//!
//! Produces lines with freshly computed check digits, so the output always
//! validates regardless of the `valid` flag on the input.

use super::check_digit::{compute, FILLER};
use super::fields::DecodedMrzFields;
use super::format::MrzFormat;

/// Render `fields` as the lines of its format, in document order
pub fn encode(fields: &DecodedMrzFields) -> Vec<String> {
    match fields.format {
        MrzFormat::Td1 => encode_td1(fields),
        MrzFormat::Td2 | MrzFormat::Td3 => encode_two_line(fields),
    }
}

fn pad(value: &str, width: usize) -> String {
    let mut field: String = value.chars().take(width).collect();
    let len = field.chars().count();
    field.extend(std::iter::repeat(FILLER).take(width - len));
    field
}

fn check_char(field: &str) -> char {
    compute(field)
        .and_then(|d| char::from_digit(d, 10))
        .unwrap_or(FILLER)
}

fn name_field(fields: &DecodedMrzFields, width: usize) -> String {
    let join = |names: &str| names.split_whitespace().collect::<Vec<_>>().join("<");
    let mut name = join(&fields.surname);
    if !fields.given_names.trim().is_empty() {
        name.push_str("<<");
        name.push_str(&join(&fields.given_names));
    }
    pad(&name, width)
}

/// Document number field, its check character and the optional data
///
/// Numbers over nine characters overflow into the optional data.
fn number_and_optional(number: &str, optional: &str, optional_width: usize) -> (String, char, String) {
    if number.len() <= 9 {
        let field = pad(number, 9);
        let check = check_char(&field);
        return (field, check, pad(optional, optional_width));
    }
    let mut overflow = format!("{}{}", &number[9..], check_char(number));
    if !optional.is_empty() {
        overflow.push(FILLER);
        overflow.push_str(optional);
    }
    (number[..9].to_string(), FILLER, pad(&overflow, optional_width))
}

fn encode_two_line(fields: &DecodedMrzFields) -> Vec<String> {
    let format = fields.format;
    let width = format.line_len();
    let upper = format!(
        "{}{}{}",
        pad(&fields.document_type, 2),
        pad(&fields.issuing_state, 3),
        name_field(fields, width - 5)
    );

    let personal = fields.personal_number.as_deref().unwrap_or("");
    let (number, number_check, optional) = if format == MrzFormat::Td3 {
        let field = pad(&fields.document_number, 9);
        let check = check_char(&field);
        let personal_field = pad(personal, 14);
        let personal_check = if personal.is_empty() {
            FILLER
        } else {
            check_char(&personal_field)
        };
        (field, check, format!("{}{}", personal_field, personal_check))
    } else {
        number_and_optional(&fields.document_number, personal, 7)
    };

    let birth = pad(&fields.birth_date, 6);
    let expiry = pad(&fields.expiry_date, 6);
    let mut lower = format!(
        "{}{}{}{}{}{}{}{}{}",
        number,
        number_check,
        pad(&fields.nationality, 3),
        birth,
        check_char(&birth),
        fields.sex.as_mrz(),
        expiry,
        check_char(&expiry),
        optional
    );
    let composite = format!("{}{}{}", &lower[0..10], &lower[13..20], &lower[21..]);
    lower.push(check_char(&composite));

    vec![upper, lower]
}

fn encode_td1(fields: &DecodedMrzFields) -> Vec<String> {
    let personal = fields.personal_number.as_deref().unwrap_or("");
    let (number, number_check, optional) =
        number_and_optional(&fields.document_number, personal, 15);
    let upper = format!(
        "{}{}{}{}{}",
        pad(&fields.document_type, 2),
        pad(&fields.issuing_state, 3),
        number,
        number_check,
        optional
    );

    let birth = pad(&fields.birth_date, 6);
    let expiry = pad(&fields.expiry_date, 6);
    let mut middle = format!(
        "{}{}{}{}{}{}{}",
        birth,
        check_char(&birth),
        fields.sex.as_mrz(),
        expiry,
        check_char(&expiry),
        pad(&fields.nationality, 3),
        pad(fields.optional_data.as_deref().unwrap_or(""), 11)
    );
    let composite = format!(
        "{}{}{}{}",
        &upper[5..30],
        &middle[0..7],
        &middle[8..15],
        &middle[18..29]
    );
    middle.push(check_char(&composite));

    vec![upper, middle, name_field(fields, 30)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mrz::fields::Sex;
    use crate::mrz::parser::MrzParser;

    fn specimen(format: MrzFormat) -> DecodedMrzFields {
        DecodedMrzFields {
            format,
            document_type: (if format == MrzFormat::Td3 { "P" } else { "I" }).to_string(),
            issuing_state: "UTO".to_string(),
            document_number: (if format == MrzFormat::Td3 { "L898902C3" } else { "D23145890" })
                .to_string(),
            nationality: "UTO".to_string(),
            birth_date: "740812".to_string(),
            sex: Sex::Female,
            expiry_date: "120415".to_string(),
            surname: "ERIKSSON".to_string(),
            given_names: "ANNA MARIA".to_string(),
            personal_number: (format == MrzFormat::Td3).then(|| "ZE184226B".to_string()),
            optional_data: None,
            valid: true,
            raw_lines: vec![],
        }
    }

    fn round_trip(fields: &DecodedMrzFields) -> DecodedMrzFields {
        let lines = encode(fields);
        MrzParser::default()
            .decode_lines(lines.iter().map(String::as_str))
            .expect("encoded lines should decode")
    }

    #[test]
    fn test_encode_td3_matches_specimen() {
        let lines = encode(&specimen(MrzFormat::Td3));
        assert_eq!(
            lines,
            vec![
                "P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<",
                "L898902C36UTO7408122F1204159ZE184226B<<<<<10",
            ]
        );
    }

    #[test]
    fn test_encode_td1_matches_specimen() {
        let lines = encode(&specimen(MrzFormat::Td1));
        assert_eq!(
            lines,
            vec![
                "I<UTOD231458907<<<<<<<<<<<<<<<",
                "7408122F1204159UTO<<<<<<<<<<<6",
                "ERIKSSON<<ANNA<MARIA<<<<<<<<<<",
            ]
        );
    }

    #[test]
    fn test_round_trip_reproduces_fields() {
        for format in MrzFormat::PREFERENCE {
            let original = specimen(format);
            let decoded = round_trip(&original);
            assert_eq!(decoded.raw_lines, encode(&original));
            assert_eq!(
                DecodedMrzFields { raw_lines: vec![], ..decoded },
                original,
                "{} round trip",
                format
            );
        }
    }

    #[test]
    fn test_round_trip_long_document_number() {
        let mut original = specimen(MrzFormat::Td1);
        original.document_number = "D23145890123".to_string();
        original.personal_number = Some("X1".to_string());
        original.optional_data = Some("OPT".to_string());

        let decoded = round_trip(&original);
        assert_eq!(decoded.document_number, "D23145890123");
        assert_eq!(decoded.personal_number.as_deref(), Some("X1"));
        assert_eq!(decoded.optional_data.as_deref(), Some("OPT"));
        assert!(decoded.valid);
    }

    #[test]
    fn test_encode_without_given_names() {
        let mut original = specimen(MrzFormat::Td3);
        original.given_names = String::new();
        original.personal_number = None;

        let decoded = round_trip(&original);
        assert_eq!(decoded.surname, "ERIKSSON");
        assert_eq!(decoded.given_names, "");
        assert_eq!(decoded.personal_number, None);
        assert!(decoded.valid);
    }
}
