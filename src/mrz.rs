//! # Machine-Readable Zone
//!
//! Builds the two 44-character MRZ lines printed at the bottom of a passport
//! information page.
//!
//! | Line | Layout |
//! |------|--------|
//! | 1 | `P<` country(3) `<<` last `<<` first, padded with `<` |
//! | 2 | number(9) `<` cd `<` nationality(3) `<` birth(6) `<` sex `<` expiry(6) `<` cd `<<` personal id(7) `<` cd |
//!
//! Check digits use the repeating weights 7, 3, 1 over `0-9` = 0–9,
//! `A-Z` = 10–35 and `<` = 0. The layout is a house format and is not a
//! complete ICAO 9303 implementation.

use chrono::NaiveDate;
use thiserror::Error;

use crate::data::DataRow;
use crate::template::MrzSpec;

pub const LINE_LENGTH: usize = 44;
pub const FILLER: char = '<';

const DOCUMENT_TYPE: char = 'P';
const CODE_LENGTH: usize = 3;
const NUMBER_LENGTH: usize = 9;
const PERSONAL_ID_LENGTH: usize = 7;
const WEIGHTS: [u32; 3] = [7, 3, 1];

/// Row keys the derived lines are stored under.
pub const LINE_1_KEY: &str = "mrz_line_1";
pub const LINE_2_KEY: &str = "mrz_line_2";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MrzError {
    #[error("column '{0}' is missing or empty")]
    MissingColumn(String),

    #[error("column '{column}' has '{value}', expected a YYYY/MM/DD date")]
    BadDate { column: String, value: String },
}

/// Value of one MRZ character for check digit purposes.
fn char_value(c: char) -> u32 {
    match c {
        '0'..='9' => c as u32 - '0' as u32,
        'A'..='Z' => c as u32 - 'A' as u32 + 10,
        _ => 0,
    }
}

/// Weighted check digit (0–9).
pub fn check_digit(data: &str) -> u32 {
    data.chars()
        .zip(WEIGHTS.iter().cycle())
        .map(|(c, w)| char_value(c) * w)
        .sum::<u32>()
        % 10
}

/// Uppercase and replace anything outside `[A-Z0-9<]` with the filler.
pub fn sanitize(s: &str) -> String {
    s.to_uppercase()
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() || c.is_ascii_digit() || c == FILLER {
                c
            } else {
                FILLER
            }
        })
        .collect()
}

/// Sanitize, then pad with the filler or truncate to exactly `len` characters.
pub fn sanitize_and_pad(s: &str, len: usize) -> String {
    let mut out: String = sanitize(s).chars().take(len).collect();
    while out.chars().count() < len {
        out.push(FILLER);
    }
    out
}

/// Convert `YYYY/MM/DD` to `YYMMDD`.
pub fn yymmdd(value: &str) -> Option<String> {
    NaiveDate::parse_from_str(value.trim(), "%Y/%m/%d")
        .ok()
        .map(|d| d.format("%y%m%d").to_string())
}

/// First MRZ line.
pub fn line1(country: &str, last_name: &str, first_name: &str) -> String {
    let prefix = format!(
        "{}{}{}{}{}",
        DOCUMENT_TYPE,
        FILLER,
        sanitize_and_pad(country, CODE_LENGTH),
        FILLER,
        FILLER
    );
    let names = format!("{}<<{}", sanitize(last_name), sanitize(first_name));
    let name_field = sanitize_and_pad(&names, LINE_LENGTH - prefix.len());
    prefix + &name_field
}

/// Inputs for the second line. Dates are already `YYMMDD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line2<'a> {
    pub document_number: &'a str,
    pub nationality: &'a str,
    pub birth: &'a str,
    pub sex: &'a str,
    pub expiry: &'a str,
    pub personal_id: &'a str,
}

/// Second MRZ line.
pub fn line2(input: &Line2<'_>) -> String {
    let number = sanitize_and_pad(input.document_number, NUMBER_LENGTH);
    let nationality = sanitize_and_pad(input.nationality, CODE_LENGTH);
    let birth = sanitize_and_pad(input.birth, 6);
    let sex = sanitize_and_pad(input.sex, 1);
    let expiry = sanitize_and_pad(input.expiry, 6);
    let personal = sanitize_and_pad(input.personal_id, PERSONAL_ID_LENGTH);

    format!(
        "{number}<{}<{nationality}<{birth}<{sex}<{expiry}<{}<<{personal}<{}",
        check_digit(&number),
        check_digit(&expiry),
        check_digit(&personal),
    )
}

/// Extend a record with `mrz_line_1` / `mrz_line_2` built from the columns
/// named in `spec`.
pub fn derive(spec: &MrzSpec, row: &DataRow) -> Result<DataRow, MrzError> {
    let required = |column: &str| {
        row.value(column)
            .ok_or_else(|| MrzError::MissingColumn(column.to_string()))
    };
    let date = |column: &str| -> Result<String, MrzError> {
        let value = required(column)?;
        yymmdd(value).ok_or_else(|| MrzError::BadDate {
            column: column.to_string(),
            value: value.to_string(),
        })
    };

    let first = line1(
        required(spec.country.as_str())?,
        required(spec.last_name.as_str())?,
        required(spec.first_name.as_str())?,
    );
    let birth = date(spec.birth_date.as_str())?;
    let expiry = date(spec.expiry_date.as_str())?;
    let personal_id = spec
        .personal_id
        .as_deref()
        .and_then(|column| row.value(column))
        .unwrap_or("");
    let second = line2(&Line2 {
        document_number: required(spec.document_number.as_str())?,
        nationality: required(spec.nationality.as_str())?,
        birth: &birth,
        sex: required(spec.sex.as_str())?,
        expiry: &expiry,
        personal_id,
    });

    Ok(row.with_values([(LINE_1_KEY, first), (LINE_2_KEY, second)]))
}
