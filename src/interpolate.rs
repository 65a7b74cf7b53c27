//! # Record Interpolation
//!
//! Replaces `{key}` placeholders with values from a [`DataRow`]. Used for
//! text field values, output directories and output file names.
//!
//! `{{` and `}}` produce literal braces. A placeholder naming a column the
//! record does not have is an error rather than an empty substitution, so a
//! typo in a template never silently produces a wrong document.

use thiserror::Error;

use crate::data::DataRow;

/// Errors produced while interpolating a template string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpolationError {
    #[error("unknown key '{key}' in '{template}'")]
    UnknownKey { key: String, template: String },

    #[error("unclosed '{{' in '{0}'")]
    Unclosed(String),

    #[error("unmatched '}}' in '{0}'")]
    Unmatched(String),

    #[error("empty placeholder in '{0}'")]
    EmptyKey(String),
}

/// A parsed piece of a template string.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Brace(char),
    Key(&'a str),
}

fn parse(template: &str) -> Result<Vec<Segment<'_>>, InterpolationError> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(idx) = rest.find(['{', '}']) {
        if idx > 0 {
            segments.push(Segment::Literal(&rest[..idx]));
        }
        let tail = &rest[idx..];
        if tail.starts_with("{{") {
            segments.push(Segment::Brace('{'));
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            segments.push(Segment::Brace('}'));
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            return Err(InterpolationError::Unmatched(template.to_string()));
        } else {
            let close = tail
                .find('}')
                .ok_or_else(|| InterpolationError::Unclosed(template.to_string()))?;
            let key = tail[1..close].trim();
            if key.is_empty() {
                return Err(InterpolationError::EmptyKey(template.to_string()));
            }
            if key.contains('{') {
                return Err(InterpolationError::Unclosed(template.to_string()));
            }
            segments.push(Segment::Key(key));
            rest = &tail[close + 1..];
        }
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    Ok(segments)
}

/// True if the string contains placeholder syntax worth interpolating.
pub fn has_placeholders(s: &str) -> bool {
    s.contains('{') && s.contains('}')
}

/// Check a template string's syntax and return the keys it references.
pub fn placeholders(template: &str) -> Result<Vec<&str>, InterpolationError> {
    Ok(parse(template)?
        .into_iter()
        .filter_map(|seg| match seg {
            Segment::Key(key) => Some(key),
            _ => None,
        })
        .collect())
}

/// Interpolate `{key}` placeholders against a record.
///
/// ```
/// use idforge::data::DataRow;
/// use idforge::interpolate::interpolate;
///
/// let row = DataRow::from_pairs([("id_number", "A100000003")]);
/// assert_eq!(interpolate("{id_number}/id", &row).unwrap(), "A100000003/id");
/// assert!(interpolate("{missing}", &row).is_err());
/// ```
pub fn interpolate(template: &str, row: &DataRow) -> Result<String, InterpolationError> {
    let mut out = String::with_capacity(template.len());
    for segment in parse(template)? {
        match segment {
            Segment::Literal(s) => out.push_str(s),
            Segment::Brace(c) => out.push(c),
            Segment::Key(key) => {
                let value = row.get(key).ok_or_else(|| InterpolationError::UnknownKey {
                    key: key.to_string(),
                    template: template.to_string(),
                })?;
                out.push_str(value);
            }
        }
    }
    Ok(out)
}
