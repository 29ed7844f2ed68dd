//! Date normalization to the canonical `YYYY-MM-DD` form

use crate::{Error, Result, Value};
use chrono::{NaiveDate, NaiveDateTime};

/// Format of every date the engine emits
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Normalize a date-like value
///
/// Returns `None` for null and empty strings. Strings are trimmed and then
/// parsed strictly with `input_format`, or as ISO `YYYY-MM-DD` from their
/// first ten characters when no format is given.
pub fn normalize(value: &Value, input_format: Option<&str>) -> Result<Option<String>> {
    let date = match value {
        Value::Null => return Ok(None),
        Value::Date(date) => *date,
        Value::DateTime(datetime) => datetime.date(),
        Value::String(raw) => {
            // only the empty string means "no date"; whitespace must parse
            if raw.is_empty() {
                return Ok(None);
            }
            let text = raw.trim();
            match input_format {
                Some(format) => parse_with_format(text, format)?,
                None => parse_iso_prefix(text)?,
            }
        }
        other => {
            return Err(Error::InvalidDate {
                value: other.render(),
                format: input_format.map(str::to_string),
                reason: format!("expected a date or a string, got {}", other.type_name()),
            })
        }
    };

    Ok(Some(date.format(CANONICAL_DATE_FORMAT).to_string()))
}

fn parse_with_format(text: &str, format: &str) -> Result<NaiveDate> {
    match NaiveDate::parse_from_str(text, format) {
        Ok(date) => Ok(date),
        // formats carrying a time of day
        Err(date_err) => NaiveDateTime::parse_from_str(text, format)
            .map(|datetime| datetime.date())
            .map_err(|_| Error::InvalidDate {
                value: text.to_string(),
                format: Some(format.to_string()),
                reason: date_err.to_string(),
            }),
    }
}

fn parse_iso_prefix(text: &str) -> Result<NaiveDate> {
    let prefix: String = text.chars().take(10).collect();
    NaiveDate::parse_from_str(&prefix, CANONICAL_DATE_FORMAT).map_err(|e| Error::InvalidDate {
        value: text.to_string(),
        format: None,
        reason: e.to_string(),
    })
}
