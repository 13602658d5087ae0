use chrono::NaiveDate;

use crate::error::{ProcessingError, Result};

/// Parse a possibly-partial date from the station directory.
///
/// The listing abbreviates observation start/end dates to month and year
/// (`"Jan 1900"`); missing components default to the first of the month, the
/// way the original ingest treated them.
///
/// # Examples
/// ```
/// use bom_processor::utils::dates::parse_partial_date;
///
/// let date = parse_partial_date("Jan 1900").unwrap();
/// assert_eq!(date.to_string(), "1900-01-01");
/// ```
pub fn parse_partial_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%d %b %Y") {
        return Ok(date);
    }
    // Month-year only: complete with day 1.
    if let Ok(date) = NaiveDate::parse_from_str(&format!("1 {}", trimmed), "%d %b %Y") {
        return Ok(date);
    }

    Err(ProcessingError::InvalidFormat(format!(
        "Unrecognized date: '{}'",
        trimmed
    )))
}

/// Pull the date out of the directory's `Produced: <date>` banner line.
pub fn parse_produced_date(line: &str) -> Option<NaiveDate> {
    let raw = line.split("Produced:").nth(1)?.trim();
    // The banner may carry a trailing time zone or full stop.
    let raw = raw.trim_end_matches('.');
    NaiveDate::parse_from_str(raw, "%d %b %Y")
        .ok()
        .or_else(|| parse_partial_date(raw).ok())
}
