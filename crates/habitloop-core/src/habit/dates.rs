//! Calendar-day helpers shared by the occurrence engine and the stores.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::error::{CoreError, Result};

/// Wire format for calendar days.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Parse a strict `YYYY-MM-DD` calendar day.
///
/// # Errors
/// Returns [`CoreError::InvalidDate`] for anything else, including
/// date-times and unpadded fields.
pub fn parse_day(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.len() != 10 {
        return Err(CoreError::invalid_date(value));
    }
    NaiveDate::parse_from_str(trimmed, DAY_FORMAT).map_err(|_| CoreError::invalid_date(value))
}

/// Parse a habit creation stamp and truncate it to its calendar day.
///
/// Accepts a plain day, an RFC 3339 date-time (the day in its own offset)
/// or a naive `YYYY-MM-DDTHH:MM:SS[.fff]` date-time.
pub fn parse_created_at(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    if let Ok(day) = parse_day(trimmed) {
        return Ok(day);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt.date());
        }
    }
    Err(CoreError::invalid_date(value))
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// The date in `year`/`month` carrying `day`, or the month's last day when
/// the month is too short.
pub fn clamped_day(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day.min(days_in_month(year, month)))
}

/// Turn stored completion strings into calendar days.
///
/// A malformed record is dropped with a warning rather than failing the
/// whole set.
pub fn parse_completion_set<I, S>(records: I) -> BTreeSet<NaiveDate>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    records
        .into_iter()
        .filter_map(|record| {
            let record = record.as_ref();
            match parse_day(record) {
                Ok(day) => Some(day),
                Err(_) => {
                    tracing::warn!(record, "dropping malformed completion date");
                    None
                }
            }
        })
        .collect()
}
