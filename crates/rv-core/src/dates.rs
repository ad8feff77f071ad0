//! Date parsing and display helpers

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Parse a value as a point in time.
///
/// Accepts RFC 3339 timestamps (normalized to UTC), naive ISO date-times,
/// `YYYY-MM-DD` and `MM/DD/YYYY`.
pub fn parse_temporal(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }

    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Format a date as `MM/DD/YYYY`
pub fn format_mm_dd_yyyy<D: Datelike>(date: &D) -> String {
    format!("{:02}/{:02}/{:04}", date.month(), date.day(), date.year())
}

/// Reformat any parseable temporal string as `MM/DD/YYYY`; empty when unparseable
pub fn reformat_mm_dd_yyyy(value: &str) -> String {
    parse_temporal(value)
        .map(|dt| format_mm_dd_yyyy(&dt))
        .unwrap_or_default()
}
