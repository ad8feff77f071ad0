//! Quick filters over the local timesheet rows

use chrono::{Days, NaiveDateTime};
use rv_core::dates::parse_temporal;
use rv_core::{QuickFilter, Row};

use super::{cell_text, lookup};

/// Key holding the machine-readable timestamp of a local row
pub const TIMESTAMP_KEY: &str = "dateISO";

/// Check a row against the quick filter.
///
/// The date range is inclusive on both ends, whole days. A row without a
/// readable timestamp fails any date constraint.
pub fn matches_quick(row: &Row, quick: &QuickFilter) -> bool {
    if quick.start_date.is_some() || quick.end_date.is_some() {
        let Some(at) = row_timestamp(row) else {
            return false;
        };
        if let Some(start) = quick.start_date.and_then(|d| d.and_hms_opt(0, 0, 0)) {
            if at < start {
                return false;
            }
        }
        if let Some(end) = quick
            .end_date
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            if at >= end {
                return false;
            }
        }
    }

    if let Some(location) = quick.location_constraint() {
        if cell_text(lookup(row, "location")) != location {
            return false;
        }
    }

    if let Some(status) = quick.status_constraint() {
        if cell_text(lookup(row, "status")) != status {
            return false;
        }
    }

    if let Some(term) = quick.search_term() {
        let haystack = serde_json::to_string(row).unwrap_or_default().to_lowercase();
        if !haystack.contains(&term.to_lowercase()) {
            return false;
        }
    }

    true
}

fn row_timestamp(row: &Row) -> Option<NaiveDateTime> {
    parse_temporal(&cell_text(lookup(row, TIMESTAMP_KEY)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn row(iso: &str, location: &str, status: &str) -> Row {
        let mut row = Row::new();
        row.insert("dateISO".to_string(), json!(iso));
        row.insert("employee".to_string(), json!("Priya Singh"));
        row.insert("location".to_string(), json!(location));
        row.insert("status".to_string(), json!(status));
        row
    }

    fn day(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2025, 3, d)
    }

    #[test]
    fn test_empty_quick_filter_matches() {
        assert!(matches_quick(&row("2025-03-10T08:00:00.000Z", "Remote", "Active"), &QuickFilter::default()));
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let r = row("2025-03-10T15:30:00.000Z", "Remote", "Active");
        let quick = QuickFilter {
            start_date: day(10),
            end_date: day(10),
            ..Default::default()
        };
        assert!(matches_quick(&r, &quick));

        let later = QuickFilter {
            start_date: day(11),
            ..Default::default()
        };
        assert!(!matches_quick(&r, &later));

        let earlier = QuickFilter {
            end_date: day(9),
            ..Default::default()
        };
        assert!(!matches_quick(&r, &earlier));
    }

    #[test]
    fn test_all_means_unconstrained() {
        let r = row("2025-03-10T08:00:00.000Z", "Remote", "Inactive");
        let quick = QuickFilter {
            location: Some("All".to_string()),
            status: Some("Inactive".to_string()),
            ..Default::default()
        };
        assert!(matches_quick(&r, &quick));

        let other = QuickFilter {
            location: Some("Indore Office".to_string()),
            ..Default::default()
        };
        assert!(!matches_quick(&r, &other));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let r = row("2025-03-10T08:00:00.000Z", "Remote", "Active");
        let quick = QuickFilter {
            search: Some("PRIYA".to_string()),
            ..Default::default()
        };
        assert!(matches_quick(&r, &quick));
    }
}
