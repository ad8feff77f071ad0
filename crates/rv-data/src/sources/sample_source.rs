//! Generated timesheet rows serving reports without a table mapping

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rv_core::config::SampleSettings;
use rv_core::dates::format_mm_dd_yyyy;
use rv_core::Row;
use serde_json::json;
use tracing::debug;

pub const EMPLOYEES: [&str; 5] = [
    "Sumit Khanvilkar",
    "Asha Patel",
    "Rahul Sharma",
    "Priya Mehta",
    "Ravi Kumar",
];

pub const LOCATIONS: [&str; 3] = ["Indore Office", "Mumbai Office", "Remote"];

pub const STATUSES: [&str; 2] = ["Active", "Inactive"];

const BREAKS: [i64; 3] = [30, 45, 60];

/// Columns shown for timesheet rows, with their display labels
pub const DEFAULT_COLUMNS: [(&str, &str); 7] = [
    ("date", "Date"),
    ("employee", "Employee"),
    ("clockIn", "In"),
    ("clockOut", "Out"),
    ("breakMins", "Break (m)"),
    ("totalMins", "Total (m)"),
    ("location", "Location"),
];

/// Keys holding dates in timesheet rows
pub const TEMPORAL_KEYS: [&str; 2] = ["date", "dateISO"];

/// Read-only set of generated rows, newest first
#[derive(Debug, Clone)]
pub struct SampleSource {
    rows: Vec<Row>,
}

impl SampleSource {
    /// Generate `count` rows, one per day going back from `anchor`.
    ///
    /// The same seed and anchor always produce the same rows.
    pub fn generate(count: usize, seed: u64, anchor: DateTime<Utc>) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let rows = (0..count)
            .map(|day| generate_row(&mut rng, anchor - Duration::days(day as i64)))
            .collect();

        debug!(count, seed, "generated sample rows");
        Self { rows }
    }

    /// Rows anchored at the current time
    pub fn from_settings(settings: &SampleSettings) -> Self {
        Self::generate(settings.row_count, settings.seed, Utc::now())
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn temporal_keys() -> Vec<String> {
        TEMPORAL_KEYS.iter().map(|k| k.to_string()).collect()
    }
}

fn generate_row(rng: &mut StdRng, at: DateTime<Utc>) -> Row {
    let clock_in: i64 = 9 + rng.gen_range(0..2);
    let clock_out: i64 = 17 + rng.gen_range(0..3);
    let break_mins = BREAKS[rng.gen_range(0..BREAKS.len())];
    let employee = EMPLOYEES[rng.gen_range(0..EMPLOYEES.len())];
    let in_minute: u32 = rng.gen_range(0..60);
    let out_minute: u32 = rng.gen_range(0..60);
    let location = LOCATIONS[rng.gen_range(0..LOCATIONS.len())];
    let status = if rng.gen::<f64>() > 0.1 { STATUSES[0] } else { STATUSES[1] };

    let mut row = Row::new();
    row.insert(
        "dateISO".to_string(),
        json!(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    row.insert("date".to_string(), json!(format_mm_dd_yyyy(&at)));
    row.insert("employee".to_string(), json!(employee));
    row.insert("clockIn".to_string(), json!(format!("{}:{:02} AM", clock_in, in_minute)));
    row.insert(
        "clockOut".to_string(),
        json!(format!("{}:{:02} PM", clock_out - 12, out_minute)),
    );
    row.insert("breakMins".to_string(), json!(break_mins));
    row.insert(
        "totalMins".to_string(),
        json!((clock_out - clock_in) * 60 - break_mins),
    );
    row.insert("location".to_string(), json!(location));
    row.insert("status".to_string(), json!(status));
    row
}
