//! Stable row sorting
//!
//! The comparison mode is chosen once per sort for the whole column: temporal
//! for date keys, numeric when every non-empty cell parses as a number, text
//! otherwise. Choosing per column keeps the ordering total.

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use rv_core::dates::parse_temporal;
use rv_core::model::column_part;
use rv_core::{Direction, Row, SortSpec};

use crate::filter::{cell_number, cell_text, lookup};

/// How a column is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Temporal,
    Numeric,
    Text,
}

impl SortMode {
    /// Pick the mode for `key` over the given rows
    pub fn detect(rows: &[Row], key: &str, temporal_keys: &[String]) -> Self {
        let is_temporal = temporal_keys
            .iter()
            .any(|k| k == key || k == column_part(key));
        if is_temporal {
            return SortMode::Temporal;
        }

        let mut saw_number = false;
        for row in rows {
            let cell = lookup(row, key);
            if cell_text(cell).is_empty() {
                continue;
            }
            if cell_number(cell).is_none() {
                return SortMode::Text;
            }
            saw_number = true;
        }

        if saw_number {
            SortMode::Numeric
        } else {
            SortMode::Text
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Temporal(Option<NaiveDateTime>),
    Numeric(Option<f64>),
    Text(String),
}

impl SortKey {
    fn extract(row: &Row, key: &str, mode: SortMode) -> Self {
        let cell = lookup(row, key);
        match mode {
            SortMode::Temporal => SortKey::Temporal(parse_temporal(&cell_text(cell))),
            SortMode::Numeric => SortKey::Numeric(cell_number(cell)),
            SortMode::Text => SortKey::Text(cell_text(cell)),
        }
    }

    // Missing and unparseable values sort first
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Temporal(a), SortKey::Temporal(b)) => a.cmp(b),
            (SortKey::Numeric(a), SortKey::Numeric(b)) => match (a, b) {
                (Some(a), Some(b)) => a.total_cmp(b),
                (a, b) => a.is_some().cmp(&b.is_some()),
            },
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Sort rows in place. Rows with equal keys keep their relative order, and a
/// descending sort reverses the comparison rather than the result.
pub fn sort_rows(rows: &mut Vec<Row>, sort: &SortSpec, temporal_keys: &[String]) {
    if rows.len() < 2 {
        return;
    }

    let mode = SortMode::detect(rows, &sort.key, temporal_keys);
    let mut keyed: Vec<(SortKey, Row)> = rows
        .drain(..)
        .map(|row| (SortKey::extract(&row, &sort.key, mode), row))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| {
        let ordering = a.compare(b);
        match sort.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    });

    rows.extend(keyed.into_iter().map(|(_, row)| row));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn row(id: i64, key: &str, value: Value) -> Row {
        let mut row = Row::new();
        row.insert("id".to_string(), json!(id));
        row.insert(key.to_string(), value);
        row
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    #[test]
    fn test_numeric_column() {
        let mut rows = vec![
            row(1, "mins", json!("100")),
            row(2, "mins", json!(9)),
            row(3, "mins", json!(45.5)),
        ];
        sort_rows(&mut rows, &SortSpec::asc("mins"), &[]);
        assert_eq!(ids(&rows), vec![2, 3, 1]);
    }

    #[test]
    fn test_mixed_column_falls_back_to_text() {
        let mut rows = vec![
            row(1, "code", json!("9")),
            row(2, "code", json!("10")),
            row(3, "code", json!("abc")),
        ];
        sort_rows(&mut rows, &SortSpec::asc("code"), &[]);
        assert_eq!(ids(&rows), vec![2, 1, 3]);
    }

    #[test]
    fn test_temporal_column_with_unparseable_first() {
        let mut rows = vec![
            row(1, "date", json!("03/02/2025")),
            row(2, "date", json!("garbage")),
            row(3, "date", json!("12/31/2024")),
        ];
        let temporal = vec!["date".to_string()];
        sort_rows(&mut rows, &SortSpec::asc("date"), &temporal);
        assert_eq!(ids(&rows), vec![2, 3, 1]);

        sort_rows(&mut rows, &SortSpec::desc("date"), &temporal);
        assert_eq!(ids(&rows), vec![1, 3, 2]);
    }

    #[test]
    fn test_ties_stay_stable_in_both_directions() {
        let mut rows = vec![
            row(1, "loc", json!("Remote")),
            row(2, "loc", json!("Indore Office")),
            row(3, "loc", json!("Remote")),
            row(4, "loc", json!("Indore Office")),
        ];
        sort_rows(&mut rows, &SortSpec::asc("loc"), &[]);
        assert_eq!(ids(&rows), vec![2, 4, 1, 3]);

        sort_rows(&mut rows, &SortSpec::desc("loc"), &[]);
        assert_eq!(ids(&rows), vec![1, 3, 2, 4]);
    }

    #[test]
    fn test_sort_is_deterministic() {
        let build = || {
            (0..20)
                .map(|i| row(i, "n", json!((i * 7) % 5)))
                .collect::<Vec<_>>()
        };
        let mut a = build();
        let mut b = build();
        sort_rows(&mut a, &SortSpec::desc("n"), &[]);
        sort_rows(&mut b, &SortSpec::desc("n"), &[]);
        assert_eq!(a, b);
    }
}
