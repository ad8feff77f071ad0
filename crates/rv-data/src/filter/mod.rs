//! Row filtering
//!
//! Cells are compared as numbers when both the cell and the filter value
//! parse as numbers, and as their text rendering otherwise. Text matching is
//! case-sensitive.

pub mod quick;
pub mod sql;

use rv_core::model::column_part;
use rv_core::{Condition, FilterItem, FilterSet, Logic, Row};
use serde_json::Value;

pub use quick::matches_quick;
pub use sql::{translate, SqlFragment, SqlParam};

/// Look a key up in a row, falling back to its column part for
/// `table.column` keys.
pub fn lookup<'a>(row: &'a Row, key: &str) -> Option<&'a Value> {
    row.get(key).or_else(|| row.get(column_part(key)))
}

/// Text rendering of a cell; missing and null cells render empty
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Numeric reading of a cell, if it has one
pub fn cell_number(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_number(s),
        _ => None,
    }
}

/// Parse user-entered text as a finite number; blank text is not a number
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Evaluate a single filter item against a row
pub fn item_matches(row: &Row, item: &FilterItem) -> bool {
    let cell = lookup(row, &item.field);
    let target = item.value.as_str();

    match item.condition {
        Condition::Eq => equals(cell, target),
        Condition::Neq => !equals(cell, target),
        Condition::Gt => match (cell_number(cell), parse_number(target)) {
            (Some(a), Some(b)) => a > b,
            _ => cell_text(cell).as_str() > target,
        },
        Condition::Lt => match (cell_number(cell), parse_number(target)) {
            (Some(a), Some(b)) => a < b,
            _ => cell_text(cell).as_str() < target,
        },
        Condition::Contains => cell_text(cell).contains(target),
        Condition::Starts => cell_text(cell).starts_with(target),
        Condition::Ends => cell_text(cell).ends_with(target),
    }
}

fn equals(cell: Option<&Value>, target: &str) -> bool {
    match (cell_number(cell), parse_number(target)) {
        (Some(a), Some(b)) => a == b,
        _ => cell_text(cell) == target,
    }
}

/// Evaluate a filter set against a row.
///
/// Items with an empty value are ignored; with no active item left every
/// row matches, whatever the logic.
pub fn matches(row: &Row, filters: Option<&FilterSet>) -> bool {
    let Some(filters) = filters else {
        return true;
    };
    if !filters.has_active_items() {
        return true;
    }

    match filters.logic {
        Logic::And => filters.active_items().all(|item| item_matches(row, item)),
        Logic::Or => filters.active_items().any(|item| item_matches(row, item)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(total: i64, location: &str) -> Row {
        let mut row = Row::new();
        row.insert("employee".to_string(), json!("Rahul Sharma"));
        row.insert("totalMins".to_string(), json!(total));
        row.insert("location".to_string(), json!(location));
        row
    }

    #[test]
    fn test_numeric_comparison() {
        let r = row(480, "Remote");
        assert!(item_matches(&r, &FilterItem::new("totalMins", Condition::Gt, "400")));
        assert!(!item_matches(&r, &FilterItem::new("totalMins", Condition::Lt, "90")));
        assert!(item_matches(&r, &FilterItem::new("totalMins", Condition::Eq, "480.0")));
        assert!(item_matches(&r, &FilterItem::new("totalMins", Condition::Neq, "479")));
    }

    #[test]
    fn test_text_comparison_is_case_sensitive() {
        let r = row(480, "Mumbai Office");
        assert!(item_matches(&r, &FilterItem::new("location", Condition::Contains, "Office")));
        assert!(!item_matches(&r, &FilterItem::new("location", Condition::Contains, "office")));
        assert!(item_matches(&r, &FilterItem::new("location", Condition::Starts, "Mum")));
        assert!(item_matches(&r, &FilterItem::new("location", Condition::Ends, "fice")));
        assert!(item_matches(&r, &FilterItem::new("location", Condition::Gt, "Indore")));
    }

    #[test]
    fn test_missing_field_reads_as_empty() {
        let r = row(480, "Remote");
        assert!(!item_matches(&r, &FilterItem::new("status", Condition::Eq, "Active")));
        assert!(item_matches(&r, &FilterItem::new("status", Condition::Neq, "Active")));
    }

    #[test]
    fn test_qualified_key_falls_back_to_column() {
        let r = row(480, "Remote");
        assert!(item_matches(&r, &FilterItem::new("timesheet.location", Condition::Eq, "Remote")));
    }

    #[test]
    fn test_and_or_logic() {
        let r = row(480, "Remote");
        let hit = FilterItem::new("location", Condition::Eq, "Remote");
        let miss = FilterItem::new("totalMins", Condition::Lt, "100");

        assert!(!matches(&r, Some(&FilterSet::all(vec![hit.clone(), miss.clone()]))));
        assert!(matches(&r, Some(&FilterSet::any(vec![hit, miss]))));
    }

    #[test]
    fn test_inactive_items_match_everything() {
        let r = row(480, "Remote");
        let blank = FilterItem::new("location", Condition::Eq, "");
        assert!(matches(&r, Some(&FilterSet::any(vec![blank.clone()]))));
        assert!(matches(&r, Some(&FilterSet::all(vec![blank]))));
        assert!(matches(&r, Some(&FilterSet::any(Vec::new()))));
        assert!(matches(&r, None));
    }
}
