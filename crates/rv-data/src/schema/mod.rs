//! Field type detection from sampled rows

use ahash::AHashSet;
use rv_core::catalog::builder::label_from_column;
use rv_core::dates::parse_temporal;
use rv_core::model::column_part;
use rv_core::{Field, FieldType, Row};

use crate::filter::{cell_number, cell_text, lookup};

/// Schema detector for analyzing rows and determining field types
pub struct SchemaDetector {
    sample_size: usize,
}

/// Statistics about a column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub null_count: usize,
    pub distinct_count: usize,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
}

/// A detected field with the statistics it was derived from
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedField {
    pub field: Field,
    pub stats: ColumnStats,
}

impl SchemaDetector {
    pub fn new() -> Self {
        Self { sample_size: 1000 }
    }

    /// Set the number of rows inspected
    pub fn with_sample_size(mut self, size: usize) -> Self {
        self.sample_size = size;
        self
    }

    /// Detect a field per key. Labels are derived from the column part of
    /// each key.
    pub fn detect(&self, keys: &[String], rows: &[Row]) -> Vec<DetectedField> {
        let sample = &rows[..rows.len().min(self.sample_size)];
        keys.iter()
            .map(|key| {
                let (field_type, stats) = Self::analyze_column(sample, key);
                DetectedField {
                    field: Field::new(key.clone(), label_from_column(column_part(key)), field_type),
                    stats,
                }
            })
            .collect()
    }

    fn analyze_column(rows: &[Row], key: &str) -> (FieldType, ColumnStats) {
        let mut null_count = 0;
        let mut values = Vec::new();
        let mut is_number = true;
        let mut is_date = true;

        for row in rows {
            let cell = lookup(row, key);
            let text = cell_text(cell);
            if text.is_empty() {
                null_count += 1;
                continue;
            }
            if is_number && cell_number(cell).is_none() {
                is_number = false;
            }
            if is_date && !Self::looks_like_date(&text) {
                is_date = false;
            }
            values.push(text);
        }

        let field_type = if values.is_empty() {
            FieldType::String
        } else if is_number {
            FieldType::Number
        } else if is_date {
            FieldType::Date
        } else {
            FieldType::String
        };

        let distinct_count = values.iter().collect::<AHashSet<_>>().len();
        let stats = ColumnStats {
            null_count,
            distinct_count,
            min_value: values.iter().min().cloned(),
            max_value: values.iter().max().cloned(),
        };

        (field_type, stats)
    }

    // Dates need a separator; bare numbers are numbers
    fn looks_like_date(value: &str) -> bool {
        (value.contains('-') || value.contains('/')) && parse_temporal(value).is_some()
    }
}

impl Default for SchemaDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Row> {
        vec![
            [
                ("employees.hire_date", json!("2021-04-01")),
                ("employees.salary", json!(5200)),
                ("employees.name", json!("Asha")),
            ],
            [
                ("employees.hire_date", json!("2019-11-15")),
                ("employees.salary", json!("4100.50")),
                ("employees.name", json!(null)),
            ],
        ]
        .into_iter()
        .map(|cells| cells.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
        .collect()
    }

    #[test]
    fn test_detects_types_and_labels() {
        let keys = vec![
            "employees.hire_date".to_string(),
            "employees.salary".to_string(),
            "employees.name".to_string(),
        ];
        let detected = SchemaDetector::new().detect(&keys, &rows());

        assert_eq!(detected[0].field.field_type, FieldType::Date);
        assert_eq!(detected[0].field.label, "Hire Date");
        assert_eq!(detected[1].field.field_type, FieldType::Number);
        assert_eq!(detected[2].field.field_type, FieldType::String);
        assert_eq!(detected[2].stats.null_count, 1);
        assert_eq!(detected[0].stats.min_value.as_deref(), Some("2019-11-15"));
    }

    #[test]
    fn test_empty_column_is_string() {
        let detected = SchemaDetector::new().detect(&["missing".to_string()], &rows());
        assert_eq!(detected[0].field.field_type, FieldType::String);
        assert_eq!(detected[0].stats.null_count, 2);
    }
}
