//! Report, field, filter and query types shared across the workspace

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ReportError;

/// A single data row: field key to scalar value, in column order.
pub type Row = IndexMap<String, serde_json::Value>;

/// Type of a report field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    String,
    Number,
    Date,
    Masked,
}

/// A named, typed attribute of a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Canonical key, optionally `table.column`
    pub field: String,

    /// Display name, editable independently of `field`
    pub label: String,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    #[serde(default)]
    pub format: String,

    #[serde(default)]
    pub calculation: String,

    #[serde(default)]
    pub required: bool,
}

impl Field {
    pub fn new(field: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            field: field.into(),
            label: label.into(),
            field_type,
            format: String::new(),
            calculation: String::new(),
            required: false,
        }
    }

    /// A plain string field labelled with its own key
    pub fn untyped(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(key.clone(), key, FieldType::String)
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_calculation(mut self, calculation: impl Into<String>) -> Self {
        self.calculation = calculation.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Column part of a possibly table-qualified key
    pub fn column_name(&self) -> &str {
        column_part(&self.field)
    }
}

/// Strip an optional `table.` prefix from a field key
pub fn column_part(key: &str) -> &str {
    key.split_once('.').map(|(_, column)| column).unwrap_or(key)
}

/// A persisted report configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDescriptor {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub schema: Vec<Field>,
}

impl ReportDescriptor {
    /// Derive a report id from a title: lowercase, alphanumerics only,
    /// whitespace runs collapsed to a single hyphen.
    pub fn id_from_title(title: &str) -> String {
        let cleaned: String = title
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
            .collect();
        cleaned.split_whitespace().collect::<Vec<_>>().join("-")
    }
}

/// How active filter items are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Logic {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

/// Filter condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    #[default]
    Eq,
    Neq,
    Gt,
    Lt,
    Contains,
    Starts,
    Ends,
}

impl Condition {
    pub const ALL: [Condition; 7] = [
        Condition::Eq,
        Condition::Neq,
        Condition::Gt,
        Condition::Lt,
        Condition::Contains,
        Condition::Starts,
        Condition::Ends,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Eq => "eq",
            Condition::Neq => "neq",
            Condition::Gt => "gt",
            Condition::Lt => "lt",
            Condition::Contains => "contains",
            Condition::Starts => "starts",
            Condition::Ends => "ends",
        }
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            Condition::Eq => "equals (=)",
            Condition::Neq => "not equals (≠)",
            Condition::Gt => "greater than (>)",
            Condition::Lt => "less than (<)",
            Condition::Contains => "contains",
            Condition::Starts => "starts with",
            Condition::Ends => "ends with",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ReportError::Validation(format!("unknown filter condition '{}'", s)))
    }
}

/// One (field, condition, value) clause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterItem {
    pub field: String,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub value: String,
}

impl FilterItem {
    pub fn new(field: impl Into<String>, condition: Condition, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            condition,
            value: value.into(),
        }
    }

    /// An item with an empty value is kept for editing but never evaluated
    pub fn is_active(&self) -> bool {
        !self.value.is_empty()
    }
}

/// A combination of filter items
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub items: Vec<FilterItem>,
}

impl FilterSet {
    pub fn new(logic: Logic, items: Vec<FilterItem>) -> Self {
        Self { logic, items }
    }

    pub fn all(items: Vec<FilterItem>) -> Self {
        Self::new(Logic::And, items)
    }

    pub fn any(items: Vec<FilterItem>) -> Self {
        Self::new(Logic::Or, items)
    }

    pub fn active_items(&self) -> impl Iterator<Item = &FilterItem> {
        self.items.iter().filter(|item| item.is_active())
    }

    pub fn has_active_items(&self) -> bool {
        self.active_items().next().is_some()
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn toggled(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Sort key and direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: String,
    #[serde(default)]
    pub direction: Direction,
}

impl SortSpec {
    pub fn asc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: Direction::Desc,
        }
    }
}

/// Coarse filters over the sample timesheet data set
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// `None` or `"All"` means any location
    pub location: Option<String>,
    /// `None` or `"All"` means any status
    pub status: Option<String>,
    /// Case-insensitive text search over the whole row
    pub search: Option<String>,
}

impl QuickFilter {
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none()
            && self.end_date.is_none()
            && self.location_constraint().is_none()
            && self.status_constraint().is_none()
            && self.search_term().is_none()
    }

    pub fn location_constraint(&self) -> Option<&str> {
        constraint(&self.location)
    }

    pub fn status_constraint(&self) -> Option<&str> {
        constraint(&self.status)
    }

    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.is_empty())
    }
}

fn constraint(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty() && *v != "All")
}

/// A single fetch request; never persisted as a unit
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub report_id: String,
    /// 1-indexed page number
    pub page: usize,
    pub page_size: usize,
    pub sort: Option<SortSpec>,
    pub filters: Option<FilterSet>,
    pub quick: Option<QuickFilter>,
}

impl QueryDescriptor {
    pub fn new(report_id: impl Into<String>) -> Self {
        Self {
            report_id: report_id.into(),
            page: 1,
            page_size: 10,
            sort: None,
            filters: None,
            quick: None,
        }
    }

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_filters(mut self, filters: Option<FilterSet>) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_quick_filter(mut self, quick: QuickFilter) -> Self {
        self.quick = Some(quick);
        self
    }

    /// Row offset of the first row on the requested page
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        if self.page == 0 {
            return Err(ReportError::Validation("page must be at least 1".to_string()));
        }
        if self.page_size == 0 {
            return Err(ReportError::Validation("page size must be positive".to_string()));
        }
        Ok(())
    }
}

/// One page of rows plus the size of the whole filtered set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowPage {
    pub rows: Vec<Row>,
    pub total: usize,
}

/// Source tables configured for a report, in the order they were selected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMapping {
    tables: Vec<String>,
}

impl TableMapping {
    /// Parse a comma-separated table list; blank entries are dropped.
    /// Returns `None` when no table remains.
    pub fn parse(list: &str) -> Option<Self> {
        let tables: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if tables.is_empty() {
            None
        } else {
            Some(Self { tables })
        }
    }

    pub fn primary(&self) -> &str {
        &self.tables[0]
    }

    pub fn auxiliary(&self) -> &[String] {
        &self.tables[1..]
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn is_multi_table(&self) -> bool {
        self.tables.len() > 1
    }

    pub fn to_list(&self) -> String {
        self.tables.join(",")
    }
}
