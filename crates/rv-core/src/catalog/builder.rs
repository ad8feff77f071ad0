//! Report builder: turns table/column selections into a catalog entry

use indexmap::IndexMap;
use tracing::info;

use crate::model::{Field, FieldType, ReportDescriptor};
use crate::ReportError;

use super::FieldCatalog;

/// Columns picked from one source table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSelection {
    pub table_name: String,
    /// Every column the table offers
    pub columns: Vec<String>,
    /// Picked columns, in pick order
    pub selected_columns: Vec<String>,
}

impl TableSelection {
    pub fn new(table_name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns,
            selected_columns: Vec::new(),
        }
    }

    /// Select the column if unselected, unselect it otherwise
    pub fn toggle(&mut self, column: &str) {
        if let Some(pos) = self.selected_columns.iter().position(|c| c == column) {
            self.selected_columns.remove(pos);
        } else {
            self.selected_columns.push(column.to_string());
        }
    }

    pub fn select_all(&mut self) {
        self.selected_columns = self.columns.clone();
    }

    pub fn deselect_all(&mut self) {
        self.selected_columns.clear();
    }
}

/// Input of the report creation flow
#[derive(Debug, Clone, Default)]
pub struct NewReport {
    pub name: String,
    pub description: String,
    pub category: String,
    pub tables: Vec<TableSelection>,
}

/// Flatten selections into `table.column` keys and the list of tables that
/// contributed at least one column.
pub fn qualified_columns(tables: &[TableSelection]) -> (Vec<String>, Vec<String>) {
    let mut columns = Vec::new();
    let mut table_names = Vec::new();

    for table in tables.iter().filter(|t| !t.selected_columns.is_empty()) {
        table_names.push(table.table_name.clone());
        columns.extend(
            table
                .selected_columns
                .iter()
                .map(|col| format!("{}.{}", table.table_name, col)),
        );
    }

    (columns, table_names)
}

/// Group saved `table.column` keys back by table, preserving order.
/// Unqualified keys are skipped.
pub fn group_by_table(selected: &[String]) -> IndexMap<String, Vec<String>> {
    let mut grouped: IndexMap<String, Vec<String>> = IndexMap::new();
    for key in selected {
        if let Some((table, column)) = key.split_once('.') {
            if !table.is_empty() && !column.is_empty() {
                grouped
                    .entry(table.to_string())
                    .or_default()
                    .push(column.to_string());
            }
        }
    }
    grouped
}

/// `employee_id` -> `Employee Id`
pub fn label_from_column(column: &str) -> String {
    column
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl FieldCatalog {
    /// Validate, register and configure a new report.
    ///
    /// Nothing is persisted when validation fails.
    pub fn create_report(&self, new: NewReport) -> Result<ReportDescriptor, ReportError> {
        if new.name.trim().is_empty() {
            return Err(ReportError::Validation("Please enter a report name.".to_string()));
        }

        let (columns, table_names) = qualified_columns(&new.tables);
        if columns.is_empty() {
            return Err(ReportError::Validation(
                "Please select at least one column from any table.".to_string(),
            ));
        }

        let id = ReportDescriptor::id_from_title(&new.name);
        if id.is_empty() {
            return Err(ReportError::Validation(format!(
                "'{}' does not produce a usable report id",
                new.name
            )));
        }

        let schema = columns
            .iter()
            .map(|key| {
                let column = crate::model::column_part(key);
                Field::new(column, label_from_column(column), FieldType::String)
            })
            .collect();

        let report = ReportDescriptor {
            id: id.clone(),
            title: new.name.trim().to_string(),
            description: if new.description.trim().is_empty() {
                "Custom report".to_string()
            } else {
                new.description
            },
            category: if new.category.is_empty() {
                "general".to_string()
            } else {
                new.category
            },
            schema,
        };

        self.add_report(report.clone())?;
        self.preferences()
            .set_fields_with_tables(&id, &columns, Some(&table_names.join(",")))?;

        info!(report_id = %id, columns = columns.len(), tables = table_names.len(), "report created");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::preferences::{KeyValueStorage, MemoryStorage, PreferenceStore};
    use std::sync::Arc;

    fn catalog() -> FieldCatalog {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let prefs = Arc::new(PreferenceStore::new(storage.clone(), Arc::new(EventBus::new())));
        FieldCatalog::new(storage, prefs)
    }

    fn employees() -> TableSelection {
        TableSelection::new(
            "employees",
            vec!["id".to_string(), "first_name".to_string(), "hire_date".to_string()],
        )
    }

    #[test]
    fn test_table_selection_toggle() {
        let mut table = employees();
        table.toggle("first_name");
        table.toggle("id");
        assert_eq!(table.selected_columns, vec!["first_name", "id"]);
        table.toggle("first_name");
        assert_eq!(table.selected_columns, vec!["id"]);
        table.select_all();
        assert_eq!(table.selected_columns.len(), 3);
        table.deselect_all();
        assert!(table.selected_columns.is_empty());
    }

    #[test]
    fn test_group_by_table_round_trip() {
        let mut employees = employees();
        employees.toggle("id");
        let mut departments = TableSelection::new("departments", vec!["name".to_string()]);
        departments.select_all();

        let (columns, tables) = qualified_columns(&[employees, departments]);
        assert_eq!(columns, vec!["employees.id", "departments.name"]);
        assert_eq!(tables, vec!["employees", "departments"]);

        let grouped = group_by_table(&columns);
        assert_eq!(grouped["employees"], vec!["id"]);
        assert_eq!(grouped.get_index(1).unwrap().0, "departments");
    }

    #[test]
    fn test_label_from_column() {
        assert_eq!(label_from_column("first_name"), "First Name");
        assert_eq!(label_from_column("id"), "Id");
    }

    #[test]
    fn test_create_report() {
        let catalog = catalog();
        let mut table = employees();
        table.toggle("first_name");
        table.toggle("hire_date");

        let report = catalog
            .create_report(NewReport {
                name: "Team Roster".to_string(),
                tables: vec![table],
                ..Default::default()
            })
            .unwrap();

        assert_eq!(report.id, "team-roster");
        assert_eq!(report.description, "Custom report");
        assert_eq!(report.category, "general");
        assert_eq!(report.schema[0].label, "First Name");

        let prefs = catalog.preferences();
        assert_eq!(prefs.get_fields("team-roster"), vec!["employees.first_name", "employees.hire_date"]);
        assert_eq!(prefs.get_table_mapping("team-roster").unwrap().primary(), "employees");
    }

    #[test]
    fn test_create_report_validation_persists_nothing() {
        let catalog = catalog();
        let err = catalog
            .create_report(NewReport {
                name: "  ".to_string(),
                tables: vec![employees()],
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ReportError::Validation(_)));

        let err = catalog
            .create_report(NewReport {
                name: "Empty".to_string(),
                tables: vec![employees()],
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, ReportError::Validation(_)));
        assert!(catalog.get_report("empty").is_none());
        assert!(catalog.preferences().get_fields("empty").is_empty());
    }
}
