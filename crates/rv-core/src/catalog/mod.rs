//! Field catalog: built-in and user-created reports with their schemas

pub mod builder;
pub mod builtin;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::events::events::{CatalogChange, CatalogChanged};
use crate::events::EventBus;
use crate::model::{column_part, Field, ReportDescriptor};
use crate::preferences::{KeyValueStorage, PreferenceStore};
use crate::ReportError;

pub use builder::{NewReport, TableSelection};

/// Storage key for the user-created report list
pub const CUSTOM_REPORTS_KEY: &str = "custom_reports";

/// A titled group of reports
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: String,
    pub title: String,
    pub reports: Vec<ReportDescriptor>,
}

/// Registry of reports and their fields
pub struct FieldCatalog {
    custom: RwLock<Vec<ReportDescriptor>>,
    storage: Arc<dyn KeyValueStorage>,
    preferences: Arc<PreferenceStore>,
    bus: Arc<EventBus>,
}

impl FieldCatalog {
    /// Create the catalog, loading user-created reports from storage
    pub fn new(storage: Arc<dyn KeyValueStorage>, preferences: Arc<PreferenceStore>) -> Self {
        let custom = match storage.get(CUSTOM_REPORTS_KEY) {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "ignoring unreadable custom report list");
                Vec::new()
            }),
            None => Vec::new(),
        };
        let bus = preferences.bus().clone();

        Self {
            custom: RwLock::new(custom),
            storage,
            preferences,
            bus,
        }
    }

    /// All categories with their reports; custom reports are appended to
    /// their category, creating it when needed.
    pub fn list_categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = builtin::categories().to_vec();

        for report in self.custom.read().iter() {
            let category_id = if report.category.is_empty() {
                "general"
            } else {
                report.category.as_str()
            };

            match categories.iter_mut().find(|c| c.id == category_id) {
                Some(category) => category.reports.push(report.clone()),
                None => categories.push(Category {
                    id: category_id.to_string(),
                    title: builtin::category_title(category_id),
                    reports: vec![report.clone()],
                }),
            }
        }

        categories
    }

    pub fn get_report(&self, id: &str) -> Option<ReportDescriptor> {
        builtin_report(id).or_else(|| self.custom.read().iter().find(|r| r.id == id).cloned())
    }

    /// Schema of a report; empty when the report is unknown
    pub fn get_schema(&self, id: &str) -> Vec<Field> {
        self.get_report(id).map(|r| r.schema).unwrap_or_default()
    }

    pub fn is_builtin(&self, id: &str) -> bool {
        builtin_report(id).is_some()
    }

    /// Schema restricted to the given selection, in selection order.
    ///
    /// Keys are matched against the schema first as-is, then by their column
    /// part; unknown keys become plain string fields. An empty selection
    /// yields the full schema.
    pub fn resolved_schema(&self, id: &str, selected: &[String]) -> Vec<Field> {
        let schema = self.get_schema(id);
        if selected.is_empty() {
            return schema;
        }

        selected
            .iter()
            .map(|key| {
                schema
                    .iter()
                    .find(|f| &f.field == key)
                    .or_else(|| schema.iter().find(|f| f.field == column_part(key)))
                    .cloned()
                    .unwrap_or_else(|| Field::untyped(key.clone()))
            })
            .collect()
    }

    /// Insert or wholesale replace a custom report.
    ///
    /// Ids of built-in reports are rejected.
    pub fn add_report(&self, report: ReportDescriptor) -> Result<(), ReportError> {
        if report.id.is_empty() {
            return Err(ReportError::Validation("report id is required".to_string()));
        }
        if self.is_builtin(&report.id) {
            return Err(ReportError::Validation(format!(
                "'{}' is a built-in report and cannot be replaced",
                report.id
            )));
        }

        let report_id = report.id.clone();
        let change = {
            let mut custom = self.custom.write();
            let change = match custom.iter_mut().find(|r| r.id == report.id) {
                Some(existing) => {
                    *existing = report;
                    CatalogChange::Replaced
                }
                None => {
                    custom.push(report);
                    CatalogChange::Added
                }
            };
            self.persist(&custom)?;
            change
        };

        info!(report_id = %report_id, ?change, "catalog updated");
        self.bus.publish(CatalogChanged { report_id, change });
        Ok(())
    }

    /// Delete a custom report and every preference stored for it.
    ///
    /// Returns `false` when no custom report has this id.
    pub fn delete_report(&self, id: &str) -> Result<bool, ReportError> {
        if self.is_builtin(id) {
            return Err(ReportError::Validation(format!(
                "'{}' is a built-in report and cannot be deleted",
                id
            )));
        }

        {
            let mut custom = self.custom.write();
            let before = custom.len();
            custom.retain(|r| r.id != id);
            if custom.len() == before {
                return Ok(false);
            }
            self.persist(&custom)?;
        }

        self.preferences.remove_report(id)?;

        info!(report_id = id, "report deleted");
        self.bus.publish(CatalogChanged {
            report_id: id.to_string(),
            change: CatalogChange::Deleted,
        });
        Ok(true)
    }

    pub fn preferences(&self) -> &Arc<PreferenceStore> {
        &self.preferences
    }

    fn persist(&self, custom: &[ReportDescriptor]) -> Result<(), ReportError> {
        self.storage
            .set(CUSTOM_REPORTS_KEY, serde_json::to_string(custom)?)
    }
}

fn builtin_report(id: &str) -> Option<ReportDescriptor> {
    builtin::categories()
        .iter()
        .flat_map(|c| c.reports.iter())
        .find(|r| r.id == id)
        .cloned()
}
