//! Per-report preferences: selected columns, filters and last-viewed marker
//!
//! The local storage is the source of truth. Every write is visible to the
//! next read, fields and filter writes are broadcast on the event bus, and a
//! configured [`PreferenceMirror`] receives a best-effort copy.

pub mod mirror;
pub mod storage;

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::events::events::{FieldsChanged, FiltersChanged};
use crate::events::EventBus;
use crate::model::{FilterSet, TableMapping};
use crate::ReportError;

pub use mirror::PreferenceMirror;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};

/// Namespace for selected columns and table mapping
pub const FIELDS_PREFIX: &str = "report_fields_";
/// Namespace for filter sets
pub const FILTERS_PREFIX: &str = "report_filters_";
/// Namespace for last-viewed timestamps
pub const LAST_VIEWED_PREFIX: &str = "report_last_viewed_";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredFields {
    #[serde(default)]
    selected_columns: Vec<String>,
    #[serde(default)]
    table_name: Option<String>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// Preference store shared by every open view
pub struct PreferenceStore {
    storage: Arc<dyn KeyValueStorage>,
    bus: Arc<EventBus>,
    mirror: Option<Arc<dyn PreferenceMirror>>,
}

impl PreferenceStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>, bus: Arc<EventBus>) -> Self {
        Self {
            storage,
            bus,
            mirror: None,
        }
    }

    /// Attach a secondary mirror for fields and filter writes
    pub fn with_mirror(mut self, mirror: Arc<dyn PreferenceMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Selected columns in display order; empty when nothing is saved
    pub fn get_fields(&self, report_id: &str) -> Vec<String> {
        self.read_fields(report_id)
            .map(|stored| stored.selected_columns)
            .unwrap_or_default()
    }

    /// Source tables saved alongside the selected columns
    pub fn get_table_mapping(&self, report_id: &str) -> Option<TableMapping> {
        self.read_fields(report_id)
            .and_then(|stored| stored.table_name)
            .and_then(|list| TableMapping::parse(&list))
    }

    /// Save selected columns, keeping the current table mapping
    pub fn set_fields(&self, report_id: &str, fields: &[String]) -> Result<(), ReportError> {
        let table_name = self.read_fields(report_id).and_then(|stored| stored.table_name);
        self.set_fields_with_tables(report_id, fields, table_name.as_deref())
    }

    /// Save selected columns together with a comma-separated table list
    pub fn set_fields_with_tables(
        &self,
        report_id: &str,
        fields: &[String],
        table_name: Option<&str>,
    ) -> Result<(), ReportError> {
        require_id(report_id)?;

        let stored = StoredFields {
            selected_columns: fields.to_vec(),
            table_name: table_name.map(str::to_string),
            updated_at: Some(Utc::now()),
        };
        self.storage
            .set(&fields_key(report_id), serde_json::to_string(&stored)?)?;
        debug!(report_id, columns = fields.len(), "saved selected columns");

        self.bus.publish(FieldsChanged {
            report_id: report_id.to_string(),
            selected_columns: fields.to_vec(),
        });

        let columns = fields.to_vec();
        let table_name = table_name.map(str::to_string);
        self.mirror_write("upsert_fields", report_id, move |mirror, id| {
            mirror.upsert_fields(id, table_name.as_deref(), &columns)
        });
        Ok(())
    }

    pub fn get_filters(&self, report_id: &str) -> Option<FilterSet> {
        let raw = self.storage.get(&filters_key(report_id))?;
        match serde_json::from_str(&raw) {
            Ok(filters) => Some(filters),
            Err(e) => {
                warn!(report_id, error = %e, "ignoring unreadable filter set");
                None
            }
        }
    }

    /// Save a filter set, or clear it with `None`
    pub fn set_filters(&self, report_id: &str, filters: Option<&FilterSet>) -> Result<(), ReportError> {
        require_id(report_id)?;

        let key = filters_key(report_id);
        match filters {
            Some(filters) => self.storage.set(&key, serde_json::to_string(filters)?)?,
            None => self.storage.remove(&key)?,
        }
        debug!(report_id, cleared = filters.is_none(), "saved filter set");

        self.bus.publish(FiltersChanged {
            report_id: report_id.to_string(),
            filters: filters.cloned(),
        });

        let filters = filters.cloned();
        self.mirror_write("upsert_filters", report_id, move |mirror, id| {
            mirror.upsert_filters(id, filters.as_ref())
        });
        Ok(())
    }

    pub fn get_last_viewed(&self, report_id: &str) -> Option<DateTime<Utc>> {
        let raw = self.storage.get(&last_viewed_key(report_id))?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }

    /// Mark the report as viewed now
    pub fn set_last_viewed(&self, report_id: &str) -> Result<DateTime<Utc>, ReportError> {
        let now = Utc::now();
        self.set_last_viewed_at(report_id, now)?;
        Ok(now)
    }

    pub fn set_last_viewed_at(&self, report_id: &str, at: DateTime<Utc>) -> Result<(), ReportError> {
        require_id(report_id)?;
        self.storage.set(
            &last_viewed_key(report_id),
            at.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
    }

    /// Drop every preference entry of a report
    pub fn remove_report(&self, report_id: &str) -> Result<(), ReportError> {
        self.storage.remove(&fields_key(report_id))?;
        self.storage.remove(&filters_key(report_id))?;
        self.storage.remove(&last_viewed_key(report_id))?;
        debug!(report_id, "removed report preferences");

        self.bus.publish(FieldsChanged {
            report_id: report_id.to_string(),
            selected_columns: Vec::new(),
        });
        self.bus.publish(FiltersChanged {
            report_id: report_id.to_string(),
            filters: None,
        });

        self.mirror_write("remove", report_id, |mirror, id| mirror.remove(id));
        Ok(())
    }

    fn read_fields(&self, report_id: &str) -> Option<StoredFields> {
        let raw = self.storage.get(&fields_key(report_id))?;
        match serde_json::from_str(&raw) {
            Ok(stored) => Some(stored),
            Err(e) => {
                warn!(report_id, error = %e, "ignoring unreadable column selection");
                None
            }
        }
    }

    /// Run a mirror write off the caller's path when a runtime is available.
    /// Errors are logged and dropped.
    fn mirror_write<F>(&self, op: &'static str, report_id: &str, write: F)
    where
        F: FnOnce(&dyn PreferenceMirror, &str) -> anyhow::Result<()> + Send + 'static,
    {
        let Some(mirror) = self.mirror.clone() else {
            return;
        };
        let report_id = report_id.to_string();
        let task = move || {
            if let Err(e) = write(mirror.as_ref(), &report_id) {
                warn!(
                    report_id = %report_id,
                    op,
                    mirror = mirror.mirror_name(),
                    error = %e,
                    "preference mirror write skipped"
                );
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(task);
            }
            Err(_) => task(),
        }
    }
}

fn require_id(report_id: &str) -> Result<(), ReportError> {
    if report_id.is_empty() {
        return Err(ReportError::Validation("report id is required".to_string()));
    }
    Ok(())
}

fn fields_key(report_id: &str) -> String {
    format!("{}{}", FIELDS_PREFIX, report_id)
}

fn filters_key(report_id: &str) -> String {
    format!("{}{}", FILTERS_PREFIX, report_id)
}

fn last_viewed_key(report_id: &str) -> String {
    format!("{}{}", LAST_VIEWED_PREFIX, report_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::typed_handler;
    use crate::model::{Condition, FilterItem};
    use parking_lot::Mutex;

    fn store() -> PreferenceStore {
        PreferenceStore::new(Arc::new(MemoryStorage::new()), Arc::new(EventBus::new()))
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    struct FailingMirror;

    impl PreferenceMirror for FailingMirror {
        fn upsert_fields(&self, _: &str, _: Option<&str>, _: &[String]) -> anyhow::Result<()> {
            anyhow::bail!("relation \"report_preferences\" does not exist")
        }

        fn upsert_filters(&self, _: &str, _: Option<&FilterSet>) -> anyhow::Result<()> {
            anyhow::bail!("offline")
        }

        fn remove(&self, _: &str) -> anyhow::Result<()> {
            anyhow::bail!("offline")
        }

        fn mirror_name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_fields_round_trip_keeps_order() {
        let prefs = store();
        prefs.set_fields("r1", &cols(&["a", "b"])).unwrap();
        assert_eq!(prefs.get_fields("r1"), cols(&["a", "b"]));

        prefs.set_fields("r1", &cols(&["b", "a", "a"])).unwrap();
        assert_eq!(prefs.get_fields("r1"), cols(&["b", "a", "a"]));
    }

    #[test]
    fn test_unknown_report_reads_empty() {
        let prefs = store();
        assert!(prefs.get_fields("missing").is_empty());
        assert!(prefs.get_filters("missing").is_none());
        assert!(prefs.get_last_viewed("missing").is_none());
        assert!(prefs.get_table_mapping("missing").is_none());
    }

    #[test]
    fn test_set_fields_keeps_table_mapping() {
        let prefs = store();
        prefs
            .set_fields_with_tables("r1", &cols(&["employees.id"]), Some("employees,departments"))
            .unwrap();
        prefs.set_fields("r1", &cols(&["employees.name"])).unwrap();

        let mapping = prefs.get_table_mapping("r1").unwrap();
        assert_eq!(mapping.primary(), "employees");
        assert_eq!(mapping.auxiliary().len(), 1);
    }

    #[test]
    fn test_clearing_filters_is_idempotent() {
        let prefs = store();
        let set = FilterSet::all(vec![FilterItem::new("a", Condition::Eq, "1")]);
        prefs.set_filters("r1", Some(&set)).unwrap();
        assert_eq!(prefs.get_filters("r1"), Some(set));

        prefs.set_filters("r1", None).unwrap();
        assert!(prefs.get_filters("r1").is_none());
        prefs.set_filters("r1", None).unwrap();
        assert!(prefs.get_filters("r1").is_none());
    }

    #[test]
    fn test_writes_broadcast_report_id() {
        let prefs = store();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = seen.clone();
        prefs.bus().subscribe::<FieldsChanged>(typed_handler(move |e: &FieldsChanged| {
            log.lock().push(format!("fields:{}", e.report_id));
        }));
        let log = seen.clone();
        prefs.bus().subscribe::<FiltersChanged>(typed_handler(move |e: &FiltersChanged| {
            log.lock().push(format!("filters:{}", e.report_id));
        }));

        prefs.set_fields("r1", &cols(&["a"])).unwrap();
        prefs.set_filters("r2", None).unwrap();

        assert_eq!(*seen.lock(), vec!["fields:r1".to_string(), "filters:r2".to_string()]);
    }

    #[test]
    fn test_mirror_failure_does_not_fail_local_write() {
        let prefs = store().with_mirror(Arc::new(FailingMirror));
        prefs.set_fields("r1", &cols(&["a"])).unwrap();
        prefs.set_filters("r1", Some(&FilterSet::default())).unwrap();
        prefs.remove_report("r1").unwrap();
    }

    #[tokio::test]
    async fn test_mirror_failure_inside_runtime() {
        let prefs = store().with_mirror(Arc::new(FailingMirror));
        prefs.set_fields("r1", &cols(&["a"])).unwrap();
        assert_eq!(prefs.get_fields("r1"), cols(&["a"]));
    }

    #[test]
    fn test_last_viewed() {
        let prefs = store();
        let at = prefs.set_last_viewed("r1").unwrap();
        let read = prefs.get_last_viewed("r1").unwrap();
        assert_eq!(read.timestamp_millis(), at.timestamp_millis());
    }

    #[test]
    fn test_remove_report_cascades() {
        let prefs = store();
        prefs.set_fields("r1", &cols(&["a"])).unwrap();
        prefs.set_filters("r1", Some(&FilterSet::default())).unwrap();
        prefs.set_last_viewed("r1").unwrap();

        prefs.remove_report("r1").unwrap();
        assert!(prefs.get_fields("r1").is_empty());
        assert!(prefs.get_filters("r1").is_none());
        assert!(prefs.get_last_viewed("r1").is_none());
    }

    #[test]
    fn test_empty_id_rejected_on_write() {
        let prefs = store();
        assert!(matches!(prefs.set_fields("", &cols(&["a"])), Err(ReportError::Validation(_))));
    }
}
