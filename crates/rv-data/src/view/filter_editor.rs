//! Filter editor session and searchable option lists

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rv_core::events::events::FieldsChanged;
use rv_core::events::typed_handler;
use rv_core::{Condition, FilterItem, FilterSet, Logic, PreferenceStore, ReportError, Subscription};
use tracing::debug;

/// An entry of a selectable list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Field options for a report: its selected columns, in order
pub fn filter_options(preferences: &PreferenceStore, report_id: &str) -> Vec<SelectOption> {
    preferences
        .get_fields(report_id)
        .into_iter()
        .map(|field| SelectOption::new(field.clone(), field))
        .collect()
}

/// The condition list with display labels
pub fn condition_options() -> Vec<SelectOption> {
    Condition::ALL
        .iter()
        .map(|c| SelectOption::new(c.as_str(), c.label()))
        .collect()
}

/// Options whose label or value contains `term`, ignoring case.
/// A blank term keeps everything.
pub fn search_options<'a>(options: &'a [SelectOption], term: &str) -> Vec<&'a SelectOption> {
    let term = term.trim().to_lowercase();
    options
        .iter()
        .filter(|o| {
            term.is_empty()
                || o.label.to_lowercase().contains(&term)
                || o.value.to_lowercase().contains(&term)
        })
        .collect()
}

/// Editing state for the filters of one report
pub struct FilterEditor {
    report_id: String,
    preferences: Arc<PreferenceStore>,
    options: Vec<SelectOption>,
    items: Vec<FilterItem>,
    logic: Logic,
    fields_dirty: Arc<AtomicBool>,
    _subscription: Subscription,
}

impl FilterEditor {
    /// Open the editor, starting from the saved filter set when there is one
    pub fn open(report_id: impl Into<String>, preferences: Arc<PreferenceStore>) -> Self {
        let report_id = report_id.into();
        let fields_dirty = Arc::new(AtomicBool::new(false));

        let subscription = {
            let (id, flag) = (report_id.clone(), fields_dirty.clone());
            preferences
                .bus()
                .subscribe_scoped::<FieldsChanged>(typed_handler(move |e: &FieldsChanged| {
                    if e.report_id == id {
                        flag.store(true, Ordering::SeqCst);
                    }
                }))
        };

        let mut editor = Self {
            report_id,
            preferences,
            options: Vec::new(),
            items: Vec::new(),
            logic: Logic::And,
            fields_dirty,
            _subscription: subscription,
        };
        editor.options = filter_options(&editor.preferences, &editor.report_id);
        match editor.preferences.get_filters(&editor.report_id) {
            Some(saved) if !saved.items.is_empty() => {
                editor.logic = saved.logic;
                editor.items = saved.items;
            }
            _ => editor.reset_items(),
        }
        editor
    }

    /// Reload field options after the report's columns changed elsewhere.
    /// Pending edits are discarded.
    pub fn sync(&mut self) -> bool {
        if !self.fields_dirty.swap(false, Ordering::SeqCst) {
            return false;
        }
        self.options = filter_options(&self.preferences, &self.report_id);
        self.reset_items();
        debug!(report_id = %self.report_id, options = self.options.len(), "filter editor reloaded");
        true
    }

    fn blank_item(&self) -> Option<FilterItem> {
        self.options
            .first()
            .map(|o| FilterItem::new(o.value.clone(), Condition::Eq, ""))
    }

    fn reset_items(&mut self) {
        self.items = self.blank_item().into_iter().collect();
    }

    pub fn report_id(&self) -> &str {
        &self.report_id
    }

    pub fn field_options(&self) -> &[SelectOption] {
        &self.options
    }

    pub fn items(&self) -> &[FilterItem] {
        &self.items
    }

    pub fn logic(&self) -> Logic {
        self.logic
    }

    pub fn set_logic(&mut self, logic: Logic) {
        self.logic = logic;
    }

    /// Append a blank item; does nothing without field options
    pub fn add_item(&mut self) -> bool {
        match self.blank_item() {
            Some(item) => {
                self.items.push(item);
                true
            }
            None => false,
        }
    }

    pub fn remove_item(&mut self, index: usize) -> Option<FilterItem> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Edit one item in place
    pub fn update_item<F>(&mut self, index: usize, edit: F) -> bool
    where
        F: FnOnce(&mut FilterItem),
    {
        match self.items.get_mut(index) {
            Some(item) => {
                edit(item);
                true
            }
            None => false,
        }
    }

    /// Back to a single blank item
    pub fn clear(&mut self) {
        self.reset_items();
    }

    pub fn filter_set(&self) -> FilterSet {
        FilterSet::new(self.logic, self.items.clone())
    }

    /// Persist the edited filter set; an editor without items clears it
    pub fn apply(&self) -> Result<FilterSet, ReportError> {
        let filters = self.filter_set();
        if filters.items.is_empty() {
            self.preferences.set_filters(&self.report_id, None)?;
        } else {
            self.preferences.set_filters(&self.report_id, Some(&filters))?;
        }
        Ok(filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rv_core::{EventBus, KeyValueStorage, MemoryStorage};

    fn preferences() -> Arc<PreferenceStore> {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        Arc::new(PreferenceStore::new(storage, Arc::new(EventBus::new())))
    }

    #[test]
    fn test_options_follow_selected_columns() {
        let prefs = preferences();
        prefs
            .set_fields("employee-anniversary", &["hireDate".to_string(), "years".to_string()])
            .unwrap();

        let editor = FilterEditor::open("employee-anniversary", prefs);
        let values: Vec<_> = editor.field_options().iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["hireDate", "years"]);
        assert_eq!(editor.items(), &[FilterItem::new("hireDate", Condition::Eq, "")]);
    }

    #[test]
    fn test_no_fields_no_items() {
        let mut editor = FilterEditor::open("401k-setup", preferences());
        assert!(editor.items().is_empty());
        assert!(!editor.add_item());
    }

    #[test]
    fn test_edit_and_apply() {
        let prefs = preferences();
        prefs.set_fields("r", &["location".to_string(), "status".to_string()]).unwrap();
        let mut editor = FilterEditor::open("r", prefs.clone());

        assert!(editor.update_item(0, |item| item.value = "Remote".to_string()));
        editor.add_item();
        editor.update_item(1, |item| {
            item.field = "status".to_string();
            item.condition = Condition::Neq;
            item.value = "Inactive".to_string();
        });
        editor.set_logic(Logic::Or);
        editor.apply().unwrap();

        let saved = prefs.get_filters("r").unwrap();
        assert_eq!(saved.logic, Logic::Or);
        assert_eq!(saved.items.len(), 2);

        // a fresh editor starts from the saved set
        let reopened = FilterEditor::open("r", prefs.clone());
        assert_eq!(reopened.items(), saved.items.as_slice());

        editor.remove_item(1);
        editor.remove_item(0);
        assert!(editor.remove_item(0).is_none());
        editor.apply().unwrap();
        assert!(prefs.get_filters("r").is_none());
    }

    #[test]
    fn test_clear_and_resync() {
        let prefs = preferences();
        prefs.set_fields("r", &["location".to_string()]).unwrap();
        let mut editor = FilterEditor::open("r", prefs.clone());
        editor.add_item();
        editor.clear();
        assert_eq!(editor.items().len(), 1);

        assert!(!editor.sync());
        prefs.set_fields("r", &["employee".to_string()]).unwrap();
        assert!(editor.sync());
        assert_eq!(editor.field_options(), &[SelectOption::new("employee", "employee")]);
        assert_eq!(editor.items()[0].field, "employee");
    }

    #[test]
    fn test_search_options() {
        let options = condition_options();
        let hits: Vec<_> = search_options(&options, "THAN").iter().map(|o| o.value.as_str()).collect();
        assert_eq!(hits, vec!["gt", "lt"]);
        assert_eq!(search_options(&options, "neq").len(), 1);
        assert_eq!(search_options(&options, " ").len(), 7);
    }
}
