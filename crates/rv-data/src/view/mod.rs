//! View sessions: the state behind one open report table and its filter
//! editor. Sessions listen on the event bus and reload shared preferences
//! when another session changes them.

pub mod filter_editor;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rv_core::config::ViewSettings;
use rv_core::events::events::{FieldsChanged, FiltersChanged};
use rv_core::events::typed_handler;
use rv_core::{FilterSet, QueryDescriptor, QuickFilter, Row, RowPage, SortSpec, Subscription};
use tracing::{debug, warn};

use crate::adapter::{DataSourceAdapter, RequestTicket, RequestTracker};
use crate::filter::{cell_text, lookup};
use crate::pagination::{clamp_page, page_count};
use crate::sources::sample_source::DEFAULT_COLUMNS;
use crate::DataError;

pub use filter_editor::{filter_options, search_options, FilterEditor, SelectOption};

/// A displayed column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub key: String,
    pub label: String,
}

impl ColumnSpec {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }

    /// Text of this column in a row; empty when missing
    pub fn cell(&self, row: &Row) -> String {
        cell_text(lookup(row, &self.key))
    }
}

/// Columns shown when a report has no saved selection
pub fn default_columns() -> Vec<ColumnSpec> {
    DEFAULT_COLUMNS
        .iter()
        .map(|(key, label)| ColumnSpec::new(*key, *label))
        .collect()
}

/// What happened to a completed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A later fetch was started; the result was dropped
    Stale,
}

/// A fetch that has been started but not yet applied
#[derive(Debug)]
pub struct PendingFetch {
    pub query: QueryDescriptor,
    ticket: RequestTicket,
}

#[derive(Debug, Default)]
struct DirtyFlags {
    fields: AtomicBool,
    filters: AtomicBool,
}

/// State of one open report table
pub struct ReportView {
    report_id: String,
    adapter: Arc<DataSourceAdapter>,
    page: usize,
    page_size: usize,
    page_size_options: Vec<usize>,
    sort: SortSpec,
    quick: QuickFilter,
    filters: Option<FilterSet>,
    selected: Vec<String>,
    rows: Vec<Row>,
    total: usize,
    loading: bool,
    error: Option<String>,
    tracker: RequestTracker,
    dirty: Arc<DirtyFlags>,
    _subscriptions: Vec<Subscription>,
}

impl ReportView {
    /// Open a view on a report, loading its saved columns and filters
    pub fn open(report_id: impl Into<String>, adapter: Arc<DataSourceAdapter>, settings: &ViewSettings) -> Self {
        let report_id = report_id.into();
        let preferences = adapter.preferences().clone();
        let dirty = Arc::new(DirtyFlags::default());

        let subscriptions = {
            let bus = preferences.bus();
            let (id, flags) = (report_id.clone(), dirty.clone());
            let fields = bus.subscribe_scoped::<FieldsChanged>(typed_handler(move |e: &FieldsChanged| {
                if e.report_id == id {
                    flags.fields.store(true, Ordering::SeqCst);
                }
            }));
            let (id, flags) = (report_id.clone(), dirty.clone());
            let filters = bus.subscribe_scoped::<FiltersChanged>(typed_handler(move |e: &FiltersChanged| {
                if e.report_id == id {
                    flags.filters.store(true, Ordering::SeqCst);
                }
            }));
            vec![fields, filters]
        };

        Self {
            selected: preferences.get_fields(&report_id),
            filters: preferences.get_filters(&report_id),
            report_id,
            adapter,
            page: 1,
            page_size: settings.default_page_size.max(1),
            page_size_options: settings.page_size_options.clone(),
            sort: settings.default_sort.clone(),
            quick: QuickFilter::default(),
            rows: Vec::new(),
            total: 0,
            loading: false,
            error: None,
            tracker: RequestTracker::new(),
            dirty,
            _subscriptions: subscriptions,
        }
    }

    /// Reload preferences changed by other sessions since the last call.
    /// A filter change sends the view back to page 1.
    pub fn sync(&mut self) -> bool {
        let preferences = self.adapter.preferences();
        let mut changed = false;

        if self.dirty.fields.swap(false, Ordering::SeqCst) {
            self.selected = preferences.get_fields(&self.report_id);
            changed = true;
        }
        if self.dirty.filters.swap(false, Ordering::SeqCst) {
            self.filters = preferences.get_filters(&self.report_id);
            self.page = 1;
            changed = true;
        }

        if changed {
            debug!(report_id = %self.report_id, "view resynchronized");
        }
        changed
    }

    /// Columns to display: the saved selection, else the defaults
    pub fn columns(&self) -> Vec<ColumnSpec> {
        if self.selected.is_empty() {
            return default_columns();
        }

        let schema = self
            .adapter
            .catalog()
            .resolved_schema(&self.report_id, &self.selected);
        self.selected
            .iter()
            .zip(schema)
            .map(|(key, field)| {
                let label = DEFAULT_COLUMNS
                    .iter()
                    .find(|(k, _)| *k == key.as_str())
                    .map(|(_, label)| label.to_string())
                    .unwrap_or(field.label);
                ColumnSpec::new(key.clone(), label)
            })
            .collect()
    }

    /// The query the next fetch will run
    pub fn query(&self) -> QueryDescriptor {
        QueryDescriptor::new(self.report_id.clone())
            .with_page(self.page, self.page_size)
            .with_sort(self.sort.clone())
            .with_filters(self.filters.clone())
            .with_quick_filter(self.quick.clone())
    }

    /// Start a fetch. Any fetch started earlier becomes stale.
    pub fn begin_fetch(&mut self) -> PendingFetch {
        self.sync();
        if let Err(e) = self.adapter.preferences().set_last_viewed(&self.report_id) {
            warn!(report_id = %self.report_id, error = %e, "could not record last viewed");
        }

        self.loading = true;
        self.error = None;
        PendingFetch {
            query: self.query(),
            ticket: self.tracker.begin(),
        }
    }

    /// Apply a fetch result unless a later fetch was started meanwhile.
    /// A failed fetch clears the rows and keeps the error message.
    pub fn complete_fetch(&mut self, pending: PendingFetch, result: Result<RowPage, DataError>) -> FetchOutcome {
        if !pending.ticket.is_current() {
            debug!(
                report_id = %self.report_id,
                generation = pending.ticket.generation(),
                "dropping stale fetch result"
            );
            return FetchOutcome::Stale;
        }

        self.loading = false;
        match result {
            Ok(page) => {
                self.rows = page.rows;
                self.total = page.total;
            }
            Err(e) => {
                warn!(report_id = %self.report_id, error = %e, "fetch failed");
                self.rows.clear();
                self.total = 0;
                self.error = Some(e.to_string());
            }
        }
        FetchOutcome::Applied
    }

    /// Fetch the current page
    pub async fn refresh(&mut self) -> FetchOutcome {
        let pending = self.begin_fetch();
        let adapter = self.adapter.clone();
        let result = adapter.fetch(&pending.query).await;
        self.complete_fetch(pending, result)
    }

    /// Go to a page, clamped to the known page range
    pub fn set_page(&mut self, page: usize) {
        self.page = clamp_page(page, self.total, self.page_size);
    }

    pub fn next_page(&mut self) -> bool {
        if self.page < self.page_count() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Change the page size and go back to page 1
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    /// Sort by `key`: flip the direction when already sorted by it,
    /// otherwise sort ascending
    pub fn toggle_sort(&mut self, key: &str) {
        if self.sort.key == key {
            self.sort.direction = self.sort.direction.toggled();
        } else {
            self.sort = SortSpec::asc(key);
        }
    }

    /// Replace the quick filter and go back to page 1
    pub fn set_quick_filter(&mut self, quick: QuickFilter) {
        self.quick = quick;
        self.page = 1;
    }

    pub fn page_count(&self) -> usize {
        page_count(self.total, self.page_size)
    }

    pub fn report_id(&self) -> &str {
        &self.report_id
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_size_options(&self) -> &[usize] {
        &self.page_size_options
    }

    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    pub fn filters(&self) -> Option<&FilterSet> {
        self.filters.as_ref()
    }

    pub fn quick_filter(&self) -> &QuickFilter {
        &self.quick
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
