//! Data source adapter: resolves where a report's rows come from and runs
//! filter, sort and pagination on the way out.
//!
//! Reports without a table mapping read the generated local rows. Reports
//! with a mapping read their primary table from the remote store with filter,
//! sort and paging pushed down, then attach the first page-size rows of each
//! auxiliary table by position.

pub mod request;

use std::sync::Arc;

use rv_core::{
    FieldCatalog, FieldType, FilterItem, FilterSet, PreferenceStore, QueryDescriptor, Row,
    RowPage, SortSpec, TableMapping,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::filter::{matches, matches_quick};
use crate::pagination::paginate;
use crate::sort::sort_rows;
use crate::sources::{SampleSource, TableRead, TabularStore};
use crate::DataError;

pub use request::{RequestTicket, RequestTracker};

/// Entry point for every row fetch
pub struct DataSourceAdapter {
    catalog: Arc<FieldCatalog>,
    sample: Arc<SampleSource>,
    remote: Option<Arc<dyn TabularStore>>,
}

impl DataSourceAdapter {
    pub fn new(catalog: Arc<FieldCatalog>, sample: Arc<SampleSource>) -> Self {
        Self {
            catalog,
            sample,
            remote: None,
        }
    }

    /// Serve mapped reports from `store`
    pub fn with_remote(mut self, store: Arc<dyn TabularStore>) -> Self {
        self.remote = Some(store);
        self
    }

    pub fn catalog(&self) -> &Arc<FieldCatalog> {
        &self.catalog
    }

    pub fn preferences(&self) -> &Arc<PreferenceStore> {
        self.catalog.preferences()
    }

    pub fn remote(&self) -> Option<&Arc<dyn TabularStore>> {
        self.remote.as_ref()
    }

    pub fn sample(&self) -> &SampleSource {
        &self.sample
    }

    /// Fetch one page of rows for a query.
    ///
    /// Remote failures of any kind surface as [`DataError::DataFetch`].
    pub async fn fetch(&self, query: &QueryDescriptor) -> Result<RowPage, DataError> {
        query.validate()?;

        match self.preferences().get_table_mapping(&query.report_id) {
            None => {
                debug!(report_id = %query.report_id, "fetching from local rows");
                Ok(self.fetch_local(query))
            }
            Some(mapping) => {
                let store = self.remote.as_ref().ok_or_else(|| {
                    DataError::fetch(format!(
                        "report '{}' reads from {} but no remote store is configured",
                        query.report_id,
                        mapping.to_list()
                    ))
                })?;
                self.fetch_remote(store.as_ref(), &mapping, query)
                    .await
                    .map_err(DataError::into_fetch)
            }
        }
    }

    /// Filter, sort and window the local rows
    pub fn fetch_local(&self, query: &QueryDescriptor) -> RowPage {
        let temporal = self.temporal_keys(&query.report_id);
        let quick = query.quick.as_ref().filter(|q| !q.is_empty());

        let mut rows: Vec<Row> = self
            .sample
            .rows()
            .iter()
            .filter(|row| quick.map_or(true, |q| matches_quick(row, q)))
            .filter(|row| matches(row, query.filters.as_ref()))
            .cloned()
            .collect();

        if let Some(sort) = &query.sort {
            sort_rows(&mut rows, sort, &temporal);
        }

        paginate(rows, query.page, query.page_size)
    }

    async fn fetch_remote(
        &self,
        store: &dyn TabularStore,
        mapping: &TableMapping,
        query: &QueryDescriptor,
    ) -> Result<RowPage, DataError> {
        let selected = self.preferences().get_fields(&query.report_id);
        let primary = mapping.primary();

        if query.quick.as_ref().is_some_and(|q| !q.is_empty()) {
            warn!(report_id = %query.report_id, "quick filters apply to local rows only; ignoring");
        }

        let request = TableRead {
            table: primary.to_string(),
            columns: columns_for(primary, &selected),
            filters: query.filters.as_ref().and_then(|f| scope_filters(f, primary)),
            sort: query.sort.as_ref().and_then(|s| scope_sort(s, primary)),
            limit: Some(query.page_size),
            offset: query.offset(),
            with_count: true,
        };
        let result = store.read(request).await?;
        let total = result.total.unwrap_or(result.rows.len());
        let mut rows = result.rows;

        for table in mapping.auxiliary() {
            let columns = columns_for(table, &selected);
            if columns.is_empty() {
                debug!(table = %table, "no selected columns, skipping auxiliary table");
                continue;
            }
            let extra = store
                .read(TableRead {
                    columns,
                    limit: Some(query.page_size),
                    ..TableRead::new(table.clone())
                })
                .await?;
            zip_positional(&mut rows, extra.rows);
        }

        for row in &rows {
            validate_row(row)?;
        }

        info!(
            report_id = %query.report_id,
            store = store.store_name(),
            tables = mapping.tables().len(),
            rows = rows.len(),
            total,
            "fetched remote page"
        );
        Ok(RowPage { rows, total })
    }

    /// Keys compared as dates when sorting this report's rows
    pub fn temporal_keys(&self, report_id: &str) -> Vec<String> {
        let mut keys = SampleSource::temporal_keys();
        keys.extend(
            self.catalog
                .get_schema(report_id)
                .into_iter()
                .filter(|f| f.field_type == FieldType::Date)
                .map(|f| f.field),
        );
        keys
    }
}

/// Column names selected from `table`, in selection order
pub fn columns_for(table: &str, selected: &[String]) -> Vec<String> {
    selected
        .iter()
        .filter_map(|key| key.split_once('.'))
        .filter(|(t, column)| *t == table && !column.is_empty())
        .map(|(_, column)| column.to_string())
        .collect()
}

// Qualified keys of another table cannot be pushed to the primary read
fn scope_key(key: &str, table: &str) -> Option<String> {
    match key.split_once('.') {
        Some((t, column)) if t == table => Some(column.to_string()),
        Some(_) => None,
        None => Some(key.to_string()),
    }
}

/// Filter items that can run against `table`, with their table prefix
/// stripped. Items on other tables are dropped, so an OR set only keeps its
/// primary-table alternatives and matches fewer rows than the full set would.
fn scope_filters(filters: &FilterSet, table: &str) -> Option<FilterSet> {
    let mut items = Vec::new();
    for item in &filters.items {
        match scope_key(&item.field, table) {
            Some(column) => items.push(FilterItem::new(column, item.condition, item.value.clone())),
            None => warn!(field = %item.field, table, "dropping filter on auxiliary table"),
        }
    }
    Some(FilterSet::new(filters.logic, items)).filter(FilterSet::has_active_items)
}

fn scope_sort(sort: &SortSpec, table: &str) -> Option<SortSpec> {
    let scoped = scope_key(&sort.key, table).map(|key| SortSpec {
        key,
        direction: sort.direction,
    });
    if scoped.is_none() {
        debug!(key = %sort.key, table, "sort key is not on the primary table");
    }
    scoped
}

/// Merge auxiliary rows into primary rows by position. Primary rows beyond
/// the auxiliary set are left as they are.
pub fn zip_positional(primary: &mut [Row], auxiliary: Vec<Row>) {
    for (row, extra) in primary.iter_mut().zip(auxiliary) {
        row.extend(extra);
    }
}

/// Rows crossing into the view must hold scalar values only
pub fn validate_row(row: &Row) -> Result<(), DataError> {
    match row
        .iter()
        .find(|(_, v)| matches!(v, Value::Array(_) | Value::Object(_)))
    {
        Some((key, _)) => Err(DataError::InvalidRow(format!("non-scalar value in {}", key))),
        None => Ok(()),
    }
}
