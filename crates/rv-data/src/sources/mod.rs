//! Row sources: the generated local set and SQLite-backed stores

pub mod sample_source;
pub mod sqlite_mirror;
pub mod sqlite_source;

use async_trait::async_trait;
use rv_core::{FilterSet, Row, SortSpec};

use crate::DataError;

pub use sample_source::SampleSource;
pub use sqlite_mirror::SqliteMirror;
pub use sqlite_source::SqliteStore;

/// A read against one table.
///
/// Column names, filter fields and the sort key are plain column names of
/// `table`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRead {
    pub table: String,
    /// Projection; every column when empty
    pub columns: Vec<String>,
    pub filters: Option<FilterSet>,
    pub sort: Option<SortSpec>,
    pub limit: Option<usize>,
    pub offset: usize,
    /// Also count the rows matching `filters`
    pub with_count: bool,
}

impl TableRead {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }
}

/// Rows of a table read, keyed `table.column`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableReadResult {
    pub rows: Vec<Row>,
    /// Filtered row count, when requested
    pub total: Option<usize>,
}

/// A tabular store reports can be mapped onto
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Read rows from one table
    async fn read(&self, request: TableRead) -> Result<TableReadResult, DataError>;

    /// Column names of a table, in declaration order
    async fn columns(&self, table: &str) -> Result<Vec<String>, DataError>;

    /// Names of the tables in the store
    async fn tables(&self) -> Result<Vec<String>, DataError>;

    /// Name used in logs
    fn store_name(&self) -> &str;
}
