//! Data pipeline for the report viewer
//!
//! Rows come either from the generated local timesheet set or from a SQLite
//! store when the report has a table mapping. Filtering, sorting and
//! pagination live here, as do the view sessions that drive a fetch.

pub mod adapter;
pub mod filter;
pub mod pagination;
pub mod schema;
pub mod sort;
pub mod sources;
pub mod view;

use rv_core::ReportError;
use thiserror::Error;
use tokio::task::JoinError;

// Re-exports
pub use adapter::{DataSourceAdapter, RequestTicket, RequestTracker};
pub use filter::{matches, matches_quick};
pub use pagination::{page_count, paginate};
pub use schema::SchemaDetector;
pub use sort::sort_rows;
pub use sources::{SampleSource, SqliteMirror, SqliteStore, TableRead, TableReadResult, TabularStore};
pub use view::{ColumnSpec, FetchOutcome, FilterEditor, ReportView, SelectOption};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    /// Anything that went wrong while reading rows for a report
    #[error("Data fetch failed: {message}")]
    DataFetch { message: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid row: {0}")]
    InvalidRow(String),

    #[error(transparent)]
    Core(#[from] ReportError),

    #[error("Join error: {0}")]
    Join(#[from] JoinError),
}

impl DataError {
    pub fn fetch(message: impl Into<String>) -> Self {
        DataError::DataFetch {
            message: message.into(),
        }
    }

    /// Collapse a store failure into `DataFetch`, keeping its message
    pub fn into_fetch(self) -> Self {
        match self {
            DataError::DataFetch { .. } | DataError::Core(_) => self,
            other => DataError::fetch(other.to_string()),
        }
    }
}
