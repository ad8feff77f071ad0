//! Core functionality for the report viewer
//!
//! This crate provides the report model, the field catalog, the preference
//! store and the event bus that keeps open views in sync.

pub mod catalog;
pub mod config;
pub mod dates;
pub mod events;
pub mod model;
pub mod preferences;
pub mod state;

use thiserror::Error;

// Re-export commonly used types
pub use catalog::{Category, FieldCatalog, NewReport, TableSelection};
pub use config::AppSettings;
pub use events::{EventBus, Subscription};
pub use model::{
    Condition, Direction, Field, FieldType, FilterItem, FilterSet, Logic, QueryDescriptor,
    QuickFilter, ReportDescriptor, Row, RowPage, SortSpec, TableMapping,
};
pub use preferences::{FileStorage, KeyValueStorage, MemoryStorage, PreferenceMirror, PreferenceStore};
pub use state::AppState;

/// Errors raised by catalog and preference operations
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Report not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
