//! Presentation of report pages: text tables for the terminal and the
//! CSV, spreadsheet and PDF export encoders.

pub mod export;
pub mod tables;

pub use export::{export_rows, ExportError, ExportFormat};
pub use tables::{render_page, TableConfig};
