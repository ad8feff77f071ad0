//! Table rendering for a page of rows

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use rv_core::Row;
use rv_data::ColumnSpec;

/// Configuration for table rendering
#[derive(Debug, Clone)]
pub struct TableConfig {
    pub show_row_numbers: bool,
    /// Longer cells are cut and end in `...`; 0 disables the limit
    pub max_cell_chars: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            show_row_numbers: true,
            max_cell_chars: 40,
        }
    }
}

/// Render rows as a boxed text table with one column per `columns` entry.
///
/// `first_row_number` is the 1-based position of the first row in the
/// whole result, used for the row number column.
pub fn render_page(
    columns: &[ColumnSpec],
    rows: &[Row],
    first_row_number: usize,
    config: &TableConfig,
) -> Result<String, ArrowError> {
    if columns.is_empty() {
        return Ok(String::new());
    }

    let mut fields = Vec::with_capacity(columns.len() + 1);
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len() + 1);

    if config.show_row_numbers {
        fields.push(Field::new("#", DataType::Utf8, false));
        let numbers: Vec<String> = (0..rows.len())
            .map(|i| (first_row_number + i).to_string())
            .collect();
        arrays.push(Arc::new(StringArray::from(numbers)));
    }

    for column in columns {
        fields.push(Field::new(column.label.as_str(), DataType::Utf8, false));
        let cells: Vec<String> = rows
            .iter()
            .map(|row| truncate(column.cell(row), config.max_cell_chars))
            .collect();
        arrays.push(Arc::new(StringArray::from(cells)));
    }

    let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
    Ok(pretty_format_batches(&[batch])?.to_string())
}

/// Status line under a table
pub fn pager_line(page: usize, page_count: usize, total: usize) -> String {
    format!("Page {} of {} ({} records)", page, page_count, total)
}

fn truncate(text: String, max_chars: usize) -> String {
    if max_chars == 0 || text.chars().count() <= max_chars {
        return text;
    }
    let keep = max_chars.saturating_sub(3);
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str("...");
    cut
}
