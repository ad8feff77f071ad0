//! CSV encoder
//!
//! Header names are written bare. Each cell is its JSON rendering, so text
//! is double-quoted with JSON escapes and numbers are written as-is. Missing
//! and null cells are written as `""`. Lines are joined with `\n` and the
//! last line has no terminator.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use rv_core::Row;
use serde_json::Value;

use super::ExportError;

pub fn encode(headers: &[String], rows: &[Row]) -> Result<Vec<u8>, ExportError> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record(headers)?;
    for row in rows {
        let cells = headers
            .iter()
            .map(|h| cell_json(row.get(h)))
            .collect::<Result<Vec<_>, _>>()?;
        writer.write_record(&cells)?;
    }

    let mut bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))?;
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    Ok(bytes)
}

fn cell_json(value: Option<&Value>) -> Result<String, ExportError> {
    match value {
        None | Some(Value::Null) => Ok("\"\"".to_string()),
        Some(value) => Ok(serde_json::to_string(value)?),
    }
}
