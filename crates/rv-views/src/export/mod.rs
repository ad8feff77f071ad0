//! Export of the rows currently on screen
//!
//! Every encoder takes its header from the keys of the first row, in order.
//! An empty row set is reported as [`ExportError::NothingToExport`] and no
//! file is written.

pub mod csv;
pub mod excel;
pub mod pdf;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rv_core::Row;
use thiserror::Error;
use tracing::info;

/// Errors raised while exporting rows
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Nothing to export")]
    NothingToExport,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("PDF error: {0}")]
    Pdf(#[from] printpdf::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown export format: {0}")]
    UnknownFormat(String),
}

/// Export format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Excel,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Csv, ExportFormat::Excel, ExportFormat::Pdf];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn filter_name(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV File",
            ExportFormat::Excel => "Excel Workbook",
            ExportFormat::Pdf => "PDF Document",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// Column header: the keys of the first row
pub fn headers(rows: &[Row]) -> Vec<String> {
    rows.first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default()
}

/// File name stem used for a report's exports
pub fn file_stem(report_id: &str) -> String {
    let id = if report_id.is_empty() { "report" } else { report_id };
    format!("{}-export", id)
}

/// Encode rows in the given format
pub fn encode(format: ExportFormat, rows: &[Row]) -> Result<Vec<u8>, ExportError> {
    if rows.is_empty() {
        return Err(ExportError::NothingToExport);
    }
    let headers = headers(rows);

    match format {
        ExportFormat::Csv => csv::encode(&headers, rows),
        ExportFormat::Excel => excel::encode(&headers, rows),
        ExportFormat::Pdf => pdf::encode("Report", &headers, rows),
    }
}

/// Write `{file_stem}.{ext}` into `dir` and return its path
pub fn export_rows(
    format: ExportFormat,
    rows: &[Row],
    file_stem: &str,
    dir: &Path,
) -> Result<PathBuf, ExportError> {
    let bytes = encode(format, rows)?;

    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.{}", file_stem, format.extension()));
    fs::write(&path, &bytes)?;

    info!(
        path = %path.display(),
        format = format.extension(),
        rows = rows.len(),
        bytes = bytes.len(),
        "exported rows"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Row> {
        vec![
            [
                ("date".to_string(), json!("09/29/2025")),
                ("employee".to_string(), json!("Asha Patel")),
                ("totalMins".to_string(), json!(435)),
            ]
            .into_iter()
            .collect(),
            [
                ("date".to_string(), json!("09/28/2025")),
                ("employee".to_string(), json!("Ravi Kumar")),
                ("totalMins".to_string(), json!(480)),
            ]
            .into_iter()
            .collect(),
        ]
    }

    #[test]
    fn test_empty_rows_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        for format in ExportFormat::ALL {
            let result = export_rows(format, &[], "report-export", dir.path());
            assert!(matches!(result, Err(ExportError::NothingToExport)));
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_export_every_format() {
        let dir = tempfile::tempdir().unwrap();
        for format in ExportFormat::ALL {
            let path = export_rows(format, &rows(), &file_stem("401k-setup"), dir.path()).unwrap();
            assert_eq!(
                path.file_name().unwrap().to_str().unwrap(),
                format!("401k-setup-export.{}", format.extension())
            );
            assert!(fs::metadata(&path).unwrap().len() > 0);
        }
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("xlsx".parse::<ExportFormat>().unwrap(), ExportFormat::Excel);
        assert!("docx".parse::<ExportFormat>().is_err());
        assert_eq!(file_stem(""), "report-export");
    }

    #[test]
    fn test_headers_from_first_row() {
        assert_eq!(headers(&rows()), vec!["date", "employee", "totalMins"]);
        assert!(headers(&[]).is_empty());
    }
}
