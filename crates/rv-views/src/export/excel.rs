//! Spreadsheet encoder: one worksheet named "Report", header in row 0

use rust_xlsxwriter::{Format, Workbook};
use rv_core::Row;
use serde_json::Value;

use super::ExportError;

pub const SHEET_NAME: &str = "Report";

pub fn encode(headers: &[String], rows: &[Row]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &bold)?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let r = idx as u32 + 1;
        for (col, header) in headers.iter().enumerate() {
            let c = col as u16;
            match row.get(header) {
                None | Some(Value::Null) => {}
                Some(Value::Number(n)) => match n.as_f64() {
                    Some(n) => {
                        worksheet.write_number(r, c, n)?;
                    }
                    None => {
                        worksheet.write_string(r, c, n.to_string())?;
                    }
                },
                Some(Value::Bool(b)) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
                Some(Value::String(s)) => {
                    worksheet.write_string(r, c, s)?;
                }
                Some(other) => {
                    worksheet.write_string(r, c, other.to_string())?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}
