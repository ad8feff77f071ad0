//! PDF encoder: landscape A4 pages with a title and a table whose header
//! row repeats on every page

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use rv_core::Row;
use rv_data::filter::cell_text;

use super::ExportError;

const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const MARGIN: f32 = 14.1;
const TABLE_TOP: f32 = 21.2;
const ROW_HEIGHT: f32 = 7.0;
const TITLE_SIZE: f32 = 16.0;
const CELL_SIZE: f32 = 9.0;
// Average Helvetica glyph width at CELL_SIZE, in mm
const CHAR_WIDTH: f32 = 1.6;

/// Body rows that fit on one page under the header row
pub fn rows_per_page() -> usize {
    let lines = ((PAGE_HEIGHT - TABLE_TOP - MARGIN) / ROW_HEIGHT) as usize;
    lines.saturating_sub(1).max(1)
}

pub fn encode(title: &str, headers: &[String], rows: &[Row]) -> Result<Vec<u8>, ExportError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    let column_width = (PAGE_WIDTH - 2.0 * MARGIN) / headers.len().max(1) as f32;
    let max_chars = ((column_width / CHAR_WIDTH) as usize).max(4);

    for (page_idx, chunk) in rows.chunks(rows_per_page()).enumerate() {
        let layer = if page_idx == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            doc.get_page(page).get_layer(layer)
        };

        if page_idx == 0 {
            layer.use_text(title, TITLE_SIZE, Mm(MARGIN), Mm(PAGE_HEIGHT - MARGIN), &bold);
        }

        let cells: Vec<String> = headers.iter().map(|h| fit(h, max_chars)).collect();
        write_line(&layer, &cells, 0, column_width, &bold);

        for (line, row) in chunk.iter().enumerate() {
            let cells: Vec<String> = headers
                .iter()
                .map(|h| fit(&cell_text(row.get(h)), max_chars))
                .collect();
            write_line(&layer, &cells, line + 1, column_width, &regular);
        }
    }

    Ok(doc.save_to_bytes()?)
}

fn write_line(
    layer: &PdfLayerReference,
    cells: &[String],
    line: usize,
    column_width: f32,
    font: &IndirectFontRef,
) {
    let y = PAGE_HEIGHT - TABLE_TOP - ROW_HEIGHT * (line as f32 + 1.0);
    for (col, text) in cells.iter().enumerate() {
        let x = MARGIN + column_width * col as f32;
        layer.use_text(text.as_str(), CELL_SIZE, Mm(x), Mm(y), font);
    }
}

fn fit(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
