//! CSV rendering for spreadsheet tools

use crate::export::{ColumnMap, ExportError};
use crate::models::Record;

/// Spreadsheet tools only detect UTF-8 (and so the Arabic labels) with a BOM
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn render(columns: &ColumnMap, records: &[Record]) -> Result<Vec<u8>, ExportError> {
    let mut buffer = UTF8_BOM.to_vec();
    {
        let mut writer = csv::Writer::from_writer(&mut buffer);
        writer.write_record(columns.labels())?;
        for row in columns.rows(records) {
            writer.write_record(&row)?;
        }
        writer.flush()?;
    }
    Ok(buffer)
}
