//! Right-to-left HTML fragments for the print dialog

use crate::export::ColumnMap;
use crate::models::Record;

const CONTAINER_OPEN: &str = "<div style=\"direction: rtl; font-family: Arial, sans-serif; padding: 20px;\">\n";

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// One record as labelled lines
pub fn record_fragment(title: &str, columns: &ColumnMap, record: &Record) -> String {
    let mut html = String::from(CONTAINER_OPEN);
    html.push_str(&format!("  <h2>{}</h2>\n  <hr>\n", escape(title)));
    for (column, value) in columns.columns().iter().zip(columns.row(record)) {
        html.push_str(&format!(
            "  <p><strong>{}:</strong> {}</p>\n",
            escape(column.label),
            escape(&value)
        ));
    }
    html.push_str("</div>\n");
    html
}

/// The visible list as a table
pub fn table_fragment(title: &str, columns: &ColumnMap, records: &[Record]) -> String {
    let mut html = String::from(CONTAINER_OPEN);
    html.push_str(&format!("  <h2>{}</h2>\n", escape(title)));
    html.push_str("  <table border=\"1\" cellpadding=\"4\" style=\"border-collapse: collapse; width: 100%;\">\n    <tr>");
    for label in columns.labels() {
        html.push_str(&format!("<th>{}</th>", escape(label)));
    }
    html.push_str("</tr>\n");
    for row in columns.rows(records) {
        html.push_str("    <tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape(&cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("  </table>\n</div>\n");
    html
}

/// Standalone page that opens the print dialog when loaded
pub fn page(title: &str, fragment: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"ar\" dir=\"rtl\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body onload=\"window.print()\">\n{}</body>\n</html>\n",
        escape(title),
        fragment
    )
}
