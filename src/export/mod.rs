//! Export of the visible list to spreadsheet, PDF or print output
//!
//! The adapter checks its precondition (something to export), renders with the
//! format module and hands the bytes to a sink. It never returns an error to the
//! caller; every outcome is reported with exactly one notice.

pub mod document;
pub mod print;
pub mod spreadsheet;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

use crate::models::{FieldDef, Record};
use crate::notify::Notifier;

pub const NOTHING_TO_EXPORT: &str = "لا توجد بيانات للتصدير";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Font error: {0}")]
    Font(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Spreadsheet,
    Document,
    Print,
}

impl ExportFormat {
    pub fn label(&self) -> &str {
        match self {
            ExportFormat::Spreadsheet => "Excel",
            ExportFormat::Document => "PDF",
            ExportFormat::Print => "الطباعة",
        }
    }

    pub fn file_extension(&self) -> &str {
        match self {
            ExportFormat::Spreadsheet => "csv",
            ExportFormat::Document => "pdf",
            ExportFormat::Print => "html",
        }
    }
}

/// Static mapping from internal field names to column labels, in output order
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    columns: Vec<FieldDef>,
}

impl ColumnMap {
    pub fn new(columns: Vec<FieldDef>) -> Self {
        Self { columns }
    }

    pub fn labels(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label).collect()
    }

    pub fn columns(&self) -> &[FieldDef] {
        &self.columns
    }

    pub fn row(&self, record: &Record) -> Vec<String> {
        self.columns.iter().map(|c| c.read(record)).collect()
    }

    pub fn rows(&self, records: &[Record]) -> Vec<Vec<String>> {
        records.iter().map(|r| self.row(r)).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Where downloadable files go
pub trait DownloadSink: Send + Sync {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, ExportError>;
}

/// Where print fragments go
pub trait PrintSink: Send + Sync {
    fn print(&self, title: &str, fragment: &str) -> Result<(), ExportError>;
}

/// Writes downloads into a directory; print jobs become self-printing HTML pages
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        std::fs::write(&path, bytes)?;
        info!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

impl PrintSink for DirectorySink {
    fn print(&self, title: &str, fragment: &str) -> Result<(), ExportError> {
        let page = print::page(title, fragment);
        let filename = format!("{}.html", file_stem(title));
        self.save(&filename, page.as_bytes())?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Saved(PathBuf),
    Printed,
    Refused,
    Failed(String),
}

pub struct ExportAdapter<'a> {
    downloads: &'a dyn DownloadSink,
    printer: &'a dyn PrintSink,
    notifier: &'a dyn Notifier,
}

impl<'a> ExportAdapter<'a> {
    pub fn new(downloads: &'a dyn DownloadSink, printer: &'a dyn PrintSink, notifier: &'a dyn Notifier) -> Self {
        Self {
            downloads,
            printer,
            notifier,
        }
    }

    pub fn export(&self, records: &[Record], columns: &ColumnMap, format: ExportFormat, title: &str) -> ExportOutcome {
        if records.is_empty() {
            self.notifier.error(NOTHING_TO_EXPORT);
            return ExportOutcome::Refused;
        }

        let result = match format {
            ExportFormat::Spreadsheet => spreadsheet::render(columns, records)
                .and_then(|bytes| self.save(title, format, &bytes))
                .map(ExportOutcome::Saved),
            ExportFormat::Document => document::render(title, columns, records)
                .and_then(|bytes| self.save(title, format, &bytes))
                .map(ExportOutcome::Saved),
            ExportFormat::Print => {
                let fragment = print::table_fragment(title, columns, records);
                self.printer.print(title, &fragment).map(|_| ExportOutcome::Printed)
            }
        };

        self.report(result, format)
    }

    /// Print a single record as a labelled sheet
    pub fn print_record(&self, record: &Record, columns: &ColumnMap, title: &str) -> ExportOutcome {
        let fragment = print::record_fragment(title, columns, record);
        let result = self.printer.print(title, &fragment).map(|_| ExportOutcome::Printed);
        self.report(result, ExportFormat::Print)
    }

    fn save(&self, title: &str, format: ExportFormat, bytes: &[u8]) -> Result<PathBuf, ExportError> {
        let filename = format!("{}.{}", file_stem(title), format.file_extension());
        self.downloads.save(&filename, bytes)
    }

    fn report(&self, result: Result<ExportOutcome, ExportError>, format: ExportFormat) -> ExportOutcome {
        match result {
            Ok(outcome) => {
                self.notifier
                    .success(&format!("تم التصدير إلى {} بنجاح", format.label()));
                outcome
            }
            Err(e) => {
                error!("Export to {} failed: {}", format.label(), e);
                self.notifier
                    .error(&format!("فشل في التصدير إلى {}", format.label()));
                ExportOutcome::Failed(e.to_string())
            }
        }
    }
}

/// File name stem from a report title: spaces become underscores, path
/// separators and other reserved characters are dropped
pub fn file_stem(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    if stem.is_empty() {
        "export".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{NoticeKind, NoticeLog};
    use tempfile::TempDir;

    fn columns() -> ColumnMap {
        ColumnMap::new(vec![
            FieldDef::new("id", "رقم العقد"),
            FieldDef::with_default("deliveryDate", "تاريخ التسليم", "لم يتم التسليم بعد"),
        ])
    }

    fn records() -> Vec<Record> {
        vec![
            Record::new().with("id", "CONT-001").with("deliveryDate", "2024-02-15"),
            Record::new().with("id", "CONT-004"),
        ]
    }

    struct FailingSink;

    impl DownloadSink for FailingSink {
        fn save(&self, _filename: &str, _bytes: &[u8]) -> Result<PathBuf, ExportError> {
            Err(ExportError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only")))
        }
    }

    impl PrintSink for FailingSink {
        fn print(&self, _title: &str, _fragment: &str) -> Result<(), ExportError> {
            Err(ExportError::Io(std::io::Error::new(std::io::ErrorKind::Other, "no printer")))
        }
    }

    #[test]
    fn test_empty_export_is_refused_with_one_notice() {
        let temp_dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(temp_dir.path());
        let notices = NoticeLog::new();
        let adapter = ExportAdapter::new(&sink, &sink, &notices);

        for format in [ExportFormat::Spreadsheet, ExportFormat::Document, ExportFormat::Print] {
            assert_eq!(adapter.export(&[], &columns(), format, "report"), ExportOutcome::Refused);
        }

        assert_eq!(notices.len(), 3);
        assert!(notices.notices().iter().all(|n| n.message == NOTHING_TO_EXPORT));
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_spreadsheet_export_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(temp_dir.path());
        let notices = NoticeLog::new();
        let adapter = ExportAdapter::new(&sink, &sink, &notices);

        let outcome = adapter.export(&records(), &columns(), ExportFormat::Spreadsheet, "تقرير عقود الأسنان");
        let expected = temp_dir.path().join("تقرير_عقود_الأسنان.csv");
        assert_eq!(outcome, ExportOutcome::Saved(expected.clone()));

        let content = std::fs::read_to_string(expected).unwrap();
        assert!(content.contains("لم يتم التسليم بعد"));
        assert_eq!(notices.count(NoticeKind::Success), 1);
    }

    #[test]
    fn test_print_writes_html_page() {
        let temp_dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(temp_dir.path());
        let notices = NoticeLog::new();
        let adapter = ExportAdapter::new(&sink, &sink, &notices);

        let outcome = adapter.print_record(&records()[0], &columns(), "معاملة 1");
        assert_eq!(outcome, ExportOutcome::Printed);

        let page = std::fs::read_to_string(temp_dir.path().join("معاملة_1.html")).unwrap();
        assert!(page.contains("CONT-001"));
        assert!(page.contains("window.print()"));
    }

    #[test]
    fn test_sink_failure_reports_single_error() {
        let notices = NoticeLog::new();
        let adapter = ExportAdapter::new(&FailingSink, &FailingSink, &notices);

        let outcome = adapter.export(&records(), &columns(), ExportFormat::Document, "report");
        assert!(matches!(outcome, ExportOutcome::Failed(_)));
        assert_eq!(notices.len(), 1);
        assert_eq!(notices.last().unwrap().kind, NoticeKind::Error);
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(" a b/c "), "a_bc");
        assert_eq!(file_stem("???"), "export");
    }
}
