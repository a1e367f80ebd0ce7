//! The five data screens
//!
//! Every screen follows the same shape: a primary record list with a failure
//! policy, a set of filter controls, table and export column maps, and
//! optional side lists (dropdown options, aggregates) loaded alongside it.

pub mod contracts;
pub mod dashboard;
pub mod facilities;
pub mod orders;
pub mod transactions;

use thiserror::Error;

use crate::api::WriteError;
use crate::export::ColumnMap;
use crate::filter::FilterSet;
use crate::models::Record;
use crate::notify::Notifier;
use crate::source::{DataSource, Loaded, RecordFetcher};
use crate::view::ViewState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenKind {
    ContractReports,
    ContractDashboard,
    TrackOrders,
    Facilities,
    Transactions,
}

impl ScreenKind {
    pub const ALL: [ScreenKind; 5] = [
        ScreenKind::ContractDashboard,
        ScreenKind::ContractReports,
        ScreenKind::TrackOrders,
        ScreenKind::Facilities,
        ScreenKind::Transactions,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ScreenKind::ContractReports => "reports",
            ScreenKind::ContractDashboard => "dashboard",
            ScreenKind::TrackOrders => "orders",
            ScreenKind::Facilities => "facilities",
            ScreenKind::Transactions => "transactions",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ScreenKind::ContractReports => "تقارير عقود الأسنان",
            ScreenKind::ContractDashboard => "لوحة تحكم عقود الأسنان",
            ScreenKind::TrackOrders => "متابعة طلبات الشراء المباشر",
            ScreenKind::Facilities => "إدارة المنشآت",
            ScreenKind::Transactions => "قائمة المعاملات الإدارية",
        }
    }

    pub fn parse(key: &str) -> Option<ScreenKind> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.key().eq_ignore_ascii_case(key.trim()))
    }

    pub fn definition(&self) -> ScreenDef {
        match self {
            ScreenKind::ContractReports => contracts::definition(contracts::ReportType::AllContracts),
            ScreenKind::ContractDashboard => dashboard::definition(),
            ScreenKind::TrackOrders => orders::definition(),
            ScreenKind::Facilities => facilities::definition(),
            ScreenKind::Transactions => transactions::definition(),
        }
    }
}

/// Export settings of a screen that offers export
#[derive(Debug, Clone)]
pub struct ExportSpec {
    pub title: &'static str,
    pub spreadsheet: ColumnMap,
    pub document: ColumnMap,
}

/// Static description of one screen
#[derive(Debug, Clone)]
pub struct ScreenDef {
    pub kind: ScreenKind,
    pub columns: ColumnMap,
    pub filters: FilterSet,
    pub primary: DataSource<Vec<Record>>,
    pub export: Option<ExportSpec>,
}

impl ScreenDef {
    pub fn new_view(&self) -> ViewState {
        ViewState::new(self.filters.clone())
    }

    /// Load the primary list and every side list of the screen
    pub async fn load(&self, fetcher: &dyn RecordFetcher, notifier: &dyn Notifier) -> ScreenData {
        match self.kind {
            ScreenKind::ContractReports => contracts::load(self, fetcher, notifier).await,
            ScreenKind::ContractDashboard => dashboard::load(self, fetcher, notifier).await,
            ScreenKind::TrackOrders => orders::load(self, fetcher, notifier).await,
            ScreenKind::Facilities => facilities::load(self, fetcher, notifier).await,
            ScreenKind::Transactions => transactions::load(self, fetcher, notifier).await,
        }
    }
}

/// Everything one load cycle produced for a screen
#[derive(Debug, Clone)]
pub struct ScreenData {
    pub records: Loaded<Vec<Record>>,
    /// Options for exact-match filter controls, keyed by control
    pub options: Vec<(&'static str, Vec<String>)>,
    /// Aggregate lines shown above the table
    pub summary: Vec<String>,
}

impl ScreenData {
    pub fn new(records: Loaded<Vec<Record>>) -> Self {
        Self {
            records,
            options: Vec::new(),
            summary: Vec::new(),
        }
    }

    /// Hand the result to a view: options first, then the records
    pub fn apply_to(self, view: &mut ViewState, ticket: crate::view::LoadTicket) -> Vec<String> {
        for (key, options) in self.options {
            view.set_filter_options(key, options);
        }
        view.finish_load(ticket, self.records);
        self.summary
    }
}

/// A form that cannot be sent as entered
#[derive(Error, Debug, PartialEq)]
pub enum FormError {
    #[error("الحقل \"{0}\" مطلوب")]
    Missing(&'static str),

    #[error("قيمة الحقل \"{field}\" غير صالحة: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Failure of a user action that writes to the API
#[derive(Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

pub(crate) fn require(value: &str, label: &'static str) -> Result<(), FormError> {
    if value.trim().is_empty() {
        Err(FormError::Missing(label))
    } else {
        Ok(())
    }
}

/// Check a form, raising one error notice when it is rejected
pub(crate) fn check_form(result: Result<(), FormError>, notifier: &dyn Notifier) -> Result<(), FormError> {
    if let Err(e) = &result {
        notifier.error(&e.to_string());
    }
    result
}

/// Option list for a field, from the records themselves
pub(crate) fn options_from(records: &[Record], field: &str) -> Vec<String> {
    crate::models::distinct_values(records, field)
}

/// Names of facility records, the usual dropdown source
pub(crate) fn facility_names(facilities: &[Record]) -> Vec<String> {
    options_from(facilities, "name")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_screen_keys() {
        assert_eq!(ScreenKind::parse("Orders"), Some(ScreenKind::TrackOrders));
        assert_eq!(ScreenKind::parse(" transactions "), Some(ScreenKind::Transactions));
        assert_eq!(ScreenKind::parse("unknown"), None);
    }

    #[test]
    fn test_every_screen_has_a_definition() {
        for kind in ScreenKind::ALL {
            let def = kind.definition();
            assert_eq!(def.kind, kind);
            assert!(!def.columns.is_empty());
            assert!(!def.filters.is_empty());
        }
    }
}
