//! Dental contract reports

use crate::api::endpoints;
use crate::export::ColumnMap;
use crate::filter::{FilterControl, FilterSet, FilterSpec};
use crate::models::{FieldDef, Record};
use crate::notify::Notifier;
use crate::screens::{options_from, ExportSpec, ScreenData, ScreenDef, ScreenKind};
use crate::source::{DataSource, OnFailure, RecordFetcher};

pub const STATUSES: [&str; 5] = ["جديد", "موافق عليه", "تم التعاقد", "تم التسليم", "مرفوض"];

pub const NOT_DELIVERED: &str = "لم يتم التسليم بعد";
pub const CHOOSE_REPORT_TYPE: &str = "يرجى اختيار نوع التقرير";
const REPORT_READY: &str = "تم إنشاء التقرير بنجاح";
const FALLBACK_NOTICE: &str = "فشل في جلب البيانات من الخادم، سيتم عرض البيانات التجريبية";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    AllContracts,
    ByStatus,
    ByItem,
    ByFacilitySupplier,
}

impl ReportType {
    pub const ALL: [ReportType; 4] = [
        ReportType::AllContracts,
        ReportType::ByStatus,
        ReportType::ByItem,
        ReportType::ByFacilitySupplier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::AllContracts => "all-contracts",
            ReportType::ByStatus => "by-status",
            ReportType::ByItem => "by-item",
            ReportType::ByFacilitySupplier => "by-facility-supplier",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportType::AllContracts => "تقرير بجميع عقود الأسنان",
            ReportType::ByStatus => "تقرير حسب حالة العقود",
            ReportType::ByItem => "تقرير حسب رقم المعدة أو اسم المعدة",
            ReportType::ByFacilitySupplier => "تقرير لكل عيادة وشركة موردة معينة",
        }
    }

    pub fn parse(value: &str) -> Option<ReportType> {
        Self::ALL.iter().copied().find(|t| t.as_str() == value.trim())
    }

    pub fn next(&self) -> ReportType {
        let index = Self::ALL.iter().position(|t| t == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

pub fn columns() -> ColumnMap {
    ColumnMap::new(vec![
        FieldDef::new("id", "رقم العقد"),
        FieldDef::new("itemNumber", "رقم المعدة"),
        FieldDef::new("itemName", "اسم المعدة"),
        FieldDef::new("beneficiary", "العيادة المستفيدة"),
        FieldDef::new("supplier", "الشركة الموردة"),
        FieldDef::new("status", "الحالة"),
        FieldDef::new("totalCost", "التكلفة (ريال)"),
        FieldDef::new("orderDate", "تاريخ العقد"),
        FieldDef::with_default("deliveryDate", "تاريخ التسليم", NOT_DELIVERED),
    ])
}

fn document_columns() -> ColumnMap {
    ColumnMap::new(vec![
        FieldDef::new("id", "رقم العقد"),
        FieldDef::new("itemNumber", "رقم المعدة"),
        FieldDef::new("itemName", "اسم المعدة"),
        FieldDef::new("beneficiary", "العيادة"),
        FieldDef::new("supplier", "الشركة الموردة"),
        FieldDef::new("status", "الحالة"),
        FieldDef::new("totalCost", "التكلفة"),
        FieldDef::new("orderDate", "التاريخ"),
    ])
}

pub fn filters() -> FilterSet {
    FilterSet::new(vec![
        FilterControl::new("status", "الحالة", FilterSpec::equals("status", ""))
            .with_options(STATUSES.iter().map(|s| s.to_string()).collect()),
        FilterControl::new(
            "item",
            "رقم أو اسم المعدة",
            FilterSpec::contains("itemNumber", "").or_field("itemName"),
        ),
        FilterControl::new("facility", "العيادة", FilterSpec::equals("beneficiary", "")),
        FilterControl::new("supplier", "الشركة الموردة", FilterSpec::equals("supplier", "")),
    ])
}

/// Sample contracts shown when the report endpoint is unavailable
pub fn sample_contracts() -> Vec<Record> {
    vec![
        Record::new()
            .with("id", "CONT-001")
            .with("itemNumber", "DENT-001")
            .with("itemName", "كرسي الأسنان المتطور")
            .with("beneficiary", "عيادة الأسنان - المبنى الرئيسي")
            .with("supplier", "شركة التجهيزات الطبية المتقدمة")
            .with("status", "تم التعاقد")
            .with("totalCost", 85000i64)
            .with("orderDate", "2024-01-15")
            .with("deliveryDate", "2024-02-15"),
        Record::new()
            .with("id", "CONT-002")
            .with("itemNumber", "DENT-002")
            .with("itemName", "جهاز الأشعة السينية للأسنان")
            .with("beneficiary", "مركز طب الأسنان التخصصي")
            .with("supplier", "مؤسسة الأجهزة التشخيصية")
            .with("status", "موافق عليه")
            .with("totalCost", 120000i64)
            .with("orderDate", "2024-01-20")
            .with("deliveryDate", "2024-02-20"),
        Record::new()
            .with("id", "CONT-003")
            .with("itemNumber", "DENT-003")
            .with("itemName", "أدوات تقويم الأسنان")
            .with("beneficiary", "قسم تقويم الأسنان")
            .with("supplier", "شركة الأدوات الطبية المتخصصة")
            .with("status", "تم التسليم")
            .with("totalCost", 45000i64)
            .with("orderDate", "2024-01-10")
            .with("deliveryDate", "2024-01-25"),
        Record::new()
            .with("id", "CONT-004")
            .with("itemNumber", "DENT-004")
            .with("itemName", "جهاز تنظيف الأسنان بالموجات فوق الصوتية")
            .with("beneficiary", "عيادة الأسنان العامة")
            .with("supplier", "شركة التجهيزات الطبية المتقدمة")
            .with("status", "مرفوض")
            .with("totalCost", 25000i64)
            .with("orderDate", "2024-01-12")
            .with("deliveryDate", None::<String>),
    ]
}

pub fn source(report_type: ReportType) -> DataSource<Vec<Record>> {
    DataSource::new(
        endpoints::CONTRACT_REPORTS,
        OnFailure::UseFallback(sample_contracts()),
        FALLBACK_NOTICE,
    )
    .with_param("type", report_type.as_str())
    .with_success_notice(REPORT_READY)
}

pub fn definition(report_type: ReportType) -> ScreenDef {
    ScreenDef {
        kind: ScreenKind::ContractReports,
        columns: columns(),
        filters: filters(),
        primary: source(report_type),
        export: Some(ExportSpec {
            title: "تقرير_عقود_الأسنان",
            spreadsheet: columns(),
            document: document_columns(),
        }),
    }
}

/// A report can only be generated once its type is chosen
pub fn report_definition(report_type: Option<ReportType>, notifier: &dyn Notifier) -> Option<ScreenDef> {
    match report_type {
        Some(report_type) => Some(definition(report_type)),
        None => {
            notifier.error(CHOOSE_REPORT_TYPE);
            None
        }
    }
}

pub async fn load(def: &ScreenDef, fetcher: &dyn RecordFetcher, notifier: &dyn Notifier) -> ScreenData {
    let records = def.primary.load(fetcher, notifier).await;
    let options = vec![
        ("facility", options_from(&records.payload, "beneficiary")),
        ("supplier", options_from(&records.payload, "supplier")),
    ];

    let total: f64 = records.payload.iter().filter_map(|r| r.number("totalCost")).sum();
    let summary = vec![format!(
        "عدد العقود: {} | إجمالي التكلفة: {} ريال",
        records.payload.len(),
        crate::models::FieldValue::Number(total)
    )];

    ScreenData {
        records,
        options,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter;
    use crate::notify::{NoticeKind, NoticeLog};
    use crate::source::testing::StubFetcher;
    use serde_json::json;

    #[test]
    fn test_status_filter_on_sample_contracts() {
        let mut view = definition(ReportType::AllContracts).new_view();
        view.set_source(sample_contracts());

        view.set_filter("status", "موافق عليه");
        assert_eq!(view.visible().len(), 1);
        assert_eq!(view.visible()[0].id(), "CONT-002");

        view.set_filter("status", "all");
        view.set_filter("supplier", "شركة التجهيزات الطبية المتقدمة");
        assert_eq!(view.visible().len(), 2);
    }

    #[test]
    fn test_item_filter_matches_number_or_name() {
        let specs = vec![FilterSpec::contains("itemNumber", "dent-003").or_field("itemName")];
        assert_eq!(filter::apply(&sample_contracts(), &specs).len(), 1);

        let specs = vec![FilterSpec::contains("itemNumber", "الأشعة").or_field("itemName")];
        assert_eq!(filter::apply(&sample_contracts(), &specs)[0].id(), "CONT-002");
    }

    #[test]
    fn test_missing_delivery_date_reads_as_not_delivered() {
        let rows = columns().rows(&sample_contracts());
        assert_eq!(rows[3][8], NOT_DELIVERED);
        assert_eq!(rows[0][6], "85000");
    }

    #[test]
    fn test_report_requires_type() {
        let notices = NoticeLog::new();
        assert!(report_definition(None, &notices).is_none());
        assert_eq!(notices.last().unwrap().message, CHOOSE_REPORT_TYPE);

        let def = report_definition(Some(ReportType::ByItem), &notices).unwrap();
        assert_eq!(def.primary.params[0].1, "by-item");
    }

    #[tokio::test]
    async fn test_load_falls_back_and_fills_options() {
        let notices = NoticeLog::new();
        let def = definition(ReportType::ByStatus);

        let data = def.load(&StubFetcher::new(), &notices).await;
        assert!(data.records.is_degraded());
        assert_eq!(data.records.payload.len(), 4);
        assert_eq!(data.options[1].1.len(), 3);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices.last().unwrap().kind, NoticeKind::Error);
    }

    #[tokio::test]
    async fn test_live_report_announces_success() {
        let notices = NoticeLog::new();
        let fetcher = StubFetcher::new().with_data(
            endpoints::CONTRACT_REPORTS,
            json!([{"id": "CONT-100", "status": "جديد", "totalCost": 10}]),
        );

        let data = definition(ReportType::AllContracts).load(&fetcher, &notices).await;
        assert!(!data.records.is_degraded());
        assert_eq!(notices.count(NoticeKind::Success), 1);
        assert!(data.summary[0].contains("10"));
    }

    #[test]
    fn test_report_type_cycle() {
        assert_eq!(ReportType::ByFacilitySupplier.next(), ReportType::AllContracts);
        assert_eq!(ReportType::parse("by-status"), Some(ReportType::ByStatus));
    }
}
