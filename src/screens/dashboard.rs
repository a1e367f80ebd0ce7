//! Dental contract dashboard: aggregates, rankings and a filterable contract list

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::api::endpoints;
use crate::export::ColumnMap;
use crate::filter::{FilterControl, FilterSet, FilterSpec};
use crate::models::{FieldDef, FieldValue, Record};
use crate::notify::Notifier;
use crate::screens::{ScreenData, ScreenDef, ScreenKind};
use crate::source::{DataSource, Loaded, OnFailure, RecordFetcher, Usable};
use crate::view::ViewState;

const FALLBACK_NOTICE: &str = "فشل في جلب بيانات لوحة التحكم، سيتم عرض البيانات التجريبية";
const SUPPLIERS_NOTICE: &str = "فشل في جلب بيانات أفضل الشركات الموردة";
const CLINICS_NOTICE: &str = "فشل في جلب بيانات أكثر العيادات نشاطاً";
pub const FILTERS_APPLIED: &str = "تم تطبيق الفلاتر بنجاح";
pub const FILTERS_CLEARED: &str = "تم مسح الفلاتر";

/// Counters absent from a live summary read as zero
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSummary {
    pub total: u64,
    pub new: u64,
    pub approved: u64,
    pub contracted: u64,
    pub delivered: u64,
    pub rejected: u64,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusSlice {
    pub name: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MonthlyPoint {
    pub month: String,
    pub contracts: u64,
    pub value: f64,
}

/// A supplier or clinic ranked by contract count
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankedEntity {
    pub name: String,
    pub contracts: u64,
    pub value: f64,
}

/// The dashboard payload. Each part that is missing, null or malformed in a
/// live response falls back to its sample on its own; the contract list falls
/// back to empty.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawDashboard")]
pub struct DashboardData {
    pub summary: DashboardSummary,
    pub status_data: Vec<StatusSlice>,
    pub monthly_data: Vec<MonthlyPoint>,
    pub contracts: Vec<Record>,
}

/// Wire shape: every part kept undecoded until it is checked on its own
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDashboard {
    summary: Option<Value>,
    status_data: Option<Value>,
    monthly_data: Option<Value>,
    contracts: Option<Value>,
}

fn part_or<T, F>(name: &str, value: Option<Value>, fallback: F) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match value {
        None | Some(Value::Null) => fallback(),
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            debug!("Dashboard part {} could not be decoded: {}", name, e);
            fallback()
        }),
    }
}

impl From<RawDashboard> for DashboardData {
    fn from(raw: RawDashboard) -> Self {
        Self {
            summary: part_or("summary", raw.summary, sample_summary),
            status_data: part_or("statusData", raw.status_data, sample_status_data),
            monthly_data: part_or("monthlyData", raw.monthly_data, sample_monthly_data),
            contracts: part_or("contracts", raw.contracts, Vec::new),
        }
    }
}

impl Default for DashboardData {
    fn default() -> Self {
        Self {
            summary: sample_summary(),
            status_data: sample_status_data(),
            monthly_data: sample_monthly_data(),
            contracts: Vec::new(),
        }
    }
}

impl Usable for DashboardData {}

fn sample_summary() -> DashboardSummary {
    DashboardSummary {
        total: 125,
        new: 8,
        approved: 25,
        contracted: 67,
        delivered: 18,
        rejected: 7,
        total_value: 1_850_000.0,
    }
}

fn sample_status_data() -> Vec<StatusSlice> {
    [
        ("جديد", 8),
        ("موافق عليه", 25),
        ("تم التعاقد", 67),
        ("تم التسليم", 18),
        ("مرفوض", 7),
    ]
    .into_iter()
    .map(|(name, value)| StatusSlice {
        name: name.to_string(),
        value,
    })
    .collect()
}

fn sample_monthly_data() -> Vec<MonthlyPoint> {
    [
        ("يناير", 32, 485_000.0),
        ("فبراير", 28, 420_000.0),
        ("مارس", 35, 560_000.0),
        ("أبريل", 30, 385_000.0),
    ]
    .into_iter()
    .map(|(month, contracts, value)| MonthlyPoint {
        month: month.to_string(),
        contracts,
        value,
    })
    .collect()
}

fn ranked(entries: &[(&str, u64, f64)]) -> Vec<RankedEntity> {
    entries
        .iter()
        .map(|(name, contracts, value)| RankedEntity {
            name: name.to_string(),
            contracts: *contracts,
            value: *value,
        })
        .collect()
}

pub fn sample_top_suppliers() -> Vec<RankedEntity> {
    ranked(&[
        ("شركة التجهيزات الطبية المتقدمة", 35, 650_000.0),
        ("مؤسسة الأجهزة التشخيصية", 28, 485_000.0),
        ("شركة الأدوات الطبية المتخصصة", 22, 380_000.0),
        ("مجموعة أجهزة طب الأسنان", 18, 335_000.0),
    ])
}

pub fn sample_top_clinics() -> Vec<RankedEntity> {
    ranked(&[
        ("عيادة الأسنان - المبنى الرئيسي", 42, 720_000.0),
        ("مركز طب الأسنان التخصصي", 35, 580_000.0),
        ("قسم تقويم الأسنان", 28, 450_000.0),
        ("عيادة الأسنان العامة", 20, 300_000.0),
    ])
}

pub fn columns() -> ColumnMap {
    ColumnMap::new(vec![
        FieldDef::new("id", "رقم العقد"),
        FieldDef::new("itemNumber", "رقم المعدة"),
        FieldDef::new("itemName", "اسم المعدة"),
        FieldDef::new("beneficiary", "العيادة"),
        FieldDef::new("supplier", "الشركة الموردة"),
        FieldDef::new("status", "الحالة"),
        FieldDef::new("totalCost", "التكلفة (ريال)"),
    ])
}

pub fn filters() -> FilterSet {
    FilterSet::new(vec![
        FilterControl::new(
            "clinic",
            "العيادة",
            FilterSpec::contains("clinic", "").or_field("beneficiary"),
        ),
        FilterControl::new(
            "equipment",
            "المعدة",
            FilterSpec::contains("itemNumber", "").or_field("itemName"),
        ),
        FilterControl::new("supplier", "الشركة الموردة", FilterSpec::contains("supplier", "")),
    ])
}

pub fn definition() -> ScreenDef {
    ScreenDef {
        kind: ScreenKind::ContractDashboard,
        columns: columns(),
        filters: filters(),
        primary: DataSource::new(endpoints::CONTRACT_DASHBOARD, OnFailure::KeepEmpty, FALLBACK_NOTICE),
        export: None,
    }
}

/// The aggregate read from the primary endpoint of the screen
pub fn aggregate_source(primary: &DataSource<Vec<Record>>) -> DataSource<DashboardData> {
    let mut source = DataSource::new(
        &primary.endpoint,
        OnFailure::UseFallback(DashboardData::default()),
        &primary.failure_notice,
    );
    source.params = primary.params.clone();
    source
}

pub fn suppliers_source() -> DataSource<Vec<RankedEntity>> {
    DataSource::new(
        endpoints::TOP_SUPPLIERS,
        OnFailure::UseFallback(sample_top_suppliers()),
        SUPPLIERS_NOTICE,
    )
}

pub fn clinics_source() -> DataSource<Vec<RankedEntity>> {
    DataSource::new(
        endpoints::TOP_CLINICS,
        OnFailure::UseFallback(sample_top_clinics()),
        CLINICS_NOTICE,
    )
}

/// Explicit "apply" button: the same derivation, announced
pub fn apply_filters(view: &mut ViewState, notifier: &dyn Notifier) {
    view.reapply();
    notifier.success(FILTERS_APPLIED);
}

pub fn clear_filters(view: &mut ViewState, notifier: &dyn Notifier) {
    view.clear_filters();
    notifier.success(FILTERS_CLEARED);
}

pub fn summary_lines(data: &DashboardData, suppliers: &[RankedEntity], clinics: &[RankedEntity]) -> Vec<String> {
    let s = &data.summary;
    let mut lines = vec![
        format!(
            "إجمالي العقود: {} | جديد: {} | موافق عليه: {} | تم التعاقد: {} | تم التسليم: {} | مرفوض: {}",
            s.total, s.new, s.approved, s.contracted, s.delivered, s.rejected
        ),
        format!("إجمالي القيمة: {} ريال", FieldValue::Number(s.total_value)),
    ];

    if !data.monthly_data.is_empty() {
        let months: Vec<String> = data
            .monthly_data
            .iter()
            .map(|m| format!("{} {} ({})", m.month, m.contracts, FieldValue::Number(m.value)))
            .collect();
        lines.push(format!("شهرياً: {}", months.join(" · ")));
    }

    if let Some(top) = suppliers.first() {
        lines.push(format!("أفضل شركة موردة: {} ({} عقد)", top.name, top.contracts));
    }
    if let Some(top) = clinics.first() {
        lines.push(format!("أكثر العيادات نشاطاً: {} ({} عقد)", top.name, top.contracts));
    }
    lines
}

pub async fn load(def: &ScreenDef, fetcher: &dyn RecordFetcher, notifier: &dyn Notifier) -> ScreenData {
    let aggregate = aggregate_source(&def.primary);
    let suppliers = suppliers_source();
    let clinics = clinics_source();

    let (data, suppliers, clinics) = futures::join!(
        aggregate.load(fetcher, notifier),
        suppliers.load(fetcher, notifier),
        clinics.load(fetcher, notifier)
    );

    let summary = summary_lines(&data.payload, &suppliers.payload, &clinics.payload);
    let records = Loaded {
        payload: data.payload.contracts,
        origin: data.origin,
        error: data.error,
    };

    ScreenData {
        records,
        options: Vec::new(),
        summary,
    }
}
