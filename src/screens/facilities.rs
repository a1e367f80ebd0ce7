//! Facility management: list, stats and the add/edit/toggle actions

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{endpoints, perform_write, RecordWriter, WriteMethod, WriteNotices, WriteRequest};
use crate::export::ColumnMap;
use crate::filter::{FilterControl, FilterSet, FilterSpec};
use crate::models::{FieldDef, Record};
use crate::notify::Notifier;
use crate::screens::{check_form, require, ActionError, FormError, ScreenData, ScreenDef, ScreenKind};
use crate::source::{DataSource, OnFailure, RecordFetcher, Usable};

const LOAD_NOTICE: &str = "تعذر تحميل بيانات المنشآت، سيتم عرض البيانات التجريبية";
const STATS_NOTICE: &str = "تعذر تحميل إحصائيات المنشآت، تم حسابها من القائمة";

pub const ACTIVE: &str = "نشط";
pub const INACTIVE: &str = "غير نشط";
/// Display-only field holding the active/inactive label
pub const STATUS_FIELD: &str = "statusLabel";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityStats {
    pub active: u64,
    pub inactive: u64,
    pub total: u64,
    pub activation_percentage: u64,
}

impl Usable for FacilityStats {}

pub fn compute_stats(facilities: &[Record]) -> FacilityStats {
    let total = facilities.len() as u64;
    let active = facilities.iter().filter(|f| f.flag("isActive")).count() as u64;
    let activation_percentage = if total > 0 {
        (active as f64 / total as f64 * 100.0).round() as u64
    } else {
        0
    };

    FacilityStats {
        active,
        inactive: total - active,
        total,
        activation_percentage,
    }
}

/// The add/edit facility form
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacilityForm {
    pub name: String,
    pub code: String,
    pub location: String,
    pub phone: String,
    pub email: String,
    pub manager: String,
    pub is_active: bool,
    pub address: String,
    pub description: String,
}

impl Default for FacilityForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            code: String::new(),
            location: String::new(),
            phone: String::new(),
            email: String::new(),
            manager: String::new(),
            is_active: true,
            address: String::new(),
            description: String::new(),
        }
    }
}

impl FacilityForm {
    /// Prefill from an existing facility for editing
    pub fn from_record(record: &Record) -> Self {
        Self {
            name: record.text("name"),
            code: record.text("code"),
            location: record.text("location"),
            phone: record.text("phone"),
            email: record.text("email"),
            manager: record.text("manager"),
            is_active: record.flag("isActive"),
            address: record.text("address"),
            description: record.text("description"),
        }
    }

    pub fn validate(&self) -> Result<(), FormError> {
        require(&self.name, "اسم المنشأة")?;
        require(&self.code, "رمز المنشأة")?;

        let email = self.email.trim();
        if !email.is_empty() && !email.contains('@') {
            return Err(FormError::Invalid {
                field: "البريد الإلكتروني",
                reason: email.to_string(),
            });
        }
        Ok(())
    }

    fn to_body(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

pub fn sample_facilities() -> Vec<Record> {
    vec![
        Record::new()
            .with("id", "1")
            .with("name", "مستشفى الملك فهد")
            .with("code", "KFH001")
            .with("location", "الرياض - الملز")
            .with("phone", "011-123-4567")
            .with("email", "info@kfh.health.sa")
            .with("manager", "د. أحمد السعود")
            .with("isActive", true)
            .with("address", "شارع الملك فهد، حي الملز، الرياض 12345")
            .with("description", "مستشفى متخصص في الطب العام والجراحة"),
        Record::new()
            .with("id", "2")
            .with("name", "مركز الأمير سلطان")
            .with("code", "PSC002")
            .with("location", "الرياض - العليا")
            .with("phone", "011-987-6543")
            .with("email", "contact@psc.health.sa")
            .with("manager", "د. فاطمة الأحمد")
            .with("isActive", true)
            .with("address", "طريق الملك عبدالعزيز، حي العليا، الرياض 12356")
            .with("description", "مركز طبي متخصص في أمراض القلب"),
        Record::new()
            .with("id", "3")
            .with("name", "مستوصف النور")
            .with("code", "NOR003")
            .with("location", "الرياض - الدرعية")
            .with("phone", "011-555-0123")
            .with("email", "info@noor.health.sa")
            .with("manager", "د. محمد الخالد")
            .with("isActive", false)
            .with("address", "حي الدرعية، الرياض 12367")
            .with("description", "مستوصف طبي عام - قيد التطوير"),
    ]
}

pub fn columns() -> ColumnMap {
    ColumnMap::new(vec![
        FieldDef::new("name", "اسم المنشأة"),
        FieldDef::new("code", "رمز المنشأة"),
        FieldDef::new("location", "الموقع"),
        FieldDef::new("manager", "المدير المسؤول"),
        FieldDef::new("phone", "رقم الهاتف"),
        FieldDef::new("email", "البريد الإلكتروني"),
        FieldDef::new(STATUS_FIELD, "الحالة"),
    ])
}

pub fn filters() -> FilterSet {
    FilterSet::new(vec![FilterControl::new(
        "search",
        "البحث بالاسم أو الرمز",
        FilterSpec::contains("name", "").or_field("code"),
    )])
}

pub fn definition() -> ScreenDef {
    ScreenDef {
        kind: ScreenKind::Facilities,
        columns: columns(),
        filters: filters(),
        primary: DataSource::new(
            endpoints::FACILITIES,
            OnFailure::UseFallback(sample_facilities()),
            LOAD_NOTICE,
        ),
        export: None,
    }
}

pub fn stats_source() -> DataSource<FacilityStats> {
    DataSource::new(
        endpoints::FACILITY_STATS,
        OnFailure::UseFallback(FacilityStats::default()),
        STATS_NOTICE,
    )
}

pub fn stats_line(stats: &FacilityStats) -> String {
    format!(
        "المنشآت النشطة: {} | غير النشطة: {} | الإجمالي: {} | نسبة التفعيل: {}%",
        stats.active, stats.inactive, stats.total, stats.activation_percentage
    )
}

fn decorate(mut facilities: Vec<Record>) -> Vec<Record> {
    for facility in &mut facilities {
        let label = if facility.flag("isActive") { ACTIVE } else { INACTIVE };
        facility.set(STATUS_FIELD, label);
    }
    facilities
}

pub async fn load(def: &ScreenDef, fetcher: &dyn RecordFetcher, notifier: &dyn Notifier) -> ScreenData {
    let stats = stats_source();
    let (mut records, mut stats) = futures::join!(def.primary.load(fetcher, notifier), stats.load(fetcher, notifier));

    if stats.is_degraded() {
        stats.payload = compute_stats(&records.payload);
    }
    records.payload = decorate(records.payload);

    ScreenData {
        records,
        options: Vec::new(),
        summary: vec![stats_line(&stats.payload)],
    }
}

async fn write_and_reload(
    writer: &dyn RecordWriter,
    fetcher: &dyn RecordFetcher,
    notifier: &dyn Notifier,
    request: WriteRequest,
    notices: WriteNotices,
) -> Result<ScreenData, ActionError> {
    perform_write(writer, notifier, request, &notices).await?;
    Ok(definition().load(fetcher, notifier).await)
}

/// Add a facility, then reload the list and stats
pub async fn create_facility(
    writer: &dyn RecordWriter,
    fetcher: &dyn RecordFetcher,
    notifier: &dyn Notifier,
    form: &FacilityForm,
) -> Result<ScreenData, ActionError> {
    check_form(form.validate(), notifier)?;
    let request = WriteRequest::new(WriteMethod::Create, endpoints::FACILITIES).with_body(form.to_body());
    let notices = WriteNotices::new(
        format!("تم إضافة المنشأة بنجاح: {}", form.name),
        "خطأ في إضافة المنشأة",
    );
    write_and_reload(writer, fetcher, notifier, request, notices).await
}

pub async fn update_facility(
    writer: &dyn RecordWriter,
    fetcher: &dyn RecordFetcher,
    notifier: &dyn Notifier,
    id: &str,
    form: &FacilityForm,
) -> Result<ScreenData, ActionError> {
    check_form(form.validate(), notifier)?;
    let request = WriteRequest::new(WriteMethod::Update, endpoints::facility(id)).with_body(form.to_body());
    let notices = WriteNotices::new(
        format!("تم تحديث المنشأة بنجاح: {}", form.name),
        "خطأ في تحديث المنشأة",
    );
    write_and_reload(writer, fetcher, notifier, request, notices).await
}

pub async fn toggle_facility(
    writer: &dyn RecordWriter,
    fetcher: &dyn RecordFetcher,
    notifier: &dyn Notifier,
    id: &str,
) -> Result<ScreenData, ActionError> {
    let request = WriteRequest::new(WriteMethod::Toggle, endpoints::facility_toggle(id));
    let notices = WriteNotices::new("تم تحديث حالة المنشأة", "خطأ في تحديث الحالة");
    write_and_reload(writer, fetcher, notifier, request, notices).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::writes::testing::StubWriter;
    use crate::notify::{NoticeKind, NoticeLog};
    use crate::source::testing::StubFetcher;
    use serde_json::json;

    #[test]
    fn test_compute_stats_rounds_percentage() {
        let stats = compute_stats(&sample_facilities());
        assert_eq!(
            stats,
            FacilityStats {
                active: 2,
                inactive: 1,
                total: 3,
                activation_percentage: 67,
            }
        );
        assert_eq!(compute_stats(&[]).activation_percentage, 0);
    }

    #[test]
    fn test_search_by_name_or_code() {
        let mut view = definition().new_view();
        view.set_source(vec![
            Record::new().with("name", "A").with("code", "X1"),
            Record::new().with("name", "B").with("code", "X2"),
        ]);

        view.set_filter("search", "x1");
        assert_eq!(view.visible().len(), 1);
        assert_eq!(view.visible()[0].text("name"), "A");
    }

    #[tokio::test]
    async fn test_stats_fall_back_to_computed_values() {
        let notices = NoticeLog::new();
        let fetcher = StubFetcher::new().with_data(
            endpoints::FACILITIES,
            json!([
                {"id": 1, "name": "A", "code": "X1", "isActive": true},
                {"id": 2, "name": "B", "code": "X2", "isActive": false}
            ]),
        );

        let data = definition().load(&fetcher, &notices).await;
        assert!(!data.records.is_degraded());
        assert_eq!(data.records.payload[1].text(STATUS_FIELD), INACTIVE);
        assert!(data.summary[0].contains("50%"));
        assert_eq!(notices.len(), 1);
    }

    #[tokio::test]
    async fn test_live_stats_are_used() {
        let notices = NoticeLog::new();
        let fetcher = StubFetcher::new().with_data(
            endpoints::FACILITY_STATS,
            json!({"active": 10, "inactive": 5, "total": 15, "activationPercentage": 67}),
        );

        let data = definition().load(&fetcher, &notices).await;
        assert!(data.records.is_degraded());
        assert_eq!(data.records.payload.len(), 3);
        assert!(data.summary[0].contains("15"));
        assert_eq!(notices.count(NoticeKind::Error), 1);
    }

    #[tokio::test]
    async fn test_invalid_form_is_never_sent() {
        let notices = NoticeLog::new();
        let writer = StubWriter::accepting(json!({}));
        let form = FacilityForm {
            code: "KFH001".to_string(),
            ..FacilityForm::default()
        };

        let result = create_facility(&writer, &StubFetcher::new(), &notices, &form).await;
        assert!(matches!(result, Err(ActionError::Form(FormError::Missing(_)))));
        assert!(writer.sent().is_empty());
        assert_eq!(notices.len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_reloads_after_success() {
        let notices = NoticeLog::new();
        let writer = StubWriter::accepting(json!({"id": "2", "isActive": false}));
        let fetcher = StubFetcher::new()
            .with_data(endpoints::FACILITIES, json!([{"id": "2", "name": "B", "isActive": false}]))
            .with_data(
                endpoints::FACILITY_STATS,
                json!({"active": 0, "inactive": 1, "total": 1, "activationPercentage": 0}),
            );

        let data = toggle_facility(&writer, &fetcher, &notices, "2").await.unwrap();
        assert_eq!(writer.sent()[0].0, WriteMethod::Toggle);
        assert_eq!(writer.sent()[0].1, "facilities/2/toggle-status");
        assert_eq!(data.records.payload.len(), 1);
        assert_eq!(notices.count(NoticeKind::Success), 1);
        assert_eq!(fetcher.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_update_keeps_state_and_notices_once() {
        let notices = NoticeLog::new();
        let writer = StubWriter::rejecting("duplicate code");
        let fetcher = StubFetcher::new();
        let form = FacilityForm::from_record(&sample_facilities()[0]);

        let result = update_facility(&writer, &fetcher, &notices, "1", &form).await;
        assert!(matches!(result, Err(ActionError::Write(_))));
        assert!(fetcher.calls.lock().unwrap().is_empty());
        assert_eq!(notices.len(), 1);
        assert_eq!(notices.last().unwrap().message, "خطأ في تحديث المنشأة: duplicate code");
    }
}
