//! Administrative transactions: list, export, print, delete and the new-transaction form

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::api::{endpoints, perform_write, RecordWriter, WriteError, WriteMethod, WriteNotices, WriteRequest};
use crate::export::ColumnMap;
use crate::filter::{FilterControl, FilterSet, FilterSpec};
use crate::models::{FieldDef, Record};
use crate::notify::Notifier;
use crate::screens::{
    check_form, facility_names, require, ActionError, ExportSpec, FormError, ScreenData, ScreenDef, ScreenKind,
};
use crate::source::{DataSource, Loaded, OnFailure, RecordFetcher};
use crate::view::ViewState;

pub const DEFAULT_STATUS: &str = "مفتوح تحت الاجراء";
pub const NO_NOTES: &str = "لا توجد ملاحظات";
pub const DELETE_PROMPT: &str = "هل أنت متأكد من حذف هذه المعاملة؟";
pub const NO_HISTORY: &str = "لا توجد تحويلات لهذه المعاملة حتى الآن";

const LOAD_NOTICE: &str = "تعذر تحميل المعاملات";
const FACILITIES_NOTICE: &str = "تعذر تحميل قائمة المنشآت";
const TYPES_NOTICE: &str = "تعذر تحميل أنواع المعاملات، سيتم عرض القائمة الافتراضية";
const STATUSES_NOTICE: &str = "تعذر تحميل حالات المعاملات، سيتم عرض القائمة الافتراضية";
const HISTORY_NOTICE: &str = "تعذر تحميل تاريخ التحويلات";

pub fn default_types() -> Vec<String> {
    ["طلب صيانة", "طلب توريد", "طلب خدمة", "شكوى", "استفسار", "طلب تطوير"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn default_statuses() -> Vec<String> {
    [DEFAULT_STATUS, "منجز", "مرفوض"].iter().map(|s| s.to_string()).collect()
}

pub fn columns() -> ColumnMap {
    ColumnMap::new(vec![
        FieldDef::new("transactionNumber", "رقم المعاملة"),
        FieldDef::new("receiveDate", "تاريخ الاستلام"),
        FieldDef::new("subject", "موضوع المعاملة"),
        FieldDef::new("type", "النوع"),
        FieldDef::new("senderEntity", "الجهة المرسلة"),
        FieldDef::new("transferredTo", "المحولة إلى"),
        FieldDef::new("status", "الحالة"),
        FieldDef::new("notes", "الملاحظات"),
    ])
}

fn document_columns() -> ColumnMap {
    ColumnMap::new(columns().columns()[..7].to_vec())
}

/// Labelled fields of a single printed transaction
pub fn print_columns() -> ColumnMap {
    ColumnMap::new(vec![
        FieldDef::new("transactionNumber", "رقم المعاملة"),
        FieldDef::new("receiveDate", "تاريخ الاستلام"),
        FieldDef::new("subject", "موضوع المعاملة"),
        FieldDef::new("type", "نوع المعاملة"),
        FieldDef::new("senderEntity", "الجهة المرسلة"),
        FieldDef::new("transferredTo", "الجهة المحول لها"),
        FieldDef::new("status", "الحالة"),
        FieldDef::with_default("notes", "الملاحظات", NO_NOTES),
    ])
}

pub fn print_title(transaction: &Record) -> String {
    format!("تقرير معاملة إدارية - {}", transaction.text("transactionNumber"))
}

pub fn filters() -> FilterSet {
    FilterSet::new(vec![
        FilterControl::new(
            "search",
            "بحث",
            FilterSpec::contains("subject", "")
                .or_field("transactionNumber")
                .or_field("senderEntity"),
        ),
        FilterControl::new("facility", "المحولة إلى", FilterSpec::equals("transferredTo", "")),
        FilterControl::new("type", "النوع", FilterSpec::equals("type", "")).with_options(default_types()),
        FilterControl::new("status", "الحالة", FilterSpec::equals("status", "")).with_options(default_statuses()),
    ])
}

pub fn definition() -> ScreenDef {
    ScreenDef {
        kind: ScreenKind::Transactions,
        columns: columns(),
        filters: filters(),
        primary: DataSource::new(endpoints::TRANSACTIONS, OnFailure::KeepEmpty, LOAD_NOTICE),
        export: Some(ExportSpec {
            title: "المعاملات_الإدارية",
            spreadsheet: columns(),
            document: document_columns(),
        }),
    }
}

pub fn facilities_source() -> DataSource<Vec<Record>> {
    DataSource::new(endpoints::REPORT_FACILITIES, OnFailure::KeepEmpty, FACILITIES_NOTICE)
}

pub fn types_source() -> DataSource<Vec<String>> {
    DataSource::new(
        endpoints::TRANSACTION_TYPES,
        OnFailure::UseFallback(default_types()),
        TYPES_NOTICE,
    )
}

pub fn statuses_source() -> DataSource<Vec<String>> {
    DataSource::new(
        endpoints::TRANSACTION_STATUSES,
        OnFailure::UseFallback(default_statuses()),
        STATUSES_NOTICE,
    )
}

pub fn history_source(transaction_id: &str) -> DataSource<Vec<Record>> {
    DataSource::new(
        &endpoints::transaction_history(transaction_id),
        OnFailure::KeepEmpty,
        HISTORY_NOTICE,
    )
}

pub async fn load(def: &ScreenDef, fetcher: &dyn RecordFetcher, notifier: &dyn Notifier) -> ScreenData {
    let facilities = facilities_source();
    let types = types_source();
    let statuses = statuses_source();

    let (records, facilities, types, statuses) = futures::join!(
        def.primary.load(fetcher, notifier),
        facilities.load(fetcher, notifier),
        types.load(fetcher, notifier),
        statuses.load(fetcher, notifier)
    );

    let summary = vec![format!("عدد المعاملات: {}", records.payload.len())];
    ScreenData {
        records,
        options: vec![
            ("facility", facility_names(&facilities.payload)),
            ("type", types.payload),
            ("status", statuses.payload),
        ],
        summary,
    }
}

/// Delete a confirmed transaction; the view drops it only once the server agrees
pub async fn delete_transaction(
    writer: &dyn RecordWriter,
    notifier: &dyn Notifier,
    view: &mut ViewState,
    id: &str,
) -> Result<(), WriteError> {
    let request = WriteRequest::new(WriteMethod::Delete, endpoints::transaction(id));
    let notices = WriteNotices::new("تم حذف المعاملة", "خطأ في الحذف");
    perform_write(writer, notifier, request, &notices).await?;
    view.remove_by_id(id);
    Ok(())
}

/// The new-transaction form
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionForm {
    pub transaction_number: String,
    pub receive_date: String,
    pub subject: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sender_entity: String,
    pub transferred_to: String,
    pub status: String,
    pub notes: String,
}

impl Default for TransactionForm {
    fn default() -> Self {
        Self {
            transaction_number: String::new(),
            receive_date: String::new(),
            subject: String::new(),
            kind: String::new(),
            sender_entity: String::new(),
            transferred_to: String::new(),
            status: DEFAULT_STATUS.to_string(),
            notes: String::new(),
        }
    }
}

impl TransactionForm {
    pub fn validate(&self) -> Result<(), FormError> {
        require(&self.transaction_number, "رقم المعاملة")?;
        require(&self.receive_date, "تاريخ الاستلام")?;
        NaiveDate::parse_from_str(self.receive_date.trim(), "%Y-%m-%d").map_err(|e| FormError::Invalid {
            field: "تاريخ الاستلام",
            reason: e.to_string(),
        })?;
        require(&self.subject, "موضوع المعاملة")?;
        require(&self.kind, "نوع المعاملة")?;
        require(&self.sender_entity, "الجهة المرسلة")?;
        require(&self.transferred_to, "الجهة المحول لها")?;
        Ok(())
    }

    fn to_body(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// A saved transaction and its transfer history
#[derive(Debug, Clone)]
pub struct CreatedTransaction {
    pub id: Option<String>,
    pub history: Loaded<Vec<Record>>,
}

impl CreatedTransaction {
    pub fn history_lines(&self) -> Vec<String> {
        if self.history.payload.is_empty() {
            return vec![NO_HISTORY.to_string()];
        }
        self.history.payload.iter().map(history_line).collect()
    }
}

pub fn history_line(entry: &Record) -> String {
    let mut line = format!(
        "التاريخ: {} | من: {} | إلى: {}",
        entry.text("date"),
        entry.text("from"),
        entry.text("to")
    );
    let notes = entry.text("notes");
    if !notes.is_empty() {
        line.push_str(&format!(" | ملاحظات: {}", notes));
    }
    line
}

/// Send the form, then fetch the transfer history of the saved transaction
pub async fn create_transaction(
    writer: &dyn RecordWriter,
    fetcher: &dyn RecordFetcher,
    notifier: &dyn Notifier,
    form: &TransactionForm,
) -> Result<CreatedTransaction, ActionError> {
    check_form(form.validate(), notifier)?;

    let request = WriteRequest::new(WriteMethod::Create, endpoints::TRANSACTIONS).with_body(form.to_body());
    let notices = WriteNotices::new("تم إنشاء المعاملة بنجاح", "خطأ في إنشاء المعاملة");
    let data = perform_write(writer, notifier, request, &notices).await?;

    let id = match data.get("id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    };

    let history = match &id {
        Some(id) => history_source(id).load(fetcher, notifier).await,
        None => Loaded {
            payload: Vec::new(),
            origin: crate::source::Origin::Live,
            error: None,
        },
    };

    Ok(CreatedTransaction { id, history })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::writes::testing::StubWriter;
    use crate::notify::{NoticeKind, NoticeLog};
    use crate::source::testing::StubFetcher;
    use serde_json::json;

    fn transactions() -> Vec<Record> {
        vec![
            Record::new()
                .with("id", "1")
                .with("transactionNumber", "TR-2024-001")
                .with("subject", "صيانة جهاز الأشعة")
                .with("type", "طلب صيانة")
                .with("senderEntity", "قسم الأشعة")
                .with("transferredTo", "مستشفى الملك فهد")
                .with("status", DEFAULT_STATUS),
            Record::new()
                .with("id", "2")
                .with("transactionNumber", "TR-2024-002")
                .with("subject", "توريد قفازات")
                .with("type", "طلب توريد")
                .with("senderEntity", "المستودع")
                .with("transferredTo", "مركز الأمير سلطان")
                .with("status", "منجز"),
            Record::new()
                .with("id", "3")
                .with("transactionNumber", "TR-2024-003")
                .with("subject", "شكوى تأخر توريد")
                .with("type", "شكوى")
                .with("senderEntity", "المستودع")
                .with("transferredTo", "مستشفى الملك فهد")
                .with("status", "منجز"),
        ]
    }

    fn valid_form() -> TransactionForm {
        TransactionForm {
            transaction_number: "TR-2024-010".to_string(),
            receive_date: "2024-03-01".to_string(),
            subject: "طلب صيانة مكيف".to_string(),
            kind: "طلب صيانة".to_string(),
            sender_entity: "قسم الصيانة".to_string(),
            transferred_to: "مستشفى الملك فهد".to_string(),
            ..TransactionForm::default()
        }
    }

    #[test]
    fn test_overlapping_filters_leave_one_record() {
        let mut view = definition().new_view();
        view.set_source(transactions());

        // 2 of 3 match the sender, 2 of 3 are done; one overlap
        view.set_filter("search", "المستودع");
        view.set_filter("status", "منجز");
        view.set_filter("facility", "مستشفى الملك فهد");
        assert_eq!(view.visible().len(), 1);
        assert_eq!(view.visible()[0].id(), "3");
    }

    #[test]
    fn test_empty_messages() {
        let mut view = definition().new_view();
        view.set_source(Vec::new());
        assert_eq!(view.empty_message(), Some("لا توجد بيانات في النظام"));

        view.set_source(transactions());
        view.set_filter("search", "غير موجود");
        assert_eq!(view.empty_message(), Some("لا توجد نتائج تطابق معايير البحث"));
    }

    #[test]
    fn test_print_defaults_notes() {
        let record = &transactions()[0];
        assert_eq!(print_title(record), "تقرير معاملة إدارية - TR-2024-001");
        assert_eq!(print_columns().row(record)[7], NO_NOTES);
        assert_eq!(definition().export.unwrap().document.len(), 7);
    }

    #[tokio::test]
    async fn test_side_lists_fall_back_to_fixed_options() {
        let notices = NoticeLog::new();
        let fetcher = StubFetcher::new().with_data(endpoints::TRANSACTIONS, json!([]));

        let data = definition().load(&fetcher, &notices).await;
        assert!(!data.records.is_degraded());
        assert_eq!(data.options[0].1.len(), 0);
        assert_eq!(data.options[1].1, default_types());
        assert_eq!(data.options[2].1, default_statuses());
        assert_eq!(notices.count(NoticeKind::Error), 3);
    }

    #[tokio::test]
    async fn test_delete_removes_only_after_success() {
        let notices = NoticeLog::new();
        let mut view = definition().new_view();
        view.set_source(transactions());

        let rejecting = StubWriter::rejecting("locked");
        assert!(delete_transaction(&rejecting, &notices, &mut view, "2").await.is_err());
        assert_eq!(view.source().len(), 3);

        let accepting = StubWriter::accepting(Value::Null);
        delete_transaction(&accepting, &notices, &mut view, "2").await.unwrap();
        assert_eq!(view.source().len(), 2);
        assert_eq!(accepting.sent()[0].1, "transactions/2");
        assert_eq!(notices.len(), 2);
    }

    #[test]
    fn test_form_validation() {
        assert_eq!(valid_form().validate(), Ok(()));

        let form = TransactionForm {
            receive_date: "01/03/2024".to_string(),
            ..valid_form()
        };
        assert!(matches!(form.validate(), Err(FormError::Invalid { .. })));

        let form = TransactionForm {
            subject: "  ".to_string(),
            ..valid_form()
        };
        assert_eq!(form.validate(), Err(FormError::Missing("موضوع المعاملة")));
    }

    #[tokio::test]
    async fn test_create_sends_default_status_and_loads_history() {
        let notices = NoticeLog::new();
        let writer = StubWriter::accepting(json!({"id": 42}));
        let fetcher = StubFetcher::new().with_data(
            "transactions/42/history",
            json!([{"date": "2024-03-02", "from": "قسم الصيانة", "to": "الإدارة"}]),
        );

        let created = create_transaction(&writer, &fetcher, &notices, &valid_form()).await.unwrap();
        assert_eq!(created.id.as_deref(), Some("42"));
        assert_eq!(created.history.payload.len(), 1);
        assert!(created.history_lines()[0].contains("الإدارة"));

        let body = writer.sent()[0].2.clone().unwrap();
        assert_eq!(body["status"], DEFAULT_STATUS);
        assert_eq!(body["type"], "طلب صيانة");
        assert_eq!(notices.count(NoticeKind::Success), 1);
    }
}
