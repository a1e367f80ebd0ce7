//! Direct purchase order tracking

use crate::api::endpoints;
use crate::export::ColumnMap;
use crate::filter::{FilterControl, FilterSet, FilterSpec};
use crate::models::{FieldDef, Record};
use crate::notify::Notifier;
use crate::screens::{contracts, facilities, facility_names, ScreenData, ScreenDef, ScreenKind};
use crate::source::{DataSource, OnFailure, RecordFetcher};

const ORDERS_NOTICE: &str = "فشل في جلب طلبات الشراء";
const FACILITIES_NOTICE: &str = "تعذر تحميل قائمة المنشآت، سيتم عرض البيانات التجريبية";

/// Display-only field holding the formatted cost
pub const COST_FIELD: &str = "cost_display";

pub fn columns() -> ColumnMap {
    ColumnMap::new(vec![
        FieldDef::new("order_number", "رقم الطلب"),
        FieldDef::new("order_date", "تاريخ الطلب"),
        FieldDef::new("item_name", "اسم الصنف"),
        FieldDef::new("beneficiary_facility", "الجهة المستفيدة"),
        FieldDef::new("quantity", "الكمية"),
        FieldDef::new("status", "الحالة"),
        FieldDef::with_default(COST_FIELD, "التكلفة", "-"),
    ])
}

pub fn filters() -> FilterSet {
    FilterSet::new(vec![
        FilterControl::new(
            "search",
            "بحث",
            FilterSpec::contains("item_name", "")
                .or_field("order_number")
                .or_field("supplier_name"),
        ),
        FilterControl::new("status", "الحالة", FilterSpec::equals("status", ""))
            .with_options(contracts::STATUSES.iter().map(|s| s.to_string()).collect()),
        FilterControl::new(
            "facility",
            "الجهة المستفيدة",
            FilterSpec::equals("beneficiary_facility", ""),
        ),
    ])
}

pub fn definition() -> ScreenDef {
    ScreenDef {
        kind: ScreenKind::TrackOrders,
        columns: columns(),
        filters: filters(),
        primary: DataSource::new(endpoints::DIRECT_PURCHASE_ORDERS, OnFailure::KeepEmpty, ORDERS_NOTICE),
        export: None,
    }
}

pub fn facilities_source() -> DataSource<Vec<Record>> {
    DataSource::new(
        endpoints::REPORT_FACILITIES,
        OnFailure::UseFallback(facilities::sample_facilities()),
        FACILITIES_NOTICE,
    )
}

/// "85000 ريال", or nothing when the order has no cost yet
pub fn display_cost(order: &Record) -> Option<String> {
    match order.get("total_cost") {
        Some(value) if !value.is_null() && value.as_number() != Some(0.0) && !value.to_string().is_empty() => {
            Some(format!("{} ريال", value))
        }
        _ => None,
    }
}

/// Fill the display-only fields the table shows
pub fn decorate(mut orders: Vec<Record>) -> Vec<Record> {
    for order in &mut orders {
        if order.text("order_number").is_empty() {
            let id = order.id();
            order.set("order_number", id);
        }
        let cost = display_cost(order);
        order.set(COST_FIELD, cost);
    }
    orders
}

pub async fn load(def: &ScreenDef, fetcher: &dyn RecordFetcher, notifier: &dyn Notifier) -> ScreenData {
    let facilities = facilities_source();
    let (mut records, facilities) = futures::join!(
        def.primary.load(fetcher, notifier),
        facilities.load(fetcher, notifier)
    );

    records.payload = decorate(records.payload);
    let summary = vec![format!("عدد الطلبات: {}", records.payload.len())];

    ScreenData {
        records,
        options: vec![("facility", facility_names(&facilities.payload))],
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{NoticeKind, NoticeLog};
    use crate::source::testing::StubFetcher;
    use serde_json::json;

    fn orders() -> Vec<Record> {
        vec![
            Record::new()
                .with("id", "1")
                .with("order_number", "PO-100")
                .with("item_name", "قفازات طبية")
                .with("supplier_name", "Acme")
                .with("status", "جديد")
                .with("beneficiary_facility", "مستشفى الملك فهد")
                .with("total_cost", 1200i64),
            Record::new()
                .with("id", "2")
                .with("item_name", "Syringes")
                .with("supplier_name", "Beta Supplies")
                .with("status", "مرفوض")
                .with("beneficiary_facility", "مستوصف النور"),
        ]
    }

    #[test]
    fn test_decorate_fills_number_and_cost() {
        let orders = decorate(orders());
        assert_eq!(orders[0].text(COST_FIELD), "1200 ريال");
        assert_eq!(orders[1].text("order_number"), "2");

        let rows = columns().rows(&orders);
        assert_eq!(rows[1][6], "-");
    }

    #[test]
    fn test_search_covers_item_number_and_supplier() {
        let mut view = definition().new_view();
        view.set_source(decorate(orders()));

        view.set_filter("search", "po-1");
        assert_eq!(view.visible().len(), 1);

        view.set_filter("search", "beta");
        assert_eq!(view.visible()[0].id(), "2");

        view.set_filter("search", "");
        view.set_filter("facility", "مستشفى الملك فهد");
        view.set_filter("status", "مرفوض");
        assert!(view.visible().is_empty());
        assert_eq!(view.empty_message(), Some("لا توجد نتائج تطابق معايير البحث"));
    }

    #[tokio::test]
    async fn test_failed_orders_stay_empty_with_fallback_facilities() {
        let notices = NoticeLog::new();
        let data = definition().load(&StubFetcher::new(), &notices).await;

        assert!(data.records.is_degraded());
        assert!(data.records.payload.is_empty());
        assert_eq!(data.options[0].1.len(), 3);
        assert_eq!(notices.count(NoticeKind::Error), 2);
    }

    #[tokio::test]
    async fn test_empty_live_orders_are_not_degraded() {
        let notices = NoticeLog::new();
        let fetcher = StubFetcher::new()
            .with_data(endpoints::DIRECT_PURCHASE_ORDERS, json!([]))
            .with_data(endpoints::REPORT_FACILITIES, json!([{"id": 9, "name": "مركز الشفاء"}]));

        let data = definition().load(&fetcher, &notices).await;
        assert!(!data.records.is_degraded());
        assert!(notices.is_empty());
        assert_eq!(data.options[0].1, vec!["مركز الشفاء".to_string()]);
    }
}
