//! Endpoint paths, relative to the configured API base URL

pub const CONTRACT_REPORTS: &str = "dental-contracts/reports";
pub const CONTRACT_DASHBOARD: &str = "dental-contracts/dashboard";
pub const TOP_SUPPLIERS: &str = "dental-contracts/top-suppliers";
pub const TOP_CLINICS: &str = "dental-contracts/top-clinics";

pub const DIRECT_PURCHASE_ORDERS: &str = "direct-purchase/orders";

/// Facility names for dropdowns
pub const REPORT_FACILITIES: &str = "reports/facilities";

pub const FACILITIES: &str = "facilities";
pub const FACILITY_STATS: &str = "facilities/stats";

pub const TRANSACTIONS: &str = "transactions";
pub const TRANSACTION_TYPES: &str = "transactions/types";
pub const TRANSACTION_STATUSES: &str = "transactions/statuses";

/// Percent-encode `id` as a single path segment, so `/` or `?` in an id
/// stay part of it
fn segment(id: &str) -> String {
    let Ok(mut url) = reqwest::Url::parse("http://api.invalid/") else {
        return id.to_string();
    };
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().push(id);
    }
    url.path().trim_start_matches('/').to_string()
}

pub fn facility(id: &str) -> String {
    format!("{}/{}", FACILITIES, segment(id))
}

pub fn facility_toggle(id: &str) -> String {
    format!("{}/{}/toggle-status", FACILITIES, segment(id))
}

pub fn transaction(id: &str) -> String {
    format!("{}/{}", TRANSACTIONS, segment(id))
}

pub fn transaction_history(id: &str) -> String {
    format!("{}/{}/history", TRANSACTIONS, segment(id))
}
