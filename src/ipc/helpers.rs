use crate::filter::{parse_list_query, ListQuery, QueryError};
use crate::ipc::types::Request;

/// Parses query/filters params and folds an optional top-level `instituteId`
/// into the filter map, so every list method scopes tenants the same way.
pub fn scoped_list_query(req: &Request) -> Result<ListQuery, QueryError> {
    let mut lq = parse_list_query(&req.params)?;
    if let Some(inst) = req.params.get("instituteId").and_then(|v| v.as_str()) {
        let t = inst.trim();
        if !t.is_empty() && !t.eq_ignore_ascii_case("ALL") {
            lq.filters.insert("instituteId".to_string(), t.to_string());
        }
    }
    Ok(lq)
}

/// Rates are rounded to two decimals only when placed into a response
/// envelope; the engine itself returns raw arithmetic.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

pub fn now_stamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Validates a caller-supplied calendar date ("YYYY-MM-DD").
pub fn valid_date(s: &str) -> bool {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}
