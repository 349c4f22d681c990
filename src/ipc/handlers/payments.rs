use crate::currency::parse_currency;
use crate::filter::{apply_filters, count_where, percentage_of_total, search, sum_by, FilterSet};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{round2, scoped_list_query, today, valid_date};
use crate::ipc::types::{AppState, Request};
use crate::model::{Payment, PAYMENT_SEARCH_FIELDS};
use crate::store::Workspace;
use serde_json::json;
use uuid::Uuid;

fn payment_summary(ws: &Workspace, institute_id: Option<&str>) -> serde_json::Value {
    let mut scope = FilterSet::new();
    if let Some(inst) = institute_id {
        scope.insert("instituteId".to_string(), inst.to_string());
    }
    let base = apply_filters(ws.payments.list(), &scope);

    let paid_count = count_where(&base, |p| p.status == "Paid");
    let pending_count = count_where(&base, |p| p.status == "Pending");
    let total_collected = sum_by(&base, |p| if p.status == "Paid" { p.amount } else { 0.0 });
    let total_pending = sum_by(&base, |p| if p.status == "Pending" { p.amount } else { 0.0 });
    let paid_rate = round2(percentage_of_total(paid_count as f64, base.len() as f64));

    json!({
        "total": base.len(),
        "paidCount": paid_count,
        "pendingCount": pending_count,
        "totalCollected": total_collected,
        "totalPending": total_pending,
        "paidRate": paid_rate,
    })
}

fn handle_payments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };
    let lq = match scoped_list_query(req) {
        Ok(v) => v,
        Err(e) => return err(&req.id, &e.code, e.message, e.details),
    };

    let needle = lq.query.as_deref().unwrap_or("");
    let rows = apply_filters(
        search(ws.payments.list(), needle, PAYMENT_SEARCH_FIELDS),
        &lq.filters,
    );
    let summary = payment_summary(ws, lq.filters.get("instituteId").map(String::as_str));

    ok(
        &req.id,
        json!({
            "payments": rows,
            "matching": rows.len(),
            "summary": summary
        }),
    )
}

fn handle_payments_record(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };

    let institute_id = match req.params.get("instituteId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing instituteId", None),
    };
    let student_id = match req.params.get("studentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing studentId", None),
    };

    let student_name = match ws.students.get(&student_id) {
        Some(s) if s.institute_id == institute_id => s.name.clone(),
        _ => return err(&req.id, "not_found", "student not found", None),
    };

    // The console sends amounts both as numbers and as display strings
    // ("₹15,000"); the string form is normalized here, at the boundary.
    let amount = match req.params.get("amount") {
        Some(v) if v.is_f64() || v.is_i64() || v.is_u64() => v.as_f64().unwrap_or(0.0),
        Some(v) if v.is_string() => parse_currency(v.as_str().unwrap_or("")),
        _ => return err(&req.id, "bad_params", "missing amount", None),
    };
    if amount < 0.0 {
        return err(&req.id, "bad_params", "amount must not be negative", None);
    }

    let paid_on = match req.params.get("paidOn").and_then(|v| v.as_str()) {
        Some(s) => {
            let t = s.trim().to_string();
            if !valid_date(&t) {
                return err(
                    &req.id,
                    "bad_params",
                    "paidOn must be a YYYY-MM-DD date",
                    None,
                );
            }
            t
        }
        None => today(),
    };

    let opt_string = |key: &str| {
        req.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .and_then(|s| if s.is_empty() { None } else { Some(s) })
    };

    let payment_id = Uuid::new_v4().to_string();
    let receipt_no = opt_string("receiptNo")
        .unwrap_or_else(|| format!("RCP-{}", &payment_id[..8].to_uppercase()));

    ws.payments.add(Payment {
        id: payment_id.clone(),
        institute_id,
        student_id,
        student_name,
        receipt_no: receipt_no.clone(),
        amount,
        method: opt_string("method").unwrap_or_else(|| "Cash".to_string()),
        status: opt_string("status").unwrap_or_else(|| "Paid".to_string()),
        paid_on,
    });

    ok(
        &req.id,
        json!({ "paymentId": payment_id, "receiptNo": receipt_no, "amount": amount }),
    )
}

fn handle_payments_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };
    let institute_id = req
        .params
        .get("instituteId")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("ALL"));

    ok(&req.id, payment_summary(ws, institute_id))
}

fn handle_payments_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };

    let institute_id = match req.params.get("instituteId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing instituteId", None),
    };
    let payment_id = match req.params.get("paymentId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing paymentId", None),
    };

    match ws.payments.get(&payment_id) {
        Some(p) if p.institute_id == institute_id => {}
        _ => return err(&req.id, "not_found", "payment not found", None),
    }

    ws.payments.remove(&payment_id);
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "payments.list" => Some(handle_payments_list(state, req)),
        "payments.record" => Some(handle_payments_record(state, req)),
        "payments.summary" => Some(handle_payments_summary(state, req)),
        "payments.delete" => Some(handle_payments_delete(state, req)),
        _ => None,
    }
}
