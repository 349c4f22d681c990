use crate::filter::{
    apply_filters, percentage_of_total, search, sum_by, summarize, AggregationSpec, FilterSet,
    Reduction,
};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{round2, scoped_list_query, today, valid_date};
use crate::ipc::types::{AppState, Request};
use crate::model::{Student, STUDENT_SEARCH_FIELDS};
use serde_json::json;
use uuid::Uuid;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };
    let lq = match scoped_list_query(req) {
        Ok(v) => v,
        Err(e) => return err(&req.id, &e.code, e.message, e.details),
    };

    // Metric cards aggregate over the tenant's whole collection; the search
    // box and dropdown filters only narrow the visible rows.
    let mut scope = FilterSet::new();
    if let Some(inst) = lq.filters.get("instituteId") {
        scope.insert("instituteId".to_string(), inst.clone());
    }
    let base = apply_filters(ws.students.list(), &scope);

    let needle = lq.query.as_deref().unwrap_or("");
    let rows = apply_filters(
        search(base.iter().copied(), needle, STUDENT_SEARCH_FIELDS),
        &lq.filters,
    );

    let any = |_: &Student| true;
    let active = |s: &Student| s.status == "Active";
    let inactive = |s: &Student| s.status != "Active";
    let fee_total_of = |s: &Student| s.fee_total;
    let fee_paid_of = |s: &Student| s.fee_paid;
    let specs = [
        AggregationSpec {
            name: "total",
            reduction: Reduction::CountWhere(&any),
        },
        AggregationSpec {
            name: "active",
            reduction: Reduction::CountWhere(&active),
        },
        AggregationSpec {
            name: "inactive",
            reduction: Reduction::CountWhere(&inactive),
        },
        AggregationSpec {
            name: "feeBilled",
            reduction: Reduction::Sum(&fee_total_of),
        },
        AggregationSpec {
            name: "feeCollected",
            reduction: Reduction::Sum(&fee_paid_of),
        },
    ];
    let mut summary = summarize(base.iter().copied(), &specs);

    let billed = sum_by(&base, |s| s.fee_total);
    let collected = sum_by(&base, |s| s.fee_paid);
    summary.0.insert(
        "feeCollectionRate".to_string(),
        round2(percentage_of_total(collected, billed)),
    );

    ok(
        &req.id,
        json!({
            "students": rows,
            "matching": rows.len(),
            "summary": summary
        }),
    )
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };

    let institute_id = match req.params.get("instituteId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing instituteId", None),
    };
    if !ws.institutes.contains(&institute_id) {
        return err(&req.id, "not_found", "institute not found", None);
    }

    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing name", None),
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }
    let class_name = match req.params.get("className").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing className", None),
    };
    if class_name.is_empty() {
        return err(&req.id, "bad_params", "className must not be empty", None);
    }

    let admitted_on = match req.params.get("admittedOn").and_then(|v| v.as_str()) {
        Some(s) => {
            let t = s.trim().to_string();
            if !valid_date(&t) {
                return err(
                    &req.id,
                    "bad_params",
                    "admittedOn must be a YYYY-MM-DD date",
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

    let student_id = Uuid::new_v4().to_string();
    let student_no =
        opt_string("studentNo").unwrap_or_else(|| format!("STU-{}", &student_id[..8]));
    let section = opt_string("section").unwrap_or_default();
    let status = opt_string("status").unwrap_or_else(|| "Active".to_string());
    let fee_total = req
        .params
        .get("feeTotal")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);
    let fee_paid = req
        .params
        .get("feePaid")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0);

    ws.students.add(Student {
        id: student_id.clone(),
        institute_id,
        name,
        student_no,
        class_name,
        section,
        status,
        guardian_name: opt_string("guardianName"),
        phone: opt_string("phone"),
        email: opt_string("email"),
        admitted_on,
        fee_total,
        fee_paid,
    });

    ok(&req.id, json!({ "studentId": student_id }))
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing/invalid patch", None);
    };

    match ws.students.get(&student_id) {
        Some(s) if s.institute_id == institute_id => {}
        _ => return err(&req.id, "not_found", "student not found", None),
    }

    let mut set_name: Option<String> = None;
    let mut set_class: Option<String> = None;
    let mut set_section: Option<String> = None;
    let mut set_status: Option<String> = None;
    let mut set_guardian: Option<Option<String>> = None;
    let mut set_phone: Option<Option<String>> = None;
    let mut set_email: Option<Option<String>> = None;
    let mut set_fee_total: Option<f64> = None;
    let mut set_fee_paid: Option<f64> = None;

    for (key, required_nonempty, slot) in [
        ("name", true, &mut set_name),
        ("className", true, &mut set_class),
        ("section", false, &mut set_section),
        ("status", true, &mut set_status),
    ] {
        if let Some(v) = patch.get(key) {
            let Some(s) = v.as_str() else {
                return err(
                    &req.id,
                    "bad_params",
                    format!("patch.{} must be a string", key),
                    None,
                );
            };
            let t = s.trim().to_string();
            if required_nonempty && t.is_empty() {
                return err(
                    &req.id,
                    "bad_params",
                    format!("{} must not be empty", key),
                    None,
                );
            }
            *slot = Some(t);
        }
    }

    for (key, slot) in [
        ("guardianName", &mut set_guardian),
        ("phone", &mut set_phone),
        ("email", &mut set_email),
    ] {
        if let Some(v) = patch.get(key) {
            if v.is_null() {
                *slot = Some(None);
            } else if let Some(s) = v.as_str() {
                let t = s.trim().to_string();
                *slot = Some(if t.is_empty() { None } else { Some(t) });
            } else {
                return err(
                    &req.id,
                    "bad_params",
                    format!("patch.{} must be a string or null", key),
                    None,
                );
            }
        }
    }

    for (key, slot) in [("feeTotal", &mut set_fee_total), ("feePaid", &mut set_fee_paid)] {
        if let Some(v) = patch.get(key) {
            let Some(n) = v.as_f64() else {
                return err(
                    &req.id,
                    "bad_params",
                    format!("patch.{} must be a number", key),
                    None,
                );
            };
            if n < 0.0 {
                return err(
                    &req.id,
                    "bad_params",
                    format!("patch.{} must not be negative", key),
                    None,
                );
            }
            *slot = Some(n);
        }
    }

    ws.students.update(&student_id, |s| {
        if let Some(v) = set_name {
            s.name = v;
        }
        if let Some(v) = set_class {
            s.class_name = v;
        }
        if let Some(v) = set_section {
            s.section = v;
        }
        if let Some(v) = set_status {
            s.status = v;
        }
        if let Some(v) = set_guardian {
            s.guardian_name = v;
        }
        if let Some(v) = set_phone {
            s.phone = v;
        }
        if let Some(v) = set_email {
            s.email = v;
        }
        if let Some(v) = set_fee_total {
            s.fee_total = v;
        }
        if let Some(v) = set_fee_paid {
            s.fee_paid = v;
        }
    });

    ok(&req.id, json!({ "studentId": student_id }))
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    match ws.students.get(&student_id) {
        Some(s) if s.institute_id == institute_id => {}
        _ => return err(&req.id, "not_found", "student not found", None),
    }

    // Payments reference the student; drop them with the row.
    ws.payments.retain(|p| p.student_id != student_id);
    ws.students.remove(&student_id);

    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
