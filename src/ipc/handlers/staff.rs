use crate::filter::{
    apply_filters, percentage_of_total, search, summarize, AggregationSpec, FilterSet, Reduction,
};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{round2, scoped_list_query, today, valid_date};
use crate::ipc::types::{AppState, Request};
use crate::model::{StaffMember, STAFF_SEARCH_FIELDS};
use serde_json::json;
use uuid::Uuid;

fn handle_staff_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };
    let lq = match scoped_list_query(req) {
        Ok(v) => v,
        Err(e) => return err(&req.id, &e.code, e.message, e.details),
    };

    let mut scope = FilterSet::new();
    if let Some(inst) = lq.filters.get("instituteId") {
        scope.insert("instituteId".to_string(), inst.clone());
    }
    let base = apply_filters(ws.staff.list(), &scope);

    let needle = lq.query.as_deref().unwrap_or("");
    let rows = apply_filters(
        search(base.iter().copied(), needle, STAFF_SEARCH_FIELDS),
        &lq.filters,
    );

    let any = |_: &StaffMember| true;
    let active = |s: &StaffMember| s.status == "Active";
    let teaching = |s: &StaffMember| s.role == "Teacher";
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
            name: "teachers",
            reduction: Reduction::CountWhere(&teaching),
        },
    ];
    let mut summary = summarize(base.iter().copied(), &specs);
    let active_count = base.iter().filter(|s| s.status == "Active").count();
    summary.0.insert(
        "activeRate".to_string(),
        round2(percentage_of_total(active_count as f64, base.len() as f64)),
    );

    ok(
        &req.id,
        json!({
            "staff": rows,
            "matching": rows.len(),
            "summary": summary
        }),
    )
}

fn handle_staff_create(state: &mut AppState, req: &Request) -> serde_json::Value {
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
    let role = match req.params.get("role").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing role", None),
    };
    if name.is_empty() || role.is_empty() {
        return err(&req.id, "bad_params", "name/role must not be empty", None);
    }

    let joined_on = match req.params.get("joinedOn").and_then(|v| v.as_str()) {
        Some(s) => {
            let t = s.trim().to_string();
            if !valid_date(&t) {
                return err(
                    &req.id,
                    "bad_params",
                    "joinedOn must be a YYYY-MM-DD date",
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

    let staff_id = Uuid::new_v4().to_string();
    ws.staff.add(StaffMember {
        id: staff_id.clone(),
        institute_id,
        name,
        role,
        department: opt_string("department").unwrap_or_else(|| "General".to_string()),
        status: opt_string("status").unwrap_or_else(|| "Active".to_string()),
        phone: opt_string("phone"),
        email: opt_string("email"),
        joined_on,
    });

    ok(&req.id, json!({ "staffId": staff_id }))
}

fn handle_staff_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };

    let institute_id = match req.params.get("instituteId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing instituteId", None),
    };
    let staff_id = match req.params.get("staffId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing staffId", None),
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing/invalid patch", None);
    };

    match ws.staff.get(&staff_id) {
        Some(s) if s.institute_id == institute_id => {}
        _ => return err(&req.id, "not_found", "staff member not found", None),
    }

    let mut set_name: Option<String> = None;
    let mut set_role: Option<String> = None;
    let mut set_department: Option<String> = None;
    let mut set_status: Option<String> = None;
    let mut set_phone: Option<Option<String>> = None;
    let mut set_email: Option<Option<String>> = None;

    for (key, slot) in [
        ("name", &mut set_name),
        ("role", &mut set_role),
        ("department", &mut set_department),
        ("status", &mut set_status),
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
            if t.is_empty() {
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

    for (key, slot) in [("phone", &mut set_phone), ("email", &mut set_email)] {
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

    ws.staff.update(&staff_id, |s| {
        if let Some(v) = set_name {
            s.name = v;
        }
        if let Some(v) = set_role {
            s.role = v;
        }
        if let Some(v) = set_department {
            s.department = v;
        }
        if let Some(v) = set_status {
            s.status = v;
        }
        if let Some(v) = set_phone {
            s.phone = v;
        }
        if let Some(v) = set_email {
            s.email = v;
        }
    });

    ok(&req.id, json!({ "staffId": staff_id }))
}

fn handle_staff_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };

    let institute_id = match req.params.get("instituteId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing instituteId", None),
    };
    let staff_id = match req.params.get("staffId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing staffId", None),
    };

    match ws.staff.get(&staff_id) {
        Some(s) if s.institute_id == institute_id => {}
        _ => return err(&req.id, "not_found", "staff member not found", None),
    }

    ws.staff.remove(&staff_id);
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "staff.list" => Some(handle_staff_list(state, req)),
        "staff.create" => Some(handle_staff_create(state, req)),
        "staff.update" => Some(handle_staff_update(state, req)),
        "staff.delete" => Some(handle_staff_delete(state, req)),
        _ => None,
    }
}
