use crate::filter::{apply_filters, search};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::scoped_list_query;
use crate::ipc::types::{AppState, Request};
use crate::model::{Branch, Institute, BRANCH_SEARCH_FIELDS, INSTITUTE_SEARCH_FIELDS};
use serde_json::json;
use uuid::Uuid;

fn handle_institutes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };
    let lq = match scoped_list_query(req) {
        Ok(v) => v,
        Err(e) => return err(&req.id, &e.code, e.message, e.details),
    };

    let needle = lq.query.as_deref().unwrap_or("");
    let rows = apply_filters(
        search(ws.institutes.list(), needle, INSTITUTE_SEARCH_FIELDS),
        &lq.filters,
    );

    // Include basic counts so the console can show a useful dashboard.
    let institutes: Vec<serde_json::Value> = rows
        .iter()
        .map(|inst| {
            let mut row = serde_json::to_value(inst).unwrap_or_else(|_| json!({}));
            let id = inst.id.as_str();
            row["studentCount"] = json!(ws
                .students
                .list()
                .iter()
                .filter(|s| s.institute_id == id)
                .count());
            row["staffCount"] = json!(ws
                .staff
                .list()
                .iter()
                .filter(|s| s.institute_id == id)
                .count());
            row["branchCount"] = json!(ws
                .branches
                .list()
                .iter()
                .filter(|b| b.institute_id == id)
                .count());
            row["openTickets"] = json!(ws
                .tickets
                .list()
                .iter()
                .filter(|t| t.institute_id == id && t.status == "Open")
                .count());
            row
        })
        .collect();

    ok(
        &req.id,
        json!({ "institutes": institutes, "matching": institutes.len() }),
    )
}

fn handle_institutes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };

    let name = match req.params.get("name").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing name", None),
    };
    if name.is_empty() {
        return err(&req.id, "bad_params", "name must not be empty", None);
    }

    let opt_string = |key: &str| {
        req.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .and_then(|s| if s.is_empty() { None } else { Some(s) })
    };

    let institute_id = Uuid::new_v4().to_string();
    let code = opt_string("code").unwrap_or_else(|| {
        // Default code: upper-cased initials of the name.
        name.split_whitespace()
            .filter_map(|w| w.chars().next())
            .collect::<String>()
            .to_uppercase()
    });

    ws.institutes.add(Institute {
        id: institute_id.clone(),
        name: name.clone(),
        code,
        city: opt_string("city").unwrap_or_default(),
        status: opt_string("status").unwrap_or_else(|| "Active".to_string()),
        plan: opt_string("plan").unwrap_or_else(|| "Basic".to_string()),
    });

    ok(&req.id, json!({ "instituteId": institute_id, "name": name }))
}

fn handle_institutes_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };

    let institute_id = match req.params.get("instituteId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing instituteId", None),
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing/invalid patch", None);
    };

    if !ws.institutes.contains(&institute_id) {
        return err(&req.id, "not_found", "institute not found", None);
    }

    let mut set_name: Option<String> = None;
    let mut set_code: Option<String> = None;
    let mut set_city: Option<String> = None;
    let mut set_status: Option<String> = None;
    let mut set_plan: Option<String> = None;

    for (key, required_nonempty, slot) in [
        ("name", true, &mut set_name),
        ("code", true, &mut set_code),
        ("city", false, &mut set_city),
        ("status", true, &mut set_status),
        ("plan", true, &mut set_plan),
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

    ws.institutes.update(&institute_id, |i| {
        if let Some(v) = set_name {
            i.name = v;
        }
        if let Some(v) = set_code {
            i.code = v;
        }
        if let Some(v) = set_city {
            i.city = v;
        }
        if let Some(v) = set_status {
            i.status = v;
        }
        if let Some(v) = set_plan {
            i.plan = v;
        }
    });

    ok(&req.id, json!({ "instituteId": institute_id }))
}

fn handle_institutes_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    // Explicitly delete dependents first so no record is left pointing at a
    // missing tenant. Keep this list updated as record types are added.
    ws.payments.retain(|p| p.institute_id != institute_id);
    ws.tickets.retain(|t| t.institute_id != institute_id);
    ws.staff.retain(|s| s.institute_id != institute_id);
    ws.students.retain(|s| s.institute_id != institute_id);
    ws.branches.retain(|b| b.institute_id != institute_id);
    ws.institutes.remove(&institute_id);

    ok(&req.id, json!({ "ok": true }))
}

fn handle_branches_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };
    let lq = match scoped_list_query(req) {
        Ok(v) => v,
        Err(e) => return err(&req.id, &e.code, e.message, e.details),
    };

    let needle = lq.query.as_deref().unwrap_or("");
    let rows = apply_filters(
        search(ws.branches.list(), needle, BRANCH_SEARCH_FIELDS),
        &lq.filters,
    );

    ok(
        &req.id,
        json!({ "branches": rows, "matching": rows.len() }),
    )
}

fn handle_branches_create(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    let opt_string = |key: &str| {
        req.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .and_then(|s| if s.is_empty() { None } else { Some(s) })
    };

    let branch_id = Uuid::new_v4().to_string();
    ws.branches.add(Branch {
        id: branch_id.clone(),
        institute_id,
        name,
        city: opt_string("city").unwrap_or_default(),
        phone: opt_string("phone"),
    });

    ok(&req.id, json!({ "branchId": branch_id }))
}

fn handle_branches_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };

    let institute_id = match req.params.get("instituteId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing instituteId", None),
    };
    let branch_id = match req.params.get("branchId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing branchId", None),
    };

    match ws.branches.get(&branch_id) {
        Some(b) if b.institute_id == institute_id => {}
        _ => return err(&req.id, "not_found", "branch not found", None),
    }

    ws.branches.remove(&branch_id);
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "institutes.list" => Some(handle_institutes_list(state, req)),
        "institutes.create" => Some(handle_institutes_create(state, req)),
        "institutes.update" => Some(handle_institutes_update(state, req)),
        "institutes.delete" => Some(handle_institutes_delete(state, req)),
        "branches.list" => Some(handle_branches_list(state, req)),
        "branches.create" => Some(handle_branches_create(state, req)),
        "branches.delete" => Some(handle_branches_delete(state, req)),
        _ => None,
    }
}
