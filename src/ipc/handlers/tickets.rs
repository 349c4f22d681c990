use crate::filter::{apply_filters, count_where, percentage_of_total, search, FilterSet};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{now_stamp, round2, scoped_list_query, today};
use crate::ipc::types::{AppState, Request};
use crate::model::{Ticket, TICKET_SEARCH_FIELDS};
use crate::store::Workspace;
use serde_json::json;
use uuid::Uuid;

const TICKET_STATUSES: &[&str] = &["Open", "In Progress", "Resolved", "Closed"];
const TICKET_PRIORITIES: &[&str] = &["Low", "Medium", "High"];

fn ticket_summary(ws: &Workspace, institute_id: Option<&str>) -> serde_json::Value {
    let mut scope = FilterSet::new();
    if let Some(inst) = institute_id {
        scope.insert("instituteId".to_string(), inst.to_string());
    }
    let base = apply_filters(ws.tickets.list(), &scope);

    let open = count_where(&base, |t| t.status == "Open");
    let in_progress = count_where(&base, |t| t.status == "In Progress");
    let resolved = count_where(&base, |t| t.status == "Resolved");
    let closed = count_where(&base, |t| t.status == "Closed");
    let high_priority = count_where(&base, |t| t.priority == "High" && t.status != "Closed");
    let resolution_rate = round2(percentage_of_total(
        (resolved + closed) as f64,
        base.len() as f64,
    ));

    json!({
        "total": base.len(),
        "open": open,
        "inProgress": in_progress,
        "resolved": resolved,
        "closed": closed,
        "highPriority": high_priority,
        "resolutionRate": resolution_rate,
    })
}

fn handle_tickets_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };
    let lq = match scoped_list_query(req) {
        Ok(v) => v,
        Err(e) => return err(&req.id, &e.code, e.message, e.details),
    };

    let needle = lq.query.as_deref().unwrap_or("");
    let rows = apply_filters(
        search(ws.tickets.list(), needle, TICKET_SEARCH_FIELDS),
        &lq.filters,
    );
    let summary = ticket_summary(ws, lq.filters.get("instituteId").map(String::as_str));

    ok(
        &req.id,
        json!({
            "tickets": rows,
            "matching": rows.len(),
            "summary": summary
        }),
    )
}

fn handle_tickets_create(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    let subject = match req.params.get("subject").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing subject", None),
    };
    if subject.is_empty() {
        return err(&req.id, "bad_params", "subject must not be empty", None);
    }

    let opt_string = |key: &str| {
        req.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .and_then(|s| if s.is_empty() { None } else { Some(s) })
    };

    let priority = opt_string("priority").unwrap_or_else(|| "Medium".to_string());
    if !TICKET_PRIORITIES.contains(&priority.as_str()) {
        return err(
            &req.id,
            "bad_params",
            format!("priority must be one of {:?}", TICKET_PRIORITIES),
            None,
        );
    }

    let ticket_id = Uuid::new_v4().to_string();
    ws.tickets.add(Ticket {
        id: ticket_id.clone(),
        institute_id,
        subject,
        description: opt_string("description"),
        status: "Open".to_string(),
        priority,
        category: opt_string("category").unwrap_or_else(|| "General".to_string()),
        raised_by: opt_string("raisedBy").unwrap_or_default(),
        opened_on: today(),
        updated_at: None,
    });

    ok(&req.id, json!({ "ticketId": ticket_id }))
}

fn handle_tickets_update_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };

    let institute_id = match req.params.get("instituteId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing instituteId", None),
    };
    let ticket_id = match req.params.get("ticketId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing ticketId", None),
    };
    let status = match req.params.get("status").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing status", None),
    };
    if !TICKET_STATUSES.contains(&status.as_str()) {
        return err(
            &req.id,
            "bad_params",
            format!("status must be one of {:?}", TICKET_STATUSES),
            None,
        );
    }

    match ws.tickets.get(&ticket_id) {
        Some(t) if t.institute_id == institute_id => {}
        _ => return err(&req.id, "not_found", "ticket not found", None),
    }

    let stamp = now_stamp();
    ws.tickets.update(&ticket_id, |t| {
        t.status = status.clone();
        t.updated_at = Some(stamp);
    });

    ok(&req.id, json!({ "ticketId": ticket_id, "status": status }))
}

fn handle_tickets_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };

    let institute_id = match req.params.get("instituteId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing instituteId", None),
    };
    let ticket_id = match req.params.get("ticketId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing ticketId", None),
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing/invalid patch", None);
    };

    match ws.tickets.get(&ticket_id) {
        Some(t) if t.institute_id == institute_id => {}
        _ => return err(&req.id, "not_found", "ticket not found", None),
    }

    let mut set_subject: Option<String> = None;
    let mut set_priority: Option<String> = None;
    let mut set_category: Option<String> = None;
    let mut set_description: Option<Option<String>> = None;

    if let Some(v) = patch.get("subject") {
        let Some(s) = v.as_str() else {
            return err(&req.id, "bad_params", "patch.subject must be a string", None);
        };
        let t = s.trim().to_string();
        if t.is_empty() {
            return err(&req.id, "bad_params", "subject must not be empty", None);
        }
        set_subject = Some(t);
    }
    if let Some(v) = patch.get("priority") {
        let Some(s) = v.as_str() else {
            return err(&req.id, "bad_params", "patch.priority must be a string", None);
        };
        let t = s.trim().to_string();
        if !TICKET_PRIORITIES.contains(&t.as_str()) {
            return err(
                &req.id,
                "bad_params",
                format!("priority must be one of {:?}", TICKET_PRIORITIES),
                None,
            );
        }
        set_priority = Some(t);
    }
    if let Some(v) = patch.get("category") {
        let Some(s) = v.as_str() else {
            return err(&req.id, "bad_params", "patch.category must be a string", None);
        };
        let t = s.trim().to_string();
        if t.is_empty() {
            return err(&req.id, "bad_params", "category must not be empty", None);
        }
        set_category = Some(t);
    }
    if let Some(v) = patch.get("description") {
        if v.is_null() {
            set_description = Some(None);
        } else if let Some(s) = v.as_str() {
            let t = s.trim().to_string();
            set_description = Some(if t.is_empty() { None } else { Some(t) });
        } else {
            return err(
                &req.id,
                "bad_params",
                "patch.description must be a string or null",
                None,
            );
        }
    }

    let stamp = now_stamp();
    ws.tickets.update(&ticket_id, |t| {
        if let Some(v) = set_subject {
            t.subject = v;
        }
        if let Some(v) = set_priority {
            t.priority = v;
        }
        if let Some(v) = set_category {
            t.category = v;
        }
        if let Some(v) = set_description {
            t.description = v;
        }
        t.updated_at = Some(stamp);
    });

    ok(&req.id, json!({ "ticketId": ticket_id }))
}

fn handle_tickets_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };
    let institute_id = req
        .params
        .get("instituteId")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("ALL"));

    ok(&req.id, ticket_summary(ws, institute_id))
}

fn handle_tickets_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };

    let institute_id = match req.params.get("instituteId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing instituteId", None),
    };
    let ticket_id = match req.params.get("ticketId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing ticketId", None),
    };

    match ws.tickets.get(&ticket_id) {
        Some(t) if t.institute_id == institute_id => {}
        _ => return err(&req.id, "not_found", "ticket not found", None),
    }

    ws.tickets.remove(&ticket_id);
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "tickets.list" => Some(handle_tickets_list(state, req)),
        "tickets.create" => Some(handle_tickets_create(state, req)),
        "tickets.updateStatus" => Some(handle_tickets_update_status(state, req)),
        "tickets.update" => Some(handle_tickets_update(state, req)),
        "tickets.summary" => Some(handle_tickets_summary(state, req)),
        "tickets.delete" => Some(handle_tickets_delete(state, req)),
        _ => None,
    }
}
