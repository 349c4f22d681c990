use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::seed;
use crate::store::Workspace;
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspaceOpen": state.workspace.is_some()
        }),
    )
}

fn handle_workspace_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.workspace = Some(Workspace::new());
    ok(&req.id, json!({ "workspaceOpen": true }))
}

fn handle_workspace_seed_demo(state: &mut AppState, req: &Request) -> serde_json::Value {
    match seed::demo_workspace() {
        Ok(ws) => {
            let counts = json!({
                "institutes": ws.institutes.len(),
                "branches": ws.branches.len(),
                "students": ws.students.len(),
                "staff": ws.staff.len(),
                "payments": ws.payments.len(),
                "tickets": ws.tickets.len(),
            });
            state.workspace = Some(ws);
            ok(&req.id, json!({ "workspaceOpen": true, "counts": counts }))
        }
        Err(e) => err(&req.id, "seed_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.open" => Some(handle_workspace_open(state, req)),
        "workspace.seedDemo" => Some(handle_workspace_seed_demo(state, req)),
        _ => None,
    }
}
