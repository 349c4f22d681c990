use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

/// Free-form JSON settings sections ("billing", "notifications", ...) owned
/// by the console; the daemon only stores and returns them.

fn handle_settings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_ref() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };

    let section = match req.params.get("section").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing section", None),
    };
    if section.is_empty() {
        return err(&req.id, "bad_params", "section must not be empty", None);
    }

    let value = ws
        .settings
        .get(&section)
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    ok(&req.id, json!({ "section": section, "value": value }))
}

fn handle_settings_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(ws) = state.workspace.as_mut() else {
        return err(&req.id, "no_workspace", "open a workspace first", None);
    };

    let section = match req.params.get("section").and_then(|v| v.as_str()) {
        Some(v) => v.trim().to_string(),
        None => return err(&req.id, "bad_params", "missing section", None),
    };
    if section.is_empty() {
        return err(&req.id, "bad_params", "section must not be empty", None);
    }
    let Some(value) = req.params.get("value") else {
        return err(&req.id, "bad_params", "missing value", None);
    };

    ws.settings.insert(section.clone(), value.clone());
    ok(&req.id, json!({ "section": section }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(handle_settings_get(state, req)),
        "settings.set" => Some(handle_settings_set(state, req)),
        _ => None,
    }
}
