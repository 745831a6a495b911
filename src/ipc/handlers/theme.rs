use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::theme::{self, Theme};
use serde_json::json;

fn stored_theme(state: &AppState) -> anyhow::Result<Option<Theme>> {
    let Some(conn) = state.db.as_ref() else {
        return Ok(None);
    };
    Ok(db::settings_get_json(conn, theme::SETTINGS_KEY)?
        .as_ref()
        .and_then(|v| v.as_str())
        .and_then(Theme::parse))
}

fn handle_theme_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let prefers_dark = match req.params.get("prefersDark") {
        None | Some(serde_json::Value::Null) => false,
        Some(v) => match v.as_bool() {
            Some(b) => b,
            None => return err(&req.id, "bad_params", "prefersDark must be a boolean", None),
        },
    };
    let stored = match stored_theme(state) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    ok(
        &req.id,
        json!({
            "theme": theme::resolve_theme(stored, prefers_dark).as_str(),
            "stored": stored.map(Theme::as_str),
        }),
    )
}

fn handle_theme_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let chosen = if let Some(raw) = req.params.get("theme").and_then(|v| v.as_str()) {
        match Theme::parse(raw) {
            Some(t) => t,
            None => return err(&req.id, "bad_params", format!("unknown theme: {}", raw), None),
        }
    } else if let Some(checked) = req.params.get("checked").and_then(|v| v.as_bool()) {
        Theme::from_toggle(checked)
    } else {
        return err(&req.id, "bad_params", "missing theme or checked", None);
    };

    if let Err(e) = db::settings_set_json(conn, theme::SETTINGS_KEY, &json!(chosen.as_str())) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    ok(&req.id, json!({ "theme": chosen.as_str() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "theme.get" => Some(handle_theme_get(state, req)),
        "theme.set" => Some(handle_theme_set(state, req)),
        _ => None,
    }
}
