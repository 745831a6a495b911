use crate::chart::{ChartSettings, PredictMode};
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Chart,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "chart" => Some(Self::Chart),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Chart => "setup.chart",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Chart => {
            serde_json::to_value(ChartSettings::default()).unwrap_or_else(|_| json!({}))
        }
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_string_max(v: &Value, key: &str, max: usize) -> Result<String, String> {
    let Some(s) = v.as_str() else {
        return Err(format!("{} must be a string", key));
    };
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(format!("{} must not be empty", key));
    }
    if trimmed.chars().count() > max {
        return Err(format!("{} must be at most {} characters", key, max));
    }
    Ok(trimmed.to_string())
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

fn parse_color(v: &Value, key: &str) -> Result<String, String> {
    match v.as_str() {
        Some(s) if is_hex_color(s) => Ok(s.to_string()),
        _ => Err(format!("{} must be a #rrggbb color", key)),
    }
}

fn parse_palette(v: &Value) -> Result<Vec<Value>, String> {
    let Some(items) = v.as_array() else {
        return Err("palette must be an array".to_string());
    };
    if items.is_empty() || items.len() > 32 {
        return Err("palette must hold between 1 and 32 colors".to_string());
    }
    items
        .iter()
        .map(|c| parse_color(c, "palette").map(Value::String))
        .collect()
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Chart => match k.as_str() {
                "predictMode" => {
                    let mode = v.as_str().and_then(PredictMode::parse);
                    if mode.is_none() {
                        return Err("predictMode must be line or window".to_string());
                    }
                    obj.insert(k.clone(), v.clone());
                }
                "palette" => {
                    obj.insert(k.clone(), Value::Array(parse_palette(v)?));
                }
                "allColor" | "subjectColor" | "predictColor" => {
                    obj.insert(k.clone(), Value::String(parse_color(v, k)?));
                }
                "placeholderName" => {
                    obj.insert(k.clone(), Value::String(parse_string_max(v, k, 60)?));
                }
                "noDataMessage" => {
                    obj.insert(k.clone(), Value::String(parse_string_max(v, k, 200)?));
                }
                _ => return Err(format!("unknown chart field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Best-effort apply: malformed historical values should not block charts.
            let _ = merge_section_patch(section, &mut current, saved_obj);
        }
    }
    Ok(current)
}

/// Chart settings of the open workspace, or defaults when none is open.
pub fn chart_settings(state: &AppState) -> anyhow::Result<ChartSettings> {
    let Some(conn) = state.db.as_ref() else {
        return Ok(ChartSettings::default());
    };
    let value = load_section(conn, SetupSection::Chart)?;
    Ok(serde_json::from_value(value)?)
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let chart = match load_section(conn, SetupSection::Chart) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    ok(&req.id, json!({ "chart": chart }))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    tracing::info!(section = section.key(), "setup updated");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
